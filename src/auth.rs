use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::QueueError;

/// Claims issued by the external identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// `"staff"` for salon staff tokens.
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

/// Authenticated caller, resolved from the bearer token. Queue operations
/// require this; requests without a valid token fail `Unauthenticated`.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub phone: Option<String>,
    role: Option<String>,
}

impl Identity {
    pub fn is_staff(&self) -> bool {
        self.role.as_deref() == Some("staff")
    }
}

/// Extractor for staff-only endpoints.
#[derive(Debug, Clone)]
pub struct Staff(pub Identity);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Verify a raw token, e.g. one carried in a WebSocket query string.
pub fn verify_token(token: &str, key: &DecodingKey) -> Result<Identity, QueueError> {
    verify(token, key)
}

fn verify(token: &str, key: &DecodingKey) -> Result<Identity, QueueError> {
    let data = decode::<Claims>(token, key, &Validation::default())
        .map_err(|_| QueueError::Unauthenticated)?;
    Ok(Identity {
        user_id: data.claims.sub,
        display_name: data.claims.name,
        phone: data.claims.phone,
        role: data.claims.role,
    })
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = QueueError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(QueueError::Unauthenticated)?;
        verify(token, &state.jwt_decoding)
    }
}

impl FromRequestParts<AppState> for Staff {
    type Rejection = QueueError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        if !identity.is_staff() {
            return Err(QueueError::Unauthenticated);
        }
        Ok(Staff(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(role: Option<&str>, secret: &[u8]) -> String {
        let claims = Claims {
            sub: "user-42".into(),
            name: "Dana".into(),
            phone: Some("+1555".into()),
            role: role.map(String::from),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn valid_token_resolves_identity() {
        let secret = b"test-secret";
        let token = token(None, secret);
        let identity = verify(&token, &DecodingKey::from_secret(secret)).unwrap();
        assert_eq!(identity.user_id, "user-42");
        assert_eq!(identity.display_name, "Dana");
        assert!(!identity.is_staff());
    }

    #[test]
    fn staff_role_is_recognized() {
        let secret = b"test-secret";
        let token = token(Some("staff"), secret);
        let identity = verify(&token, &DecodingKey::from_secret(secret)).unwrap();
        assert!(identity.is_staff());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = token(None, b"right-secret");
        let err = verify(&token, &DecodingKey::from_secret(b"wrong-secret")).unwrap_err();
        assert!(matches!(err, QueueError::Unauthenticated));
    }
}
