use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::SelectedService;

/// One service offered by a salon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalonService {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub duration_minutes: i64,
}

/// A salon as resolved from the directory: its location (for arrival
/// verification) and service catalogue (for join-time selection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalonProfile {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub catalogue: Vec<SalonService>,
}

impl SalonProfile {
    /// Resolve requested service ids against the catalogue, preserving the
    /// order the customer selected them in.
    pub fn select_services(&self, ids: &[Uuid]) -> Result<Vec<SelectedService>, QueueError> {
        ids.iter()
            .map(|id| {
                self.catalogue
                    .iter()
                    .find(|s| s.id == *id)
                    .map(|s| SelectedService {
                        service_id: s.id,
                        name: s.name.clone(),
                        price_cents: s.price_cents,
                        duration_minutes: s.duration_minutes,
                    })
                    .ok_or(QueueError::ServiceNotFound(*id))
            })
            .collect()
    }
}

/// Salon directory contract. The queue core consumes salons through this
/// interface only; salon CRUD lives elsewhere.
#[async_trait]
pub trait SalonDirectory: Send + Sync {
    async fn resolve(&self, salon_id: Uuid) -> Result<Option<SalonProfile>, QueueError>;
}

/// Postgres-backed directory over the `salons` / `salon_services` tables.
pub struct PgSalonDirectory {
    pool: PgPool,
}

impl PgSalonDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalonDirectory for PgSalonDirectory {
    async fn resolve(&self, salon_id: Uuid) -> Result<Option<SalonProfile>, QueueError> {
        let salon = sqlx::query(
            r#"
            SELECT id, name, latitude, longitude
            FROM salons
            WHERE id = $1
            "#,
        )
        .bind(salon_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = salon else {
            return Ok(None);
        };

        let services = sqlx::query(
            r#"
            SELECT id, name, price_cents, duration_minutes
            FROM salon_services
            WHERE salon_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(salon_id)
        .fetch_all(&self.pool)
        .await?;

        let catalogue = services
            .into_iter()
            .map(|s| {
                Ok(SalonService {
                    id: s.try_get("id")?,
                    name: s.try_get("name")?,
                    price_cents: s.try_get("price_cents")?,
                    duration_minutes: s.try_get("duration_minutes")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(Some(SalonProfile {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            catalogue,
        }))
    }
}

/// Fixed in-memory directory, used by tests and local development.
#[derive(Default)]
pub struct InMemorySalonDirectory {
    salons: HashMap<Uuid, SalonProfile>,
}

impl InMemorySalonDirectory {
    pub fn with_salon(mut self, profile: SalonProfile) -> Self {
        self.salons.insert(profile.id, profile);
        self
    }
}

#[async_trait]
impl SalonDirectory for InMemorySalonDirectory {
    async fn resolve(&self, salon_id: Uuid) -> Result<Option<SalonProfile>, QueueError> {
        Ok(self.salons.get(&salon_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with_two_services() -> (SalonProfile, Uuid, Uuid) {
        let cut = Uuid::new_v4();
        let color = Uuid::new_v4();
        let profile = SalonProfile {
            id: Uuid::new_v4(),
            name: "Shear Genius".into(),
            latitude: 40.7484,
            longitude: -73.9857,
            catalogue: vec![
                SalonService {
                    id: cut,
                    name: "Cut".into(),
                    price_cents: 4_500,
                    duration_minutes: 30,
                },
                SalonService {
                    id: color,
                    name: "Color".into(),
                    price_cents: 12_000,
                    duration_minutes: 90,
                },
            ],
        };
        (profile, cut, color)
    }

    #[test]
    fn select_services_preserves_request_order() {
        let (profile, cut, color) = profile_with_two_services();
        let selected = profile.select_services(&[color, cut]).unwrap();
        assert_eq!(selected[0].service_id, color);
        assert_eq!(selected[1].service_id, cut);
        assert_eq!(selected.iter().map(|s| s.duration_minutes).sum::<i64>(), 120);
    }

    #[test]
    fn unknown_service_id_is_rejected() {
        let (profile, _, _) = profile_with_two_services();
        let bogus = Uuid::new_v4();
        match profile.select_services(&[bogus]) {
            Err(QueueError::ServiceNotFound(id)) => assert_eq!(id, bogus),
            other => panic!("expected ServiceNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn in_memory_directory_resolves() {
        let (profile, _, _) = profile_with_two_services();
        let id = profile.id;
        let directory = InMemorySalonDirectory::default().with_salon(profile);
        assert!(directory.resolve(id).await.unwrap().is_some());
        assert!(directory.resolve(Uuid::new_v4()).await.unwrap().is_none());
    }
}
