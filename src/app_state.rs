use jsonwebtoken::DecodingKey;
use sqlx::PgPool;
use std::sync::Arc;

use crate::directory::SalonDirectory;
use crate::services::fanout::EventBus;
use crate::services::store::QueueStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<QueueStore>,
    pub bus: Arc<EventBus>,
    pub directory: Arc<dyn SalonDirectory>,
    pub jwt_decoding: Arc<DecodingKey>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        store: Arc<QueueStore>,
        directory: Arc<dyn SalonDirectory>,
        jwt_secret: &str,
    ) -> Self {
        let bus = store.bus();
        Self {
            db,
            store,
            bus,
            directory,
            jwt_decoding: Arc::new(DecodingKey::from_secret(jwt_secret.as_bytes())),
        }
    }
}
