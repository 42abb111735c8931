use serde::Deserialize;

use crate::services::store::QueuePolicy;
use crate::services::verification::VerificationPolicy;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// HMAC secret shared with the identity provider
    pub jwt_secret: String,

    /// Distance within which a check-in auto-approves, in meters
    #[serde(default = "default_auto_approve_radius_m")]
    pub auto_approve_radius_m: f64,

    /// GPS accuracy beyond which a fix is treated as unusable, in meters
    #[serde(default = "default_max_accuracy_m")]
    pub max_accuracy_m: f64,

    /// Implied travel speed above which a check-in is flagged, in km/h
    #[serde(default = "default_max_travel_speed_kmh")]
    pub max_travel_speed_kmh: f64,

    /// Minutes a notified customer has to check in before no-show
    #[serde(default = "default_grace_period_minutes")]
    pub grace_period_minutes: i64,

    /// Queue positions at or below this are notified that their turn approaches
    #[serde(default = "default_notify_lead_positions")]
    pub notify_lead_positions: u32,

    /// Seconds between no-show sweeps
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_auto_approve_radius_m() -> f64 {
    150.0
}

fn default_max_accuracy_m() -> f64 {
    100.0
}

fn default_max_travel_speed_kmh() -> f64 {
    150.0
}

fn default_grace_period_minutes() -> i64 {
    15
}

fn default_notify_lead_positions() -> u32 {
    1
}

fn default_sweep_interval_seconds() -> u64 {
    30
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn queue_policy(&self) -> QueuePolicy {
        QueuePolicy {
            verification: VerificationPolicy {
                auto_approve_radius_m: self.auto_approve_radius_m,
                max_accuracy_m: self.max_accuracy_m,
                max_travel_speed_kmh: self.max_travel_speed_kmh,
            },
            grace_period_minutes: self.grace_period_minutes,
            notify_lead_positions: self.notify_lead_positions,
        }
    }
}
