use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle status of a queue entry.
///
/// `Completed` and `NoShow` are terminal; entries never leave them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    Notified,
    PendingVerification,
    Nearby,
    InProgress,
    Completed,
    NoShow,
}

impl QueueStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::NoShow)
    }

    /// Whether the status participates in the active ranking (position
    /// numbering and wait-time estimation).
    pub fn is_active_ranked(self) -> bool {
        matches!(
            self,
            QueueStatus::Waiting
                | QueueStatus::Notified
                | QueueStatus::PendingVerification
                | QueueStatus::Nearby
        )
    }
}

/// Why a check-in attempt was routed to manual review.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationReason {
    NoLocation,
    TooFar,
    Suspicious,
}

/// A service the customer selected when joining the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedService {
    pub service_id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub duration_minutes: i64,
}

/// The most recent check-in attempt recorded on an entry.
/// Overwritten on retry; only meaningful while the entry is in
/// `notified`, `pending_verification`, or `nearby`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
    pub distance_m: f64,
    pub captured_at: DateTime<Utc>,
}

/// One customer's live participation in one salon's queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub salon_id: Uuid,
    pub user_id: String,

    pub services: Vec<SelectedService>,
    pub total_price_cents: i64,
    pub total_duration_minutes: i64,

    /// 1-based rank among the salon's active-ranked entries.
    /// `None` once the entry is in progress or terminal.
    pub position: Option<u32>,
    pub status: QueueStatus,

    pub joined_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
    pub check_in: Option<CheckIn>,
    pub verification_reason: Option<VerificationReason>,
    pub service_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub estimated_wait_minutes: i64,

    /// Bumped on every mutation; used to discard verification decisions
    /// that raced with a concurrent leave or staff action.
    #[serde(default)]
    pub generation: u64,

    /// Set when the customer submits a review for a completed visit.
    pub review_submitted_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    pub fn new(
        salon_id: Uuid,
        user_id: String,
        services: Vec<SelectedService>,
        joined_at: DateTime<Utc>,
    ) -> Self {
        let total_price_cents = services.iter().map(|s| s.price_cents).sum();
        let total_duration_minutes = services.iter().map(|s| s.duration_minutes).sum();
        Self {
            id: Uuid::new_v4(),
            salon_id,
            user_id,
            services,
            total_price_cents,
            total_duration_minutes,
            position: None,
            status: QueueStatus::Waiting,
            joined_at,
            notified_at: None,
            check_in: None,
            verification_reason: None,
            service_started_at: None,
            completed_at: None,
            estimated_wait_minutes: 0,
            generation: 0,
            review_submitted_at: None,
        }
    }
}

/// Consistent point-in-time view of one salon's queue, used for
/// subscriber resync and the snapshot endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub salon_id: Uuid,
    pub entries: Vec<QueueEntry>,
    /// Sequence number of the last event folded into this snapshot.
    pub seq: u64,
    pub taken_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(minutes: i64, cents: i64) -> SelectedService {
        SelectedService {
            service_id: Uuid::new_v4(),
            name: "Cut".to_string(),
            price_cents: cents,
            duration_minutes: minutes,
        }
    }

    #[test]
    fn totals_derived_from_services() {
        let entry = QueueEntry::new(
            Uuid::new_v4(),
            "user-1".to_string(),
            vec![service(30, 4_000), service(15, 2_500)],
            Utc::now(),
        );
        assert_eq!(entry.total_duration_minutes, 45);
        assert_eq!(entry.total_price_cents, 6_500);
        assert_eq!(entry.status, QueueStatus::Waiting);
    }

    #[test]
    fn status_text_round_trip() {
        use std::str::FromStr;
        for status in [
            QueueStatus::Waiting,
            QueueStatus::PendingVerification,
            QueueStatus::InProgress,
            QueueStatus::NoShow,
        ] {
            let text = status.to_string();
            assert_eq!(QueueStatus::from_str(&text).unwrap(), status);
        }
    }

    #[test]
    fn terminal_and_ranked_classification() {
        assert!(QueueStatus::Completed.is_terminal());
        assert!(QueueStatus::NoShow.is_terminal());
        assert!(!QueueStatus::InProgress.is_terminal());
        assert!(QueueStatus::PendingVerification.is_active_ranked());
        assert!(!QueueStatus::InProgress.is_active_ranked());
        assert!(!QueueStatus::Completed.is_active_ranked());
    }
}
