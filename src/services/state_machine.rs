use crate::error::QueueError;
use crate::models::QueueStatus;

/// Events that drive queue entry status transitions.
///
/// Positional guards (position reaching the notify threshold, the service
/// bay being free) are enforced by the queue store before it raises the
/// event; this module owns only the legality of the status change itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEvent {
    /// Position reached the configured lead threshold.
    Notify,
    /// Check-in attempt auto-approved by the verification engine.
    CheckInApproved,
    /// Check-in attempt routed to manual review.
    CheckInNeedsReview,
    /// Staff confirmed a pending arrival.
    StaffConfirm,
    /// Staff rejected a pending arrival; the entry stays active and the
    /// customer may attempt check-in again.
    StaffReject,
    /// Staff started service for this entry.
    StartService,
    /// Staff completed the service.
    CompleteService,
    /// The post-notification grace period elapsed without a confirmed
    /// arrival.
    GraceExpired,
}

impl TransitionEvent {
    fn name(self) -> &'static str {
        match self {
            TransitionEvent::Notify => "notify",
            TransitionEvent::CheckInApproved => "check_in_approved",
            TransitionEvent::CheckInNeedsReview => "check_in_needs_review",
            TransitionEvent::StaffConfirm => "staff_confirm",
            TransitionEvent::StaffReject => "staff_reject",
            TransitionEvent::StartService => "start_service",
            TransitionEvent::CompleteService => "complete_service",
            TransitionEvent::GraceExpired => "grace_expired",
        }
    }
}

/// Compute the target status for `event` applied to an entry in `from`.
///
/// Fails with `InvalidTransition` and no side effects for any pair not in
/// the transition table. Terminal statuses are absorbing: no event moves
/// an entry out of `completed` or `no_show`.
pub fn transition(from: QueueStatus, event: TransitionEvent) -> Result<QueueStatus, QueueError> {
    use QueueStatus::*;
    use TransitionEvent::*;

    let to = match (from, event) {
        (Waiting, Notify) => Notified,

        // A customer may retry check-in while pending review (e.g. after
        // being told they were too far); the latest attempt wins.
        (Notified | PendingVerification, CheckInApproved) => Nearby,
        (Notified | PendingVerification, CheckInNeedsReview) => PendingVerification,

        (PendingVerification, StaffConfirm) => Nearby,
        (PendingVerification, StaffReject) => Notified,

        (Waiting | Notified | Nearby, StartService) => InProgress,
        (InProgress, CompleteService) => Completed,

        (Notified | PendingVerification, GraceExpired) => NoShow,

        (from, event) => {
            return Err(QueueError::InvalidTransition {
                from,
                event: event.name(),
            })
        }
    };
    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use QueueStatus::*;
    use TransitionEvent::*;

    #[test]
    fn happy_path_to_completed() {
        let mut status = Waiting;
        for (event, expected) in [
            (Notify, Notified),
            (CheckInApproved, Nearby),
            (StartService, InProgress),
            (CompleteService, Completed),
        ] {
            status = transition(status, event).unwrap();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn review_path_confirm_and_reject() {
        let pending = transition(Notified, CheckInNeedsReview).unwrap();
        assert_eq!(pending, PendingVerification);
        assert_eq!(transition(pending, StaffConfirm).unwrap(), Nearby);
        assert_eq!(transition(pending, StaffReject).unwrap(), Notified);
    }

    #[test]
    fn retry_check_in_while_pending() {
        assert_eq!(
            transition(PendingVerification, CheckInApproved).unwrap(),
            Nearby
        );
    }

    #[test]
    fn grace_expiry_only_from_notified_states() {
        assert_eq!(transition(Notified, GraceExpired).unwrap(), NoShow);
        assert_eq!(transition(PendingVerification, GraceExpired).unwrap(), NoShow);
        assert!(transition(Waiting, GraceExpired).is_err());
        assert!(transition(InProgress, GraceExpired).is_err());
    }

    #[test]
    fn terminal_statuses_are_absorbing() {
        for terminal in [Completed, NoShow] {
            for event in [
                Notify,
                CheckInApproved,
                CheckInNeedsReview,
                StaffConfirm,
                StaffReject,
                StartService,
                CompleteService,
                GraceExpired,
            ] {
                assert!(transition(terminal, event).is_err());
            }
        }
    }

    #[test]
    fn completing_a_waiting_entry_is_rejected() {
        let err = transition(Waiting, CompleteService).unwrap_err();
        match err {
            QueueError::InvalidTransition { from, event } => {
                assert_eq!(from, Waiting);
                assert_eq!(event, "complete_service");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn start_service_allowed_from_waiting_notified_nearby() {
        for from in [Waiting, Notified, Nearby] {
            assert_eq!(transition(from, StartService).unwrap(), InProgress);
        }
        assert!(transition(PendingVerification, StartService).is_err());
    }
}
