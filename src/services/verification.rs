use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{CheckIn, VerificationReason};
use crate::services::geo;

/// Tunables for the arrival verification policy. Sourced from `AppConfig`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationPolicy {
    /// Distance within which a check-in is trusted without staff review.
    pub auto_approve_radius_m: f64,
    /// GPS accuracy beyond which a fix is unusable for auto-approval.
    pub max_accuracy_m: f64,
    /// Implied travel speed above which movement between two attempts is
    /// implausible.
    pub max_travel_speed_kmh: f64,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            auto_approve_radius_m: 150.0,
            max_accuracy_m: 100.0,
            max_travel_speed_kmh: 150.0,
        }
    }
}

/// A raw check-in attempt as submitted by the client.
#[derive(Debug, Clone)]
pub struct CheckInAttempt {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

/// Context the engine needs beyond the attempt itself.
#[derive(Debug, Clone)]
pub struct VerificationContext {
    pub salon_latitude: f64,
    pub salon_longitude: f64,
    /// The entry's previously recorded check-in, if any.
    pub previous: Option<CheckIn>,
}

/// Outcome of classifying a check-in attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    AutoApprove { distance_m: f64 },
    NeedsReview {
        reason: VerificationReason,
        distance_m: Option<f64>,
    },
}

impl Decision {
    pub fn distance_m(&self) -> Option<f64> {
        match self {
            Decision::AutoApprove { distance_m } => Some(*distance_m),
            Decision::NeedsReview { distance_m, .. } => *distance_m,
        }
    }
}

/// Classify a check-in attempt.
///
/// The policy is deliberately conservative: missing or low-confidence data
/// never auto-approves. Forcing manual review is recoverable via staff
/// confirmation; auto-approving a fraudulent arrival is not.
///
/// Rules, in order:
/// 1. no coordinates → review (`no_location`);
/// 2. reported accuracy worse than the usability threshold → review
///    (`no_location`, the fix is as good as absent);
/// 3. distance beyond the auto-approve radius → review (`too_far`,
///    distance recorded for staff);
/// 4. implied speed from the previous attempt above the plausibility
///    bound → review (`suspicious`);
/// 5. otherwise auto-approve.
pub fn classify(
    attempt: &CheckInAttempt,
    context: &VerificationContext,
    policy: &VerificationPolicy,
) -> Decision {
    let (lat, lon) = match (attempt.latitude, attempt.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Decision::NeedsReview {
                reason: VerificationReason::NoLocation,
                distance_m: None,
            }
        }
    };

    let distance_m =
        geo::haversine_distance_m(lat, lon, context.salon_latitude, context.salon_longitude);

    match attempt.accuracy_m {
        Some(acc) if acc <= policy.max_accuracy_m => {}
        // Unusable or unreported accuracy: the coordinates cannot be
        // trusted, same treatment as a missing location.
        _ => {
            return Decision::NeedsReview {
                reason: VerificationReason::NoLocation,
                distance_m: Some(distance_m),
            }
        }
    }

    if distance_m > policy.auto_approve_radius_m {
        return Decision::NeedsReview {
            reason: VerificationReason::TooFar,
            distance_m: Some(distance_m),
        };
    }

    if let Some(previous) = &context.previous {
        let speed = implied_speed_kmh(previous, lat, lon, attempt.captured_at);
        if speed > policy.max_travel_speed_kmh {
            return Decision::NeedsReview {
                reason: VerificationReason::Suspicious,
                distance_m: Some(distance_m),
            };
        }
    }

    Decision::AutoApprove { distance_m }
}

/// Implied travel speed between the previous recorded fix and this
/// attempt. Elapsed time is floored at one second, so a discontinuous
/// coordinate jump between near-simultaneous attempts reads as an
/// implausibly high speed.
fn implied_speed_kmh(
    previous: &CheckIn,
    lat: f64,
    lon: f64,
    captured_at: DateTime<Utc>,
) -> f64 {
    let moved_m =
        geo::haversine_distance_m(previous.latitude, previous.longitude, lat, lon);
    let elapsed_s = (captured_at - previous.captured_at).num_seconds().max(1) as f64;
    moved_m / elapsed_s * 3.6
}

#[cfg(test)]
mod tests {
    use super::*;

    // Salon at the origin; 0.001 deg latitude ≈ 111 m.
    fn context() -> VerificationContext {
        VerificationContext {
            salon_latitude: 0.0,
            salon_longitude: 0.0,
            previous: None,
        }
    }

    fn attempt(lat: f64, lon: f64, accuracy: f64) -> CheckInAttempt {
        CheckInAttempt {
            latitude: Some(lat),
            longitude: Some(lon),
            accuracy_m: Some(accuracy),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn missing_coordinates_need_review() {
        let attempt = CheckInAttempt {
            latitude: None,
            longitude: None,
            accuracy_m: Some(10.0),
            captured_at: Utc::now(),
        };
        let decision = classify(&attempt, &context(), &VerificationPolicy::default());
        assert_eq!(
            decision,
            Decision::NeedsReview {
                reason: VerificationReason::NoLocation,
                distance_m: None
            }
        );
    }

    #[test]
    fn close_and_accurate_auto_approves() {
        // ~55 m from the salon, 20 m accuracy.
        let decision = classify(
            &attempt(0.0005, 0.0, 20.0),
            &context(),
            &VerificationPolicy::default(),
        );
        match decision {
            Decision::AutoApprove { distance_m } => {
                assert!((distance_m - 55.6).abs() < 1.0, "got {distance_m}")
            }
            other => panic!("expected auto-approve, got {other:?}"),
        }
    }

    #[test]
    fn low_accuracy_never_auto_approves() {
        // On the salon doorstep but with a 200 m accuracy radius.
        let decision = classify(
            &attempt(0.0, 0.0, 200.0),
            &context(),
            &VerificationPolicy::default(),
        );
        match decision {
            Decision::NeedsReview { reason, .. } => {
                assert_eq!(reason, VerificationReason::NoLocation)
            }
            other => panic!("expected review, got {other:?}"),
        }
    }

    #[test]
    fn beyond_radius_is_too_far_with_distance_recorded() {
        // ~1.1 km away.
        let decision = classify(
            &attempt(0.01, 0.0, 15.0),
            &context(),
            &VerificationPolicy::default(),
        );
        match decision {
            Decision::NeedsReview { reason, distance_m } => {
                assert_eq!(reason, VerificationReason::TooFar);
                let d = distance_m.expect("distance should be recorded");
                assert!(d > 1_000.0);
            }
            other => panic!("expected review, got {other:?}"),
        }
    }

    #[test]
    fn monotonic_in_distance() {
        // For fixed accuracy, increasing distance never turns a review
        // into an auto-approval.
        let policy = VerificationPolicy::default();
        let mut seen_review = false;
        for step in 0..40 {
            let lat = step as f64 * 0.0001; // ~11 m per step
            let decision = classify(&attempt(lat, 0.0, 30.0), &context(), &policy);
            match decision {
                Decision::AutoApprove { .. } => {
                    assert!(!seen_review, "auto-approve after a review at {lat}")
                }
                Decision::NeedsReview { .. } => seen_review = true,
            }
        }
        assert!(seen_review, "walk should have crossed the radius");
    }

    #[test]
    fn teleporting_between_attempts_is_suspicious() {
        let now = Utc::now();
        let mut ctx = context();
        // Previous fix ~11 km away, ten seconds ago: > 150 km/h implied.
        ctx.previous = Some(CheckIn {
            latitude: 0.1,
            longitude: 0.0,
            accuracy_m: Some(20.0),
            distance_m: 11_000.0,
            captured_at: now - chrono::Duration::seconds(10),
        });
        let mut attempt = attempt(0.0005, 0.0, 20.0);
        attempt.captured_at = now;
        let decision = classify(&attempt, &ctx, &VerificationPolicy::default());
        match decision {
            Decision::NeedsReview { reason, .. } => {
                assert_eq!(reason, VerificationReason::Suspicious)
            }
            other => panic!("expected review, got {other:?}"),
        }
    }

    #[test]
    fn slow_reapproach_after_rejection_is_fine() {
        let now = Utc::now();
        let mut ctx = context();
        // Previous fix 100 m away, half an hour ago.
        ctx.previous = Some(CheckIn {
            latitude: 0.0009,
            longitude: 0.0,
            accuracy_m: Some(25.0),
            distance_m: 100.0,
            captured_at: now - chrono::Duration::minutes(30),
        });
        let mut attempt = attempt(0.0004, 0.0, 25.0);
        attempt.captured_at = now;
        let decision = classify(&attempt, &ctx, &VerificationPolicy::default());
        assert!(matches!(decision, Decision::AutoApprove { .. }));
    }
}
