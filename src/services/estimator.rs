use chrono::{DateTime, Utc};

use crate::models::{QueueEntry, QueueStatus};

/// Minimum remaining time credited to an in-progress service, in minutes.
const MIN_REMAINING_MINUTES: i64 = 1;

/// Recompute `estimated_wait_minutes` for every entry in one salon's live
/// queue.
///
/// An entry's estimate is the sum of the selected-service durations of all
/// active-ranked entries strictly ahead of it, plus the remaining time of
/// the in-progress entry if there is one. Entries not in the active
/// ranking are set to zero. Called inside the salon's serialized scope
/// after every mutation, so estimates are never stale.
pub fn recompute_waits(entries: &mut [QueueEntry], now: DateTime<Utc>) {
    let base = entries
        .iter()
        .find(|e| e.status == QueueStatus::InProgress)
        .map(|e| in_progress_remaining_minutes(e, now))
        .unwrap_or(0);

    let mut ranked: Vec<usize> = (0..entries.len())
        .filter(|&i| entries[i].status.is_active_ranked())
        .collect();
    ranked.sort_by_key(|&i| entries[i].position.unwrap_or(u32::MAX));

    let mut ahead = base;
    for i in ranked {
        entries[i].estimated_wait_minutes = ahead;
        ahead += entries[i].total_duration_minutes;
    }

    for e in entries
        .iter_mut()
        .filter(|e| !e.status.is_active_ranked())
    {
        e.estimated_wait_minutes = 0;
    }
}

/// Remaining minutes of an in-progress entry: its own selected durations
/// minus elapsed time since service start, floored at one minute.
fn in_progress_remaining_minutes(entry: &QueueEntry, now: DateTime<Utc>) -> i64 {
    let elapsed = entry
        .service_started_at
        .map(|t| (now - t).num_minutes())
        .unwrap_or(0);
    (entry.total_duration_minutes - elapsed).max(MIN_REMAINING_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectedService;
    use chrono::Duration;
    use uuid::Uuid;

    fn entry(position: u32, minutes: i64, status: QueueStatus) -> QueueEntry {
        let mut e = QueueEntry::new(
            Uuid::nil(),
            format!("user-{position}"),
            vec![SelectedService {
                service_id: Uuid::new_v4(),
                name: "Cut".into(),
                price_cents: 3_000,
                duration_minutes: minutes,
            }],
            Utc::now(),
        );
        e.status = status;
        if status.is_active_ranked() {
            e.position = Some(position);
        }
        e
    }

    #[test]
    fn front_of_queue_waits_zero_when_bay_is_free() {
        let mut entries = vec![
            entry(1, 30, QueueStatus::Waiting),
            entry(2, 20, QueueStatus::Waiting),
            entry(3, 45, QueueStatus::Waiting),
        ];
        recompute_waits(&mut entries, Utc::now());
        assert_eq!(entries[0].estimated_wait_minutes, 0);
        assert_eq!(entries[1].estimated_wait_minutes, 30);
        assert_eq!(entries[2].estimated_wait_minutes, 50);
    }

    #[test]
    fn in_progress_remainder_is_added_to_everyone() {
        let now = Utc::now();
        let mut serving = entry(0, 40, QueueStatus::InProgress);
        serving.service_started_at = Some(now - Duration::minutes(10));
        let mut entries = vec![serving, entry(1, 30, QueueStatus::Waiting)];
        recompute_waits(&mut entries, now);
        // 40 selected - 10 elapsed = 30 remaining.
        assert_eq!(entries[1].estimated_wait_minutes, 30);
        assert_eq!(entries[0].estimated_wait_minutes, 0);
    }

    #[test]
    fn overrun_service_still_counts_one_minute() {
        let now = Utc::now();
        let mut serving = entry(0, 20, QueueStatus::InProgress);
        serving.service_started_at = Some(now - Duration::minutes(90));
        let mut entries = vec![serving, entry(1, 15, QueueStatus::Waiting)];
        recompute_waits(&mut entries, now);
        assert_eq!(entries[1].estimated_wait_minutes, 1);
    }

    #[test]
    fn pending_verification_counts_in_the_ranking() {
        let mut entries = vec![
            entry(1, 25, QueueStatus::PendingVerification),
            entry(2, 10, QueueStatus::Waiting),
        ];
        recompute_waits(&mut entries, Utc::now());
        assert_eq!(entries[1].estimated_wait_minutes, 25);
    }
}
