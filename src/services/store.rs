use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::{HistoryRow, QueueHistory};
use crate::directory::SalonProfile;
use crate::error::QueueError;
use crate::models::{CheckIn, QueueEntry, QueueSnapshot, QueueStatus, SelectedService};
use crate::services::estimator;
use crate::services::fanout::{EventBus, QueueEvent};
use crate::services::state_machine::{transition, TransitionEvent};
use crate::services::verification::{
    classify, CheckInAttempt, Decision, VerificationContext, VerificationPolicy,
};

/// Tunables for queue behavior. Sourced from `AppConfig`.
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    pub verification: VerificationPolicy,
    /// Minutes after notification within which the customer must check in.
    pub grace_period_minutes: i64,
    /// Entries at or below this position are promoted to `notified`.
    pub notify_lead_positions: u32,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            verification: VerificationPolicy::default(),
            grace_period_minutes: 15,
            notify_lead_positions: 1,
        }
    }
}

/// Result of a check-in attempt, echoed back to the customer.
#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    pub entry: QueueEntry,
    pub distance_m: Option<f64>,
}

/// One salon's live queue. Only non-terminal entries live here; terminal
/// and left entries exist solely in the durable history.
struct SalonQueue {
    profile: SalonProfile,
    /// Live entries in join order.
    entries: Vec<QueueEntry>,
    /// Per-salon monotonic event sequence, advanced inside the lock.
    next_seq: u64,
}

/// What a refresh pass changed, so only dirty rows are persisted and only
/// real transitions are announced.
#[derive(Default)]
struct RefreshOutcome {
    /// Ids whose position, status, or estimate changed.
    changed: Vec<Uuid>,
    /// Subset of `changed` that was promoted `waiting` → `notified`.
    promoted: Vec<Uuid>,
}

/// Per-salon ordered queues behind per-salon locks.
///
/// Every mutation of one salon's queue is serialized by that salon's
/// `tokio::sync::Mutex`; different salons proceed fully in parallel. Each
/// operation stages its mutation on a copy, persists write-ahead through
/// the [`QueueHistory`] contract, commits to memory, and only then
/// publishes fanout events — so a persistence failure aborts the
/// transition with no partial state, and subscribers never observe a
/// position update without the matching wait-time update.
pub struct QueueStore {
    salons: std::sync::Mutex<HashMap<Uuid, Arc<Mutex<SalonQueue>>>>,
    /// entry id → salon id, for id-addressed operations.
    index: std::sync::Mutex<HashMap<Uuid, Uuid>>,
    history: Arc<dyn QueueHistory>,
    bus: Arc<EventBus>,
    policy: QueuePolicy,
}

impl QueueStore {
    pub fn new(history: Arc<dyn QueueHistory>, bus: Arc<EventBus>, policy: QueuePolicy) -> Self {
        Self {
            salons: std::sync::Mutex::new(HashMap::new()),
            index: std::sync::Mutex::new(HashMap::new()),
            history,
            bus,
            policy,
        }
    }

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Rebuild in-memory queues from the durable history at startup.
    /// Positions and estimates are recomputed rather than trusted from
    /// the stored rows.
    pub async fn restore(
        &self,
        directory: &dyn crate::directory::SalonDirectory,
    ) -> Result<usize, QueueError> {
        let active = self.history.load_active().await?;
        let mut by_salon: HashMap<Uuid, Vec<QueueEntry>> = HashMap::new();
        for entry in active {
            by_salon.entry(entry.salon_id).or_default().push(entry);
        }

        let mut restored = 0;
        for (salon_id, mut entries) in by_salon {
            let Some(profile) = directory.resolve(salon_id).await? else {
                tracing::warn!(salon_id = %salon_id, "skipping restore for salon missing from directory");
                continue;
            };
            entries.sort_by_key(|e| e.joined_at);
            restored += entries.len();

            refresh(&mut entries, &self.policy, Utc::now());

            {
                let mut index = self.index.lock().unwrap();
                for entry in &entries {
                    index.insert(entry.id, salon_id);
                }
            }
            self.salons.lock().unwrap().insert(
                salon_id,
                Arc::new(Mutex::new(SalonQueue {
                    profile,
                    entries,
                    next_seq: 0,
                })),
            );
        }
        Ok(restored)
    }

    /// Salon ids with live queues, for the no-show sweeper.
    pub fn live_salon_ids(&self) -> Vec<Uuid> {
        self.salons.lock().unwrap().keys().copied().collect()
    }

    fn handle_for(&self, profile: &SalonProfile) -> Arc<Mutex<SalonQueue>> {
        let mut salons = self.salons.lock().unwrap();
        salons
            .entry(profile.id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(SalonQueue {
                    profile: profile.clone(),
                    entries: Vec::new(),
                    next_seq: 0,
                }))
            })
            .clone()
    }

    fn existing_handle(&self, salon_id: Uuid) -> Option<Arc<Mutex<SalonQueue>>> {
        self.salons.lock().unwrap().get(&salon_id).cloned()
    }

    fn handle_for_entry(&self, entry_id: Uuid) -> Result<Arc<Mutex<SalonQueue>>, QueueError> {
        let salon_id = *self
            .index
            .lock()
            .unwrap()
            .get(&entry_id)
            .ok_or(QueueError::NotFound)?;
        self.existing_handle(salon_id).ok_or(QueueError::NotFound)
    }

    /// Append a customer to a salon's queue.
    pub async fn join(
        &self,
        profile: &SalonProfile,
        user_id: &str,
        services: Vec<SelectedService>,
    ) -> Result<QueueEntry, QueueError> {
        let handle = self.handle_for(profile);
        let mut q = handle.lock().await;
        let now = Utc::now();

        // One non-terminal entry per (salon, user); terminal entries are
        // already gone from memory so presence alone is a collision.
        if q.entries.iter().any(|e| e.user_id == user_id) {
            return Err(QueueError::DuplicateActiveEntry);
        }

        let mut work = q.entries.clone();
        let entry = QueueEntry::new(profile.id, user_id.to_string(), services, now);
        let entry_id = entry.id;
        work.push(entry);

        let outcome = refresh(&mut work, &self.policy, now);

        let joined = find(&work, entry_id)?.clone();
        let mut rows = vec![HistoryRow::active(joined.clone())];
        rows.extend(
            collect(&work, outcome.changed.iter().filter(|id| **id != entry_id))
                .into_iter()
                .map(HistoryRow::active),
        );
        self.history.record(&rows).await?;

        q.entries = work;
        self.index.lock().unwrap().insert(entry_id, profile.id);

        metrics::counter!("queue_joins_total").increment(1);
        metrics::gauge!("queue_depth", "salon_id" => profile.id.to_string())
            .set(q.entries.len() as f64);

        publish(&mut q, &self.bus, "queue.joined", Some(&joined));
        self.announce_promotions(&mut q, &outcome, entry_id);

        tracing::info!(
            entry_id = %joined.id,
            salon_id = %profile.id,
            user_id = %user_id,
            position = ?joined.position,
            "customer joined queue"
        );
        Ok(joined)
    }

    /// Voluntary departure. Closes the position gap behind the leaver and
    /// re-estimates everyone shifted.
    pub async fn leave(&self, entry_id: Uuid) -> Result<QueueEntry, QueueError> {
        let handle = self.handle_for_entry(entry_id)?;
        let mut q = handle.lock().await;
        let now = Utc::now();

        let mut work = q.entries.clone();
        let idx = position_of(&work, entry_id)?;
        if !work[idx].status.is_active_ranked() {
            return Err(QueueError::InvalidTransition {
                from: work[idx].status,
                event: "leave",
            });
        }

        let mut left = work.remove(idx);
        left.position = None;
        left.generation += 1;

        let outcome = refresh(&mut work, &self.policy, now);

        let mut rows = vec![HistoryRow::left(left.clone())];
        rows.extend(
            collect(&work, outcome.changed.iter())
                .into_iter()
                .map(HistoryRow::active),
        );
        self.history.record(&rows).await?;

        q.entries = work;
        self.index.lock().unwrap().remove(&entry_id);

        metrics::counter!("queue_leaves_total").increment(1);
        metrics::gauge!("queue_depth", "salon_id" => left.salon_id.to_string())
            .set(q.entries.len() as f64);

        publish(&mut q, &self.bus, "queue.left", Some(&left));
        self.announce_promotions(&mut q, &outcome, entry_id);

        tracing::info!(entry_id = %entry_id, salon_id = %left.salon_id, "customer left queue");
        Ok(left)
    }

    /// Staff action: move the front-most eligible entry into service.
    /// Verified arrivals (`nearby`) are preferred over unverified ones.
    pub async fn advance(&self, salon_id: Uuid) -> Result<QueueEntry, QueueError> {
        let handle = self.existing_handle(salon_id).ok_or(QueueError::EmptyQueue)?;
        let mut q = handle.lock().await;
        let now = Utc::now();

        if q.entries.iter().any(|e| e.status == QueueStatus::InProgress) {
            return Err(QueueError::ServiceBayOccupied);
        }

        let mut work = q.entries.clone();
        let idx = advance_candidate(&work).ok_or(QueueError::EmptyQueue)?;

        work[idx].status = transition(work[idx].status, TransitionEvent::StartService)?;
        work[idx].position = None;
        work[idx].service_started_at = Some(now);
        work[idx].generation += 1;
        let entry_id = work[idx].id;

        let outcome = refresh(&mut work, &self.policy, now);

        let started = find(&work, entry_id)?.clone();
        let mut rows: Vec<HistoryRow> =
            collect(&work, outcome.changed.iter().filter(|id| **id != entry_id))
                .into_iter()
                .map(HistoryRow::active)
                .collect();
        rows.push(HistoryRow::active(started.clone()));
        self.history.record(&rows).await?;

        q.entries = work;

        metrics::counter!("queue_services_started_total").increment(1);

        publish(&mut q, &self.bus, "queue.advanced", Some(&started));
        self.announce_promotions(&mut q, &outcome, entry_id);

        tracing::info!(entry_id = %started.id, salon_id = %salon_id, "service started");
        Ok(started)
    }

    /// Customer check-in. The verification engine classifies the attempt
    /// outside the lock; the decision is then applied through
    /// [`apply_check_in`](Self::apply_check_in), which discards it if the
    /// entry mutated in the meantime.
    pub async fn submit_check_in(
        &self,
        entry_id: Uuid,
        attempt: CheckInAttempt,
    ) -> Result<CheckInOutcome, QueueError> {
        let handle = self.handle_for_entry(entry_id)?;

        // Sample a consistent snapshot under the lock.
        let (generation, context) = {
            let q = handle.lock().await;
            let entry = find(&q.entries, entry_id)?;
            if !matches!(
                entry.status,
                QueueStatus::Notified | QueueStatus::PendingVerification
            ) {
                return Err(QueueError::InvalidTransition {
                    from: entry.status,
                    event: "check_in",
                });
            }
            (
                entry.generation,
                VerificationContext {
                    salon_latitude: q.profile.latitude,
                    salon_longitude: q.profile.longitude,
                    previous: entry.check_in.clone(),
                },
            )
        };

        // Classification is pure; done off the critical section.
        let decision = classify(&attempt, &context, &self.policy.verification);

        self.apply_check_in(entry_id, generation, &attempt, decision)
            .await
    }

    /// Apply a classified check-in decision, compare-and-set style.
    ///
    /// `expected_generation` is the generation the decision was computed
    /// against. A concurrent leave or staff action bumps the entry's
    /// generation, so a decision that raced one is rejected here with no
    /// side effects instead of overwriting the newer state.
    pub async fn apply_check_in(
        &self,
        entry_id: Uuid,
        expected_generation: u64,
        attempt: &CheckInAttempt,
        decision: Decision,
    ) -> Result<CheckInOutcome, QueueError> {
        let handle = self.handle_for_entry(entry_id)?;
        let mut q = handle.lock().await;
        let now = Utc::now();
        let mut work = q.entries.clone();
        let idx = position_of(&work, entry_id)?;
        if work[idx].generation != expected_generation {
            return Err(QueueError::InvalidTransition {
                from: work[idx].status,
                event: "check_in",
            });
        }

        let (event, reason) = match &decision {
            Decision::AutoApprove { .. } => (TransitionEvent::CheckInApproved, None),
            Decision::NeedsReview { reason, .. } => {
                (TransitionEvent::CheckInNeedsReview, Some(*reason))
            }
        };
        work[idx].status = transition(work[idx].status, event)?;
        work[idx].verification_reason = reason;
        if let (Some(lat), Some(lon)) = (attempt.latitude, attempt.longitude) {
            work[idx].check_in = Some(CheckIn {
                latitude: lat,
                longitude: lon,
                accuracy_m: attempt.accuracy_m,
                // Distance is always computed when coordinates are present.
                distance_m: decision.distance_m().unwrap_or_default(),
                captured_at: attempt.captured_at,
            });
        }
        work[idx].generation += 1;

        let outcome = refresh(&mut work, &self.policy, now);

        let updated = find(&work, entry_id)?.clone();
        let mut rows: Vec<HistoryRow> =
            collect(&work, outcome.changed.iter().filter(|id| **id != entry_id))
                .into_iter()
                .map(HistoryRow::active)
                .collect();
        rows.push(HistoryRow::active(updated.clone()));
        self.history.record(&rows).await?;

        q.entries = work;

        match decision {
            Decision::AutoApprove { .. } => {
                metrics::counter!("check_ins_auto_approved_total").increment(1)
            }
            Decision::NeedsReview { .. } => {
                metrics::counter!("check_ins_review_total").increment(1)
            }
        }

        publish(&mut q, &self.bus, "queue.checked_in", Some(&updated));
        self.announce_promotions(&mut q, &outcome, entry_id);

        tracing::info!(
            entry_id = %entry_id,
            status = %updated.status,
            reason = ?updated.verification_reason,
            distance_m = ?decision.distance_m(),
            "check-in processed"
        );
        Ok(CheckInOutcome {
            distance_m: decision.distance_m(),
            entry: updated,
        })
    }

    /// Staff resolution of a pending arrival: confirm moves the entry to
    /// `nearby`, reject returns it to `notified` (re-attempt allowed).
    pub async fn confirm_arrival(
        &self,
        entry_id: Uuid,
        confirmed: bool,
    ) -> Result<QueueEntry, QueueError> {
        let handle = self.handle_for_entry(entry_id)?;
        let mut q = handle.lock().await;
        let now = Utc::now();

        let mut work = q.entries.clone();
        let idx = position_of(&work, entry_id)?;
        let event = if confirmed {
            TransitionEvent::StaffConfirm
        } else {
            TransitionEvent::StaffReject
        };
        work[idx].status = transition(work[idx].status, event)?;
        work[idx].verification_reason = None;
        work[idx].generation += 1;

        let outcome = refresh(&mut work, &self.policy, now);

        let updated = find(&work, entry_id)?.clone();
        let mut rows: Vec<HistoryRow> =
            collect(&work, outcome.changed.iter().filter(|id| **id != entry_id))
                .into_iter()
                .map(HistoryRow::active)
                .collect();
        rows.push(HistoryRow::active(updated.clone()));
        self.history.record(&rows).await?;

        q.entries = work;

        let event_type = if confirmed {
            "queue.arrival_confirmed"
        } else {
            "queue.arrival_rejected"
        };
        publish(&mut q, &self.bus, event_type, Some(&updated));
        self.announce_promotions(&mut q, &outcome, entry_id);

        tracing::info!(entry_id = %entry_id, confirmed, "arrival review resolved");
        Ok(updated)
    }

    /// Staff action: finish the in-progress service.
    pub async fn complete(&self, entry_id: Uuid) -> Result<QueueEntry, QueueError> {
        let handle = self.handle_for_entry(entry_id)?;
        let mut q = handle.lock().await;
        let now = Utc::now();

        let mut work = q.entries.clone();
        let idx = position_of(&work, entry_id)?;
        let mut done = work[idx].clone();
        done.status = transition(done.status, TransitionEvent::CompleteService)?;
        done.completed_at = Some(now);
        done.generation += 1;
        work.remove(idx);

        let outcome = refresh(&mut work, &self.policy, now);

        let mut rows = vec![HistoryRow::active(done.clone())];
        rows.extend(
            collect(&work, outcome.changed.iter())
                .into_iter()
                .map(HistoryRow::active),
        );
        self.history.record(&rows).await?;

        q.entries = work;
        self.index.lock().unwrap().remove(&entry_id);

        metrics::counter!("queue_services_completed_total").increment(1);

        publish(&mut q, &self.bus, "queue.completed", Some(&done));
        self.announce_promotions(&mut q, &outcome, entry_id);

        tracing::info!(entry_id = %entry_id, salon_id = %done.salon_id, "service completed");
        Ok(done)
    }

    /// Grace-period sweep: notified entries that never confirmed arrival
    /// become no-shows. Idempotent — terminal entries are already out of
    /// memory, so re-sweeping is a no-op. Returns the expired entries.
    pub async fn sweep_no_shows(
        &self,
        salon_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        let Some(handle) = self.existing_handle(salon_id) else {
            return Ok(Vec::new());
        };
        let mut q = handle.lock().await;

        let grace = Duration::minutes(self.policy.grace_period_minutes);
        let mut work = q.entries.clone();
        let mut expired = Vec::new();

        let mut i = 0;
        while i < work.len() {
            let overdue = matches!(
                work[i].status,
                QueueStatus::Notified | QueueStatus::PendingVerification
            ) && work[i]
                .notified_at
                .is_some_and(|notified| notified + grace <= now);
            if overdue {
                let mut gone = work.remove(i);
                gone.status = transition(gone.status, TransitionEvent::GraceExpired)?;
                gone.position = None;
                gone.verification_reason = None;
                gone.generation += 1;
                expired.push(gone);
            } else {
                i += 1;
            }
        }

        let outcome = refresh(&mut work, &self.policy, now);
        if expired.is_empty() && outcome.changed.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows: Vec<HistoryRow> = expired
            .iter()
            .cloned()
            .map(HistoryRow::active)
            .collect();
        rows.extend(
            collect(&work, outcome.changed.iter())
                .into_iter()
                .map(HistoryRow::active),
        );
        self.history.record(&rows).await?;

        q.entries = work;
        {
            let mut index = self.index.lock().unwrap();
            for gone in &expired {
                index.remove(&gone.id);
            }
        }

        if !expired.is_empty() {
            metrics::counter!("queue_no_shows_total").increment(expired.len() as u64);
            metrics::gauge!("queue_depth", "salon_id" => salon_id.to_string())
                .set(q.entries.len() as f64);
        }

        for gone in &expired {
            publish(&mut q, &self.bus, "queue.no_show", Some(gone));
            tracing::info!(entry_id = %gone.id, salon_id = %salon_id, "marked no-show after grace period");
        }
        self.announce_promotions(&mut q, &outcome, Uuid::nil());

        Ok(expired)
    }

    /// Consistent point-in-time view of one salon's queue.
    pub async fn snapshot(&self, salon_id: Uuid) -> QueueSnapshot {
        match self.existing_handle(salon_id) {
            Some(handle) => {
                let q = handle.lock().await;
                let mut entries = q.entries.clone();
                entries.sort_by_key(|e| (e.position.is_some(), e.position.unwrap_or(0)));
                QueueSnapshot {
                    salon_id,
                    entries,
                    seq: q.next_seq,
                    taken_at: Utc::now(),
                }
            }
            None => QueueSnapshot {
                salon_id,
                entries: Vec::new(),
                seq: 0,
                taken_at: Utc::now(),
            },
        }
    }

    /// Look up a live entry by id.
    pub async fn find_entry(&self, entry_id: Uuid) -> Option<QueueEntry> {
        let handle = self.handle_for_entry(entry_id).ok()?;
        let q = handle.lock().await;
        find(&q.entries, entry_id).ok().cloned()
    }

    /// All live entries held by one user, across salons.
    pub async fn user_entries(&self, user_id: &str) -> Vec<QueueEntry> {
        let handles: Vec<_> = {
            let salons = self.salons.lock().unwrap();
            salons.values().cloned().collect()
        };
        let mut out = Vec::new();
        for handle in handles {
            let q = handle.lock().await;
            out.extend(q.entries.iter().filter(|e| e.user_id == user_id).cloned());
        }
        out
    }

    /// Stamp a terminal entry as reviewed (history-only mutation, scoped
    /// to the owning user).
    pub async fn mark_review_submitted(
        &self,
        entry_id: Uuid,
        user_id: &str,
    ) -> Result<(), QueueError> {
        let stamped = self
            .history
            .mark_review_submitted(entry_id, user_id, Utc::now())
            .await?;
        if stamped {
            Ok(())
        } else {
            Err(QueueError::NotFound)
        }
    }

    fn announce_promotions(&self, q: &mut SalonQueue, outcome: &RefreshOutcome, primary: Uuid) {
        for id in &outcome.promoted {
            if *id == primary {
                continue;
            }
            if let Ok(entry) = find(&q.entries, *id) {
                let entry = entry.clone();
                metrics::counter!("queue_notifications_total").increment(1);
                publish(q, &self.bus, "queue.notified", Some(&entry));
                tracing::info!(entry_id = %entry.id, "customer notified: turn approaching");
            }
        }
    }
}

/// Renumber the active ranking, promote entries within the notify lead,
/// and recompute wait estimates. Returns what actually changed.
fn refresh(entries: &mut [QueueEntry], policy: &QueuePolicy, now: DateTime<Utc>) -> RefreshOutcome {
    let before: HashMap<Uuid, (Option<u32>, QueueStatus, i64)> = entries
        .iter()
        .map(|e| (e.id, (e.position, e.status, e.estimated_wait_minutes)))
        .collect();

    // Positions follow join order among active-ranked entries; the vec is
    // kept in join order, so a single pass renumbers 1..N with no gaps.
    let mut next_position = 1u32;
    for entry in entries.iter_mut() {
        if entry.status.is_active_ranked() {
            entry.position = Some(next_position);
            next_position += 1;
        } else {
            entry.position = None;
        }
    }

    let mut promoted = Vec::new();
    for entry in entries.iter_mut() {
        if entry.status == QueueStatus::Waiting
            && entry.position.is_some_and(|p| p <= policy.notify_lead_positions)
        {
            if let Ok(next) = transition(entry.status, TransitionEvent::Notify) {
                entry.status = next;
                entry.notified_at = Some(now);
                entry.generation += 1;
                promoted.push(entry.id);
            }
        }
    }

    estimator::recompute_waits(entries, now);

    let changed = entries
        .iter()
        .filter(|e| {
            before
                .get(&e.id)
                .map(|old| *old != (e.position, e.status, e.estimated_wait_minutes))
                .unwrap_or(true)
        })
        .map(|e| e.id)
        .collect();

    RefreshOutcome { changed, promoted }
}

/// Front-most advance-eligible entry: lowest-position `nearby` if any
/// arrival is verified, otherwise the position-1 entry when it is
/// `waiting` or `notified`.
fn advance_candidate(entries: &[QueueEntry]) -> Option<usize> {
    let nearby = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.status == QueueStatus::Nearby)
        .min_by_key(|(_, e)| e.position.unwrap_or(u32::MAX))
        .map(|(i, _)| i);
    if nearby.is_some() {
        return nearby;
    }
    entries.iter().position(|e| {
        e.position == Some(1)
            && matches!(e.status, QueueStatus::Waiting | QueueStatus::Notified)
    })
}

fn position_of(entries: &[QueueEntry], entry_id: Uuid) -> Result<usize, QueueError> {
    entries
        .iter()
        .position(|e| e.id == entry_id)
        .ok_or(QueueError::NotFound)
}

fn find(entries: &[QueueEntry], entry_id: Uuid) -> Result<&QueueEntry, QueueError> {
    entries
        .iter()
        .find(|e| e.id == entry_id)
        .ok_or(QueueError::NotFound)
}

fn collect<'a>(
    entries: &[QueueEntry],
    ids: impl Iterator<Item = &'a Uuid>,
) -> Vec<QueueEntry> {
    let mut out = Vec::new();
    for id in ids {
        if let Some(e) = entries.iter().find(|e| e.id == *id) {
            out.push(e.clone());
        }
    }
    out
}

fn publish(q: &mut SalonQueue, bus: &EventBus, event_type: &str, entry: Option<&QueueEntry>) {
    q.next_seq += 1;
    let mut event = QueueEvent::new(event_type, q.profile.id, q.next_seq);
    if let Some(entry) = entry {
        event = event.with_entry(entry);
    }
    bus.publish(event);
}
