use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::{Identity, Staff};
use crate::error::QueueError;
use crate::models::{QueueEntry, QueueSnapshot, VerificationReason};
use crate::services::verification::CheckInAttempt;

/// Request to join a salon's queue.
#[derive(Debug, Deserialize, Validate)]
pub struct JoinRequest {
    #[garde(length(min = 1, max = 10))]
    pub service_ids: Vec<Uuid>,
}

/// Check-in attempt payload. Coordinates are optional — submitting without
/// them is allowed and routes to manual review.
#[derive(Debug, Deserialize, Validate)]
pub struct CheckInRequest {
    #[garde(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[garde(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    #[garde(range(min = 0.0))]
    pub accuracy_m: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub entry_id: Uuid,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<VerificationReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

/// Staff decision on a pending arrival.
#[derive(Debug, Deserialize)]
pub struct ArrivalDecision {
    pub confirmed: bool,
}

fn validated<T: Validate<Context = ()>>(request: &T) -> Result<(), QueueError> {
    request
        .validate()
        .map_err(|e| QueueError::InvalidRequest(e.to_string()))
}

/// Resolve an entry the caller is allowed to act on: the owner, or staff.
async fn owned_entry(
    state: &AppState,
    identity: &Identity,
    entry_id: Uuid,
) -> Result<QueueEntry, QueueError> {
    let entry = state
        .store
        .find_entry(entry_id)
        .await
        .ok_or(QueueError::NotFound)?;
    if entry.user_id != identity.user_id && !identity.is_staff() {
        // Do not leak other customers' entries.
        return Err(QueueError::NotFound);
    }
    Ok(entry)
}

/// POST /api/v1/salons/:salon_id/queue — join the walk-in queue.
pub async fn join_queue(
    State(state): State<AppState>,
    identity: Identity,
    Path(salon_id): Path<Uuid>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<QueueEntry>, QueueError> {
    validated(&request)?;

    let profile = state
        .directory
        .resolve(salon_id)
        .await?
        .ok_or(QueueError::SalonNotFound)?;
    let services = profile.select_services(&request.service_ids)?;

    let entry = state
        .store
        .join(&profile, &identity.user_id, services)
        .await?;
    Ok(Json(entry))
}

/// DELETE /api/v1/queue/:entry_id — leave the queue.
pub async fn leave_queue(
    State(state): State<AppState>,
    identity: Identity,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<QueueEntry>, QueueError> {
    owned_entry(&state, &identity, entry_id).await?;
    let entry = state.store.leave(entry_id).await?;
    Ok(Json(entry))
}

/// POST /api/v1/queue/:entry_id/check-in — submit an arrival check-in.
pub async fn submit_check_in(
    State(state): State<AppState>,
    identity: Identity,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<CheckInResponse>, QueueError> {
    validated(&request)?;
    owned_entry(&state, &identity, entry_id).await?;

    let outcome = state
        .store
        .submit_check_in(
            entry_id,
            CheckInAttempt {
                latitude: request.latitude,
                longitude: request.longitude,
                accuracy_m: request.accuracy_m,
                captured_at: Utc::now(),
            },
        )
        .await?;

    Ok(Json(CheckInResponse {
        entry_id,
        status: outcome.entry.status.to_string(),
        reason: outcome.entry.verification_reason,
        distance_m: outcome.distance_m,
    }))
}

/// POST /api/v1/salons/:salon_id/advance — staff: start the next service.
pub async fn staff_advance(
    State(state): State<AppState>,
    Staff(_): Staff,
    Path(salon_id): Path<Uuid>,
) -> Result<Json<QueueEntry>, QueueError> {
    let entry = state.store.advance(salon_id).await?;
    Ok(Json(entry))
}

/// POST /api/v1/queue/:entry_id/complete — staff: finish the service.
pub async fn staff_complete(
    State(state): State<AppState>,
    Staff(_): Staff,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<QueueEntry>, QueueError> {
    let entry = state.store.complete(entry_id).await?;
    Ok(Json(entry))
}

/// POST /api/v1/queue/:entry_id/arrival — staff: resolve a pending
/// verification.
pub async fn staff_confirm_arrival(
    State(state): State<AppState>,
    Staff(_): Staff,
    Path(entry_id): Path<Uuid>,
    Json(decision): Json<ArrivalDecision>,
) -> Result<Json<QueueEntry>, QueueError> {
    let entry = state
        .store
        .confirm_arrival(entry_id, decision.confirmed)
        .await?;
    Ok(Json(entry))
}

/// GET /api/v1/salons/:salon_id/queue — authoritative queue snapshot.
pub async fn salon_snapshot(
    State(state): State<AppState>,
    _identity: Identity,
    Path(salon_id): Path<Uuid>,
) -> Result<Json<QueueSnapshot>, QueueError> {
    state
        .directory
        .resolve(salon_id)
        .await?
        .ok_or(QueueError::SalonNotFound)?;
    Ok(Json(state.store.snapshot(salon_id).await))
}

/// POST /api/v1/queue/:entry_id/review — stamp a finished visit as
/// reviewed. The flag lives on the entry so it survives multi-device use.
pub async fn submit_review(
    State(state): State<AppState>,
    identity: Identity,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, QueueError> {
    // Terminal entries are no longer in the live store; the history
    // update itself is scoped to the caller's user id.
    state
        .store
        .mark_review_submitted(entry_id, &identity.user_id)
        .await?;
    Ok(Json(serde_json::json!({ "reviewed": true })))
}
