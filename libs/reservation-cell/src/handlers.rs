use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{Json, Response},
    Extension,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use schedule_cell::models::{DecideBlockRequest, ScheduleError, SubmitBlockRequest};
use shared_models::auth::{Identity, Role};
use shared_models::error::AppError;

use crate::error::ReservationError;
use crate::models::{
    AcquireHoldRequest, AcquireOutcome, AvailabilityQuery, BookingListQuery, BookingStatus,
    CancelBookingRequest, ConsumeOutcome, ReleaseOutcome, UpdateBookingStatusRequest,
};
use crate::state::SchedulingState;

fn map_reservation_error(err: ReservationError) -> AppError {
    match err {
        ReservationError::Validation(msg) => AppError::ValidationError(msg),
        ReservationError::NotFound(msg) => AppError::NotFound(msg),
        ReservationError::InvalidState(msg) => {
            error!("Invalid state transition: {}", msg);
            AppError::Internal("Operation failed".to_string())
        }
        ReservationError::Internal(msg) => AppError::Internal(msg),
    }
}

fn map_schedule_error(err: ScheduleError) -> AppError {
    match err {
        ScheduleError::Validation(msg) => AppError::ValidationError(msg),
        ScheduleError::NotFound(msg) => AppError::NotFound(msg),
        ScheduleError::InvalidState(msg) => {
            error!("Invalid state transition: {}", msg);
            AppError::Internal("Operation failed".to_string())
        }
    }
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// Availability snapshot for a professional over a date range
pub async fn get_availability(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    debug!(
        "Availability request for professional {} from user {}",
        query.professional_id, identity.user_id
    );

    let slots = state
        .availability
        .get_availability(query.professional_id, query.from, query.to)
        .map_err(map_reservation_error)?;

    Ok(Json(json!({
        "professional_id": query.professional_id,
        "from": query.from,
        "to": query.to,
        "slots": slots
    })))
}

/// WebSocket stream of availability change events for one professional
pub async fn subscribe_availability(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Path(professional_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    info!(
        "Availability subscription for professional {} from user {}",
        professional_id, identity.user_id
    );
    ws.on_upgrade(move |socket| stream_availability_events(socket, state, professional_id))
}

async fn stream_availability_events(
    socket: WebSocket,
    state: SchedulingState,
    professional_id: Uuid,
) {
    let mut events = state.availability.subscribe(professional_id);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            error!("Failed to serialize availability event: {}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    // Bounded buffer overflowed for this subscriber; tell it
                    // to refetch instead of blocking the publisher.
                    warn!(
                        "Subscriber for {} lagged by {} events",
                        professional_id, missed
                    );
                    let resync = json!({ "type": "resync", "missed": missed }).to_string();
                    if sink.send(Message::Text(resync.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    drop(events);
    state.availability.prune_channel(professional_id);
    debug!("Subscriber for {} disconnected", professional_id);
}

// ==============================================================================
// HOLDS
// ==============================================================================

/// Try to acquire a temporary hold on a slot
pub async fn acquire_hold(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<AcquireHoldRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!(
        "Hold request on {}/{}/{} from user {}",
        request.professional_id, request.date, request.start_time, identity.user_id
    );

    let outcome = state
        .store
        .try_acquire(&request, identity.user_id)
        .map_err(map_reservation_error)?;

    let status = match &outcome {
        AcquireOutcome::Granted { .. } => StatusCode::CREATED,
        AcquireOutcome::Conflict { .. } => StatusCode::CONFLICT,
    };
    Ok((status, Json(json!(outcome))))
}

/// Consume a hold into a confirmed booking
pub async fn consume_hold(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Path(token): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!("Consume request for hold {} from user {}", token, identity.user_id);

    if let Some(hold) = state.store.get_hold(token) {
        if hold.holder_id != identity.user_id {
            return Err(AppError::Auth(
                "Hold belongs to a different holder".to_string(),
            ));
        }
    }

    let outcome = state
        .store
        .consume(token, identity.user_id)
        .map_err(map_reservation_error)?;

    let status = match &outcome {
        ConsumeOutcome::Consumed { .. } => StatusCode::CREATED,
        ConsumeOutcome::Expired => StatusCode::GONE,
        ConsumeOutcome::NotFound => StatusCode::NOT_FOUND,
    };
    Ok((status, Json(json!(outcome))))
}

/// Release a hold early, abandoning the booking flow
pub async fn release_hold(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Path(token): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!("Release request for hold {} from user {}", token, identity.user_id);

    if let Some(hold) = state.store.get_hold(token) {
        if hold.holder_id != identity.user_id && identity.role != Role::Admin {
            return Err(AppError::Auth(
                "Hold belongs to a different holder".to_string(),
            ));
        }
    }

    let outcome = state
        .store
        .release(token)
        .map_err(map_reservation_error)?;

    let status = match &outcome {
        ReleaseOutcome::Released => StatusCode::OK,
        ReleaseOutcome::NotFound => StatusCode::NOT_FOUND,
    };
    Ok((status, Json(json!(outcome))))
}

// ==============================================================================
// BOOKINGS
// ==============================================================================

/// List a professional's bookings
pub async fn list_bookings(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Value>, AppError> {
    debug!(
        "Booking list request for professional {} from user {}",
        query.professional_id, identity.user_id
    );

    let bookings = state
        .ledger
        .list(query.professional_id, query.from, query.to);

    Ok(Json(json!({
        "professional_id": query.professional_id,
        "bookings": bookings
    })))
}

/// Advance a booking through its lifecycle
pub async fn update_booking_status(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Status update for booking {} to {} from user {}",
        booking_id, request.status, identity.user_id
    );

    if identity.role == Role::Patient {
        return Err(AppError::Auth(
            "Only the appointment workflow may update booking status".to_string(),
        ));
    }
    if request.status == BookingStatus::Cancelled {
        return Err(AppError::BadRequest(
            "Use the cancel endpoint to cancel a booking".to_string(),
        ));
    }

    let booking = state
        .ledger
        .transition(booking_id, request.status)
        .map_err(map_reservation_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

/// Cancel a booking, freeing its slot immediately
pub async fn cancel_booking(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Cancel request for booking {} from user {}",
        booking_id, identity.user_id
    );

    let booking = state
        .ledger
        .get(booking_id)
        .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", booking_id)))?;
    let authorized = identity.role == Role::Admin
        || identity.user_id == booking.patient_id
        || identity.user_id == booking.professional_id;
    if !authorized {
        return Err(AppError::Auth(
            "Not a participant of this booking".to_string(),
        ));
    }

    let cancelled = state
        .store
        .cancel_booking(booking_id, request.reason)
        .map_err(map_reservation_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": cancelled
    })))
}

// ==============================================================================
// BLOCKS
// ==============================================================================

/// Submit a block request for approval
pub async fn submit_block(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<SubmitBlockRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!(
        "Block submission for professional {} from user {}",
        request.professional_id, identity.user_id
    );

    if identity.role == Role::Patient {
        return Err(AppError::Auth("Patients cannot submit blocks".to_string()));
    }
    if identity.role == Role::Professional && identity.user_id != request.professional_id {
        return Err(AppError::Auth(
            "Professionals can only block their own schedule".to_string(),
        ));
    }

    let block = state.blocks.submit(request).map_err(map_schedule_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "block": block
        })),
    ))
}

/// Approve or reject a pending block
pub async fn decide_block(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Path(block_id): Path<Uuid>,
    Json(request): Json<DecideBlockRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Block decision for {} from user {}: approve={}",
        block_id, identity.user_id, request.approve
    );

    if !identity.role.can_decide_blocks() {
        return Err(AppError::Auth("Only admins decide blocks".to_string()));
    }

    let (block, released_holds) = state
        .blocks
        .decide(
            block_id,
            identity.user_id,
            request.approve,
            request.rejection_reason,
        )
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "block": block,
        "released_holds": released_holds
    })))
}

/// Soft-deactivate a block
pub async fn deactivate_block(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Path(block_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Block deactivation for {} from user {}",
        block_id, identity.user_id
    );

    if !identity.role.can_decide_blocks() {
        return Err(AppError::Auth("Only admins deactivate blocks".to_string()));
    }

    let block = state
        .blocks
        .deactivate(block_id)
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "block": block
    })))
}

#[derive(Debug, serde::Deserialize)]
pub struct BlockListQuery {
    pub professional_id: Uuid,
}

/// List a professional's blocks with their approval state
pub async fn list_blocks(
    State(state): State<SchedulingState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<BlockListQuery>,
) -> Result<Json<Value>, AppError> {
    debug!(
        "Block list request for professional {} from user {}",
        query.professional_id, identity.user_id
    );

    let blocks = state.blocks.list_for_professional(query.professional_id);

    Ok(Json(json!({
        "professional_id": query.professional_id,
        "blocks": blocks
    })))
}
