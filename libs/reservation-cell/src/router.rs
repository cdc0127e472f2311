use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::identity_middleware;

use crate::handlers::{
    acquire_hold, cancel_booking, consume_hold, deactivate_block, decide_block, get_availability,
    list_blocks, list_bookings, release_hold, submit_block, subscribe_availability,
    update_booking_status,
};
use crate::state::SchedulingState;

pub fn create_reservation_router(state: SchedulingState) -> Router {
    let protected_routes = Router::new()
        .route("/availability", get(get_availability))
        .route(
            "/availability/{professional_id}/subscribe",
            get(subscribe_availability),
        )
        .route("/holds", post(acquire_hold))
        .route("/holds/{token}/consume", post(consume_hold))
        .route("/holds/{token}/release", post(release_hold))
        .route("/bookings", get(list_bookings))
        .route("/bookings/{booking_id}/status", post(update_booking_status))
        .route("/bookings/{booking_id}/cancel", post(cancel_booking))
        .route("/blocks", post(submit_block).get(list_blocks))
        .route("/blocks/{block_id}/decide", post(decide_block))
        .route("/blocks/{block_id}/deactivate", post(deactivate_block))
        .layer(middleware::from_fn(identity_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
