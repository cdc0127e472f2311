use std::sync::Arc;

use axum::{routing::get, Router};

use reservation_cell::{create_reservation_router, SchedulingState};
use schedule_cell::{create_schedule_router, TemplateService};

pub fn create_router(templates: Arc<TemplateService>, scheduling: SchedulingState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/schedules", create_schedule_router(templates))
        .nest("/scheduling", create_reservation_router(scheduling))
}
