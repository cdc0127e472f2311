use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_utils::extractor::identity_middleware;

use crate::handlers::{list_templates, publish_template, supersede_template};
use crate::services::template::TemplateService;

pub fn create_schedule_router(templates: Arc<TemplateService>) -> Router {
    let protected_routes = Router::new()
        .route("/templates", post(publish_template).get(list_templates))
        .route("/templates/{template_id}/supersede", post(supersede_template))
        .layer(middleware::from_fn(identity_middleware));

    Router::new().merge(protected_routes).with_state(templates)
}
