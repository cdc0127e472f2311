use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use shared_models::auth::{Identity, Role};
use shared_models::error::AppError;

use crate::models::{PublishTemplateRequest, ScheduleError};
use crate::services::template::TemplateService;

pub(crate) fn map_schedule_error(err: ScheduleError) -> AppError {
    match err {
        ScheduleError::Validation(msg) => AppError::ValidationError(msg),
        ScheduleError::NotFound(msg) => AppError::NotFound(msg),
        ScheduleError::InvalidState(msg) => {
            // Caller-side state bug; log the detail, surface a generic failure.
            error!("Invalid state transition: {}", msg);
            AppError::Internal("Operation failed".to_string())
        }
    }
}

fn authorize_template_access(identity: &Identity, professional_id: Uuid) -> Result<(), AppError> {
    if !identity.role.can_manage_templates() {
        return Err(AppError::Auth(
            "Only professionals and admins manage templates".to_string(),
        ));
    }
    if identity.role == Role::Professional && identity.user_id != professional_id {
        return Err(AppError::Auth(
            "Professionals can only manage their own templates".to_string(),
        ));
    }
    Ok(())
}

/// Publish a first schedule template for a professional
pub async fn publish_template(
    State(templates): State<Arc<TemplateService>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<PublishTemplateRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Template publish request for professional {} from user {}",
        request.professional_id, identity.user_id
    );
    authorize_template_access(&identity, request.professional_id)?;

    let template = templates.publish(request).map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "template": template
    })))
}

/// Replace an active template, closing the old validity window
pub async fn supersede_template(
    State(templates): State<Arc<TemplateService>>,
    Extension(identity): Extension<Identity>,
    Path(template_id): Path<Uuid>,
    Json(request): Json<PublishTemplateRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Template supersede request for {} from user {}",
        template_id, identity.user_id
    );
    authorize_template_access(&identity, request.professional_id)?;

    let template = templates
        .supersede(template_id, request)
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "template": template
    })))
}

#[derive(Debug, Deserialize)]
pub struct TemplateListQuery {
    pub professional_id: Uuid,
}

/// List a professional's template history, superseded windows included
pub async fn list_templates(
    State(templates): State<Arc<TemplateService>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Template list request for professional {} from user {}",
        query.professional_id, identity.user_id
    );

    let history = templates.list_for_professional(query.professional_id);

    Ok(Json(json!({
        "professional_id": query.professional_id,
        "templates": history
    })))
}
