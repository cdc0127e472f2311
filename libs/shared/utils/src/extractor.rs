use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use shared_models::auth::{Identity, Role};
use shared_models::error::AppError;

/// Middleware that lifts the gateway-asserted identity headers into request
/// extensions. The gateway authenticates; this service only reads the result.
pub async fn identity_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = header_value(&request, "x-user-id")?;
    let role = header_value(&request, "x-user-role")?;

    let user_id = Uuid::parse_str(&user_id)
        .map_err(|_| AppError::Auth("Invalid x-user-id header".to_string()))?;
    let role = Role::parse(&role)
        .ok_or_else(|| AppError::Auth("Unknown x-user-role header".to_string()))?;

    request.extensions_mut().insert(Identity::new(user_id, role));

    Ok(next.run(request).await)
}

fn header_value(request: &Request<Body>, name: &str) -> Result<String, AppError> {
    request
        .headers()
        .get(name)
        .ok_or_else(|| AppError::Auth(format!("Missing {} header", name)))?
        .to_str()
        .map(|v| v.to_string())
        .map_err(|_| AppError::Auth(format!("Invalid {} header", name)))
}
