use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Attach the caller's `User` to the request. Without a configured secret
/// every request runs as the anonymous admin.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = if config.auth_enabled() {
        let auth_value = request
            .headers()
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
            .to_str()
            .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

        let token = auth_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

        validate_token(token, &config.jwt_secret).map_err(AppError::Auth)?
    } else {
        User::anonymous()
    };

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Auth("Admin role required".to_string()))
    }
}
