use crate::auth::auth::AuthUser;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

fn unauthorized(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({"success": false, "message": message}));
    req.into_response(resp.map_into_boxed_body())
}

/// Resolves the bearer token into an [`AuthUser`] stored in request extensions.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = req
        .app_data::<Data<Config>>()
        .map(|c| c.jwt_secret.clone())
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let token = match req.headers().get("Authorization").map(|h| h.to_str()) {
        None => return Ok(unauthorized(req, "Missing Authorization header")),
        Some(Err(_)) => return Ok(unauthorized(req, "Invalid Authorization header encoding")),
        Some(Ok(value)) => match value.strip_prefix("Bearer ") {
            Some(t) => t.to_string(),
            None => return Ok(unauthorized(req, "Authorization header must start with Bearer")),
        },
    };

    let auth_user = match AuthUser::from_token(&token, &secret) {
        Ok(user) => user,
        Err(e) => {
            debug!(error = %e, "Rejected token");
            return Ok(unauthorized(req, "Invalid or expired token"));
        }
    };

    debug!(user_id = auth_user.user_id, username = %auth_user.username, "Authenticated");
    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
