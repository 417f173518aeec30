use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::admin::AdminState;
use crate::http::OperationOutcome;

/// Require `Authorization: Bearer <api_key>` on every admin route.
pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if token == state.api_key() => next.run(request).await,
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request without valid credentials");
            (
                StatusCode::UNAUTHORIZED,
                axum::Json(OperationOutcome::failed("missing or invalid API key")),
            )
                .into_response()
        }
    }
}
