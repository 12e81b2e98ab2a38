use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::auth::{AuthError, AuthGate};

/// Axum middleware guarding protected routes.
/// On success the verified `Credential` is inserted into request extensions.
pub async fn require_auth(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| {
            warn!("Rejected request: Authorization header is not valid UTF-8");
            AuthError::MalformedCredential("non UTF-8 header".to_string())
        })?),
        None => None,
    };

    let credential = gate.authorize(header_value)?;
    request.extensions_mut().insert(credential);

    Ok(next.run(request).await)
}
