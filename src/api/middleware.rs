//! API Middleware
//!
//! Session authentication and request logging.

use std::net::IpAddr;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::RequestContext;
use crate::state::AppState;
use crate::store::session_token_hash;

// =========================================================================
// Session Authentication Middleware
// =========================================================================

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn unauthorized(error: &str, error_code: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": error,
            "error_code": error_code
        })),
    )
        .into_response()
}

/// Resolve the bearer token to a user and attach it to the request
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = match bearer_token(&headers) {
        Some(token) => token,
        None => return Err(unauthorized("Missing bearer token", "missing_token")),
    };

    let user_id = match state.store.find_session_user(&session_token_hash(token)).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return Err(unauthorized("Invalid session", "invalid_session")),
        Err(e) => {
            tracing::error!("Store error during session lookup: {}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "error_code": "database_error"
                })),
            )
                .into_response());
        }
    };

    let correlation_id = headers
        .get("X-Correlation-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok());

    let context = RequestContext::new(user_id)
        .with_correlation_id(correlation_id)
        .with_client_ip(forwarded_client_ip(&headers));

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// First address of `X-Forwarded-For`, if it parses
fn forwarded_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("X-Forwarded-For")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let masked_value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware. Runs inside authentication, so everything the
/// handler logs lands in the request span with user and correlation ID.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let span = match request.extensions().get::<RequestContext>() {
        Some(context) => context.span(),
        None => tracing::info_span!("request"),
    };

    async move {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let started = std::time::Instant::now();

        tracing::debug!(
            method = %method,
            uri = %uri,
            headers = ?mask_headers_for_logging(request.headers()),
            "Incoming request"
        );

        let response = next.run(request).await;
        let status = response.status();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if status.is_server_error() {
            tracing::error!(%method, %uri, %status, elapsed_ms, "Request failed");
        } else if status.is_client_error() {
            tracing::info!(%method, %uri, %status, elapsed_ms, "Request refused");
        } else {
            tracing::info!(%method, %uri, %status, elapsed_ms, "Request completed");
        }

        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(
            bearer_token(&headers_with_authorization("Bearer abc.def")),
            Some("abc.def")
        );
        assert_eq!(
            bearer_token(&headers_with_authorization("bearer   padded  ")),
            Some("padded")
        );
        assert_eq!(bearer_token(&headers_with_authorization("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with_authorization("Bearer")), None);
        assert_eq!(bearer_token(&headers_with_authorization("Bearer  ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_forwarded_client_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(
            forwarded_client_ip(&headers),
            Some("203.0.113.7".parse().unwrap())
        );

        headers.insert("x-forwarded-for", "not-an-ip".parse().unwrap());
        assert_eq!(forwarded_client_ip(&headers), None);
    }

    #[test]
    fn test_mask_headers_for_logging() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("authorization", "Bearer secret-token".parse().unwrap());
        headers.insert("x-correlation-id", "abc-123".parse().unwrap());

        let masked = mask_headers_for_logging(&headers);

        let auth = masked.iter().find(|(k, _)| k == "authorization");
        let content_type = masked.iter().find(|(k, _)| k == "content-type");
        let correlation = masked.iter().find(|(k, _)| k == "x-correlation-id");

        assert_eq!(auth.unwrap().1, "[REDACTED]");
        assert_eq!(content_type.unwrap().1, "application/json");
        assert_eq!(correlation.unwrap().1, "abc-123");
    }

    #[test]
    fn test_sensitive_headers_list() {
        assert!(SENSITIVE_HEADERS.contains(&"authorization"));
        assert!(SENSITIVE_HEADERS.contains(&"cookie"));
        assert!(!SENSITIVE_HEADERS.contains(&"content-type"));
    }
}
