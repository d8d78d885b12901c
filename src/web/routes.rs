use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tracing::{debug, warn};
use url::Url;

use super::AppState;
use crate::discourse::{EventKind, EVENT_HEADER, INSTANCE_HEADER};
use crate::handler::HandlerError;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/discourse", post(discourse_webhook))
        .route("/healthz", get(health))
}

async fn discourse_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = header_str(&headers, EVENT_HEADER).unwrap_or_default();
    if EventKind::from_header(event).is_none() {
        debug!(event = %event, "Ignoring unhandled event type");
        return StatusCode::NO_CONTENT.into_response();
    }

    let instance = header_str(&headers, INSTANCE_HEADER).filter(|s| !s.is_empty());
    let forum_url = match (instance, state.forum_url.as_deref()) {
        (Some(instance), Some(configured)) if !same_origin(instance, configured) => {
            warn!(instance = %instance, configured = %configured, "Rejecting webhook from unexpected forum");
            return (
                StatusCode::BAD_REQUEST,
                format!("{INSTANCE_HEADER} does not match the configured forum"),
            )
                .into_response();
        }
        (Some(instance), _) => instance,
        (None, Some(configured)) => configured,
        (None, None) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("Missing {INSTANCE_HEADER} header"),
            )
                .into_response();
        }
    };

    match state.handler.handle(event, forum_url, &body).await {
        Ok(Some(message)) => (StatusCode::OK, message).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e @ (HandlerError::DecodePayload(_) | HandlerError::Message(_))) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e @ HandlerError::Enrichment(_)) => {
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Scheme, host and port agree; unparseable URLs never match.
fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_origin() {
        assert!(same_origin("https://forum.example.com/", "https://forum.example.com"));
        assert!(same_origin("https://Forum.Example.com", "https://forum.example.com:443"));
        assert!(!same_origin("https://attacker.example", "https://forum.example.com"));
        assert!(!same_origin("http://forum.example.com", "https://forum.example.com"));
        assert!(!same_origin("forum.example.com", "https://forum.example.com"));
    }
}
