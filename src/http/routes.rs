//! Request routing shared by both listeners.
//!
//! Two routes only: the ACME HTTP-01 well-known path, answered from the
//! challenge store, and a catch-all that upgrades the request to HTTPS with a
//! 302. A non-GET method on the challenge path falls through to the catch-all
//! rather than producing a 405, so no path ever dead-ends in an error page.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::Host;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::challenge::ChallengeStore;
use crate::config::{ACME_CHALLENGE_ROUTE, REQUEST_TIMEOUT_SECS};
use crate::middleware::request_id_layer;

/// Builds the routing table served by both listeners.
///
/// The request-id span is the outermost layer; the timeout layer bounds each
/// request so slow clients cannot pin handler resources indefinitely.
pub fn build_router(store: ChallengeStore) -> Router {
    Router::new()
        .route(
            ACME_CHALLENGE_ROUTE,
            get(challenge_response).fallback(redirect_to_https),
        )
        .fallback(redirect_to_https)
        .with_state(store)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(axum::middleware::from_fn(request_id_layer))
}

/// Answers `GET /.well-known/acme-challenge/{token}`.
///
/// A hit returns the stored key authorization verbatim as `text/plain`; an
/// unknown token is a normal 404 with an empty body, not an error.
async fn challenge_response(
    State(store): State<ChallengeStore>,
    Path(token): Path<String>,
    uri: Uri,
) -> Response {
    match store.lookup(&token).await {
        Some(response) => {
            tracing::debug!(path = %uri.path(), "Found ACME verification token");
            ([(header::CONTENT_TYPE, "text/plain")], response).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Catch-all: 302 to the same host, path, and query on the encrypted scheme.
///
/// The Host header is reflected verbatim, port included, so one wildcard
/// certificate can answer for every virtual host behind this edge.
async fn redirect_to_https(Host(host): Host, uri: Uri) -> Response {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let location = format!("https://{host}{path_and_query}");

    tracing::debug!(from = %uri, to = %location, "Redirecting to HTTPS");

    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
