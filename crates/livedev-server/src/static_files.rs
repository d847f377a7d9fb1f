//! Static file serving from the build output directory.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};

use crate::resolver::{ResolveRequest, Resolution, resolve};
use crate::state::AppState;

const TEXT_PLAIN: &str = "text/plain";
const TEXT_HTML: &str = "text/html";

/// Fallback handler: serve whatever the output directory holds at the path.
pub(crate) async fn serve_output(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let request = ResolveRequest {
        path: uri.path(),
        host: headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok()),
        redirect_status: state.redirect_status,
    };

    let resolution = resolve(&state.out_dir, &request).await;
    resolution_response(resolution, uri.path())
}

/// Map a resolver outcome to its HTTP response.
fn resolution_response(resolution: Resolution, path: &str) -> Response {
    match resolution {
        Resolution::File { content_type, body } => {
            with_content_type(StatusCode::OK, &content_type, body)
        }
        Resolution::Listing { body } => with_content_type(StatusCode::OK, TEXT_HTML, body),
        Resolution::Redirect { status, location } => {
            let body = format!("Location: {location}");
            let mut response = with_content_type(status, TEXT_PLAIN, body);
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    response.headers_mut().insert(header::LOCATION, value);
                }
                Err(e) => {
                    tracing::warn!(%location, error = %e, "Redirect location is not a valid header");
                }
            }
            response
        }
        Resolution::NotFound { request_path } => {
            tracing::debug!(path = %request_path, "Not found");
            with_content_type(
                StatusCode::NOT_FOUND,
                TEXT_PLAIN,
                format!("File {request_path} not found!"),
            )
        }
        Resolution::ReadError { message } => {
            tracing::error!(path, error = %message, "Failed to serve file");
            with_content_type(StatusCode::INTERNAL_SERVER_ERROR, TEXT_PLAIN, message)
        }
    }
}

fn with_content_type(status: StatusCode, content_type: &str, body: impl Into<Body>) -> Response {
    let mut response = (status, body.into()).into_response();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}
