//! # App Entry Page
//!
//! Serves the built single-page app, either embedded in the platform admin
//! iframe or opened directly.

use askama::Template;
use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::handlers::callback::render;
use crate::server::AppState;

/// Framing is restricted to the platform admin domains.
pub const FRAME_ANCESTORS_POLICY: &str =
    "frame-ancestors 'self' *.nuvemshop.com.br *.tiendanube.com *.nuvemshop.com";

const PLATFORM_MARKERS: [&str; 2] = ["nuvemshop", "tiendanube"];

#[derive(Template)]
#[template(path = "app_error.html")]
struct AppErrorPage<'a> {
    message: &'a str,
}

fn page_headers() -> [(HeaderName, &'static str); 4] {
    [
        (header::CONTENT_SECURITY_POLICY, FRAME_ANCESTORS_POLICY),
        (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        (header::PRAGMA, "no-cache"),
        (header::EXPIRES, "0"),
    ]
}

/// True when the request comes from inside the platform admin.
pub fn is_embedded_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .map(|referer| {
            let referer = referer.to_ascii_lowercase();
            PLATFORM_MARKERS
                .iter()
                .any(|marker| referer.contains(marker))
        })
        .unwrap_or(false)
}

/// Serves the app entry page
#[utoipa::path(
    get,
    path = "/app",
    responses(
        (status = 200, description = "Single-page app entry document", body = String, content_type = "text/html"),
        (status = 500, description = "Entry document unavailable", body = String, content_type = "text/html")
    ),
    tag = "app"
)]
pub async fn serve_app(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let embedded = is_embedded_request(&headers);
    tracing::info!(embedded, "Serving app entry page");

    match tokio::fs::read_to_string(&state.config.app_index_path).await {
        Ok(html) => (StatusCode::OK, page_headers(), Html(html)).into_response(),
        Err(err) => {
            tracing::error!(
                path = %state.config.app_index_path.display(),
                error = %err,
                "Failed to read app entry page"
            );
            let page = AppErrorPage {
                message: "The app entry page is not available. Please try again later.",
            };
            (page_headers(), render(StatusCode::INTERNAL_SERVER_ERROR, &page)).into_response()
        }
    }
}
