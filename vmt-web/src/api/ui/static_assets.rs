//! Static asset handlers
//!
//! Embeds and serves CSS/JS files at compile time

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

const VMT_CSS: &str = include_str!("../../../static/vmt.css");
const VMT_JS: &str = include_str!("../../../static/vmt.js");

/// GET /static/vmt.css
pub async fn serve_vmt_css() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "text/css"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        VMT_CSS,
    )
        .into_response()
}

/// GET /static/vmt.js
pub async fn serve_vmt_js() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "application/javascript"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        VMT_JS,
    )
        .into_response()
}
