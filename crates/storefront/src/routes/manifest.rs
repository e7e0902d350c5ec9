//! Web app manifest route handler.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

/// Square icon sizes shipped under `/icons`.
pub const ICON_SIZES: [u32; 8] = [72, 96, 128, 144, 152, 192, 384, 512];

/// Serve the web app manifest.
pub async fn webmanifest() -> Response {
    let icons: Vec<_> = ICON_SIZES
        .iter()
        .map(|size| {
            serde_json::json!({
                "src": format!("/icons/icon-{size}x{size}.png"),
                "sizes": format!("{size}x{size}"),
                "type": "image/png"
            })
        })
        .collect();

    let manifest = serde_json::json!({
        "name": "E-Shop PWA",
        "short_name": "E-Shop",
        "start_url": "/",
        "icons": icons,
        "theme_color": "#2d3e50",
        "background_color": "#f5f6f8",
        "display": "standalone"
    });

    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        manifest.to_string(),
    )
        .into_response()
}
