//! Notification permission route handler.

use axum::{
    Form, Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::notifications::{NotificationPermission, enable_notifications};
use crate::routes::wants_fragment;
use crate::state::AppState;

/// Permission prompt result posted by the page.
#[derive(Debug, Deserialize)]
pub struct EnableForm {
    pub permission: String,
}

/// Turn the permission prompt result into a toast and, when granted, the
/// welcome notification the page should show.
///
/// Without the page script there is nothing to show either, so a plain form
/// post is redirected back to the shell.
#[instrument(skip(state, headers))]
pub async fn enable(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<EnableForm>,
) -> Result<Response> {
    let permission = form
        .permission
        .parse::<NotificationPermission>()
        .map_err(AppError::BadRequest)?;

    let outcome = enable_notifications(permission, state.config().base_url.as_str());
    tracing::info!(?permission, "Notification permission reported");

    if !wants_fragment(&headers) {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Json(outcome).into_response())
}
