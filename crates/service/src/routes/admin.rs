//! Administrative actions.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{info, instrument};

use followup_core::{Email, UserId};

use crate::error::AppError;
use crate::state::AppState;

/// Form data for the clear action.
#[derive(Debug, Deserialize)]
pub struct ClearCartEmailsForm {
    /// Registered customer id to clear, if any.
    pub user_id: Option<String>,
    /// Email address to clear, if any.
    pub email: Option<String>,
    /// Anti-forgery token.
    pub token: String,
}

/// Clear a customer's scheduled cart emails and stored cart state.
///
/// Requires the configured anti-forgery token; a bad token halts the
/// request with a visible confirmation failure rather than redirecting.
/// On success, redirects back to the admin reports page so a refresh does
/// not repeat the action.
#[instrument(skip(state, form))]
pub async fn clear_scheduled_cart_emails(
    State(state): State<AppState>,
    Form(form): Form<ClearCartEmailsForm>,
) -> Result<Response, AppError> {
    if form.token != state.config().admin_token.expose_secret() {
        return Err(AppError::Unauthorized(
            "Invalid confirmation token. Are you sure you want to do this?".to_owned(),
        ));
    }

    let user_id = parse_user_id(form.user_id.as_deref())?;
    let email = parse_email(form.email.as_deref())?;

    if user_id.is_none() && email.is_none() {
        return Err(AppError::BadRequest(
            "A user id or an email address is required".to_owned(),
        ));
    }

    state
        .orchestrator()
        .operator_clear(user_id, email.as_ref())
        .await?;

    info!(?user_id, email = ?email.as_ref().map(Email::as_str), "cleared scheduled cart emails");

    let mut location = String::from("/admin/reports/carts?cleared=1");
    if let Some(user_id) = user_id {
        location.push_str(&format!("&user_id={user_id}"));
    }
    if let Some(email) = email.as_ref() {
        location.push_str(&format!("&email={email}"));
    }

    Ok(Redirect::to(&location).into_response())
}

fn parse_user_id(raw: Option<&str>) -> Result<Option<UserId>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let id: i64 = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid user id: {raw}")))?;

    Ok((id > 0).then(|| UserId::new(id)))
}

fn parse_email(raw: Option<&str>) -> Result<Option<Email>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    Email::parse(raw)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("Invalid email address: {e}")))
}
