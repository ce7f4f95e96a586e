//! HTTP route handlers for the follow-up service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (database)
//!
//! # Admin
//! POST /admin/cart-emails/clear   - Clear a customer's scheduled cart
//!                                   emails and cart state (anti-forgery
//!                                   token required)
//! ```
//!
//! Cart lifecycle events are not exposed over HTTP: the embedding platform
//! integration calls [`crate::lifecycle::LifecycleOrchestrator`] directly.

pub mod admin;

use axum::{Router, routing::post};

use crate::state::AppState;

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/cart-emails/clear", post(admin::clear_scheduled_cart_emails))
}

/// Create all routes for the service.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/admin", admin_routes())
}
