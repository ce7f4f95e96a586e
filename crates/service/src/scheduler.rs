//! Contract with the external email scheduler.
//!
//! The scheduler owns follow-up email definitions, the send queue, and the
//! sent-email history. This service only asks it to queue or drop cart
//! emails and queries the history for conversion attribution; it never
//! schedules anything itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use followup_core::{Email, EmailId, ProductId, UserId};

use crate::dedup::{DedupKey, DedupSet};
use crate::models::CartLineItem;

/// Errors from the scheduler collaborator.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Request to queue follow-up emails for a cart's current state.
#[derive(Debug, Clone)]
pub struct QueueCartEmails {
    /// The cart lines the emails may reference.
    pub items: Vec<CartLineItem>,
    /// Registered addressee, when logged in.
    pub user_id: Option<UserId>,
    /// Session email, for guests (and as a fallback address).
    pub email: Option<Email>,
    /// Product just added, when the update came from an add-to-cart.
    pub added_product: Option<ProductId>,
    /// Pairs already queued for this cart; the scheduler must skip these.
    pub already_queued: DedupSet,
}

/// One sent email from the scheduler's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentEmailRecord {
    /// The scheduler's queue item id.
    pub queue_id: i64,
    /// Which follow-up email definition was sent.
    pub email_id: EmailId,
    /// Registered addressee, if any.
    pub user_id: Option<UserId>,
    /// Address the email went to.
    pub user_email: Option<Email>,
    /// When it was sent.
    pub date_sent: DateTime<Utc>,
}

/// Filter for the sent-email history.
#[derive(Debug, Clone)]
pub struct SentEmailQuery {
    /// Restrict to these email definitions.
    pub email_ids: Vec<EmailId>,
    /// Match by registered addressee.
    pub user_id: Option<UserId>,
    /// Match by address (used when no registered id is known).
    pub email: Option<Email>,
    /// Inclusive lower bound on `date_sent`.
    pub sent_after: DateTime<Utc>,
    /// Inclusive upper bound on `date_sent`.
    pub sent_before: DateTime<Utc>,
    /// Maximum records to return, most recent first.
    pub limit: usize,
}

/// The scheduler collaborator.
#[async_trait]
pub trait EmailScheduler: Send + Sync {
    /// Ids of every active follow-up email definition.
    async fn active_email_ids(&self) -> Result<Vec<EmailId>, SchedulerError>;

    /// Queue cart emails for this cart state. Returns the `(email, product)`
    /// pairs the scheduler actually queued, so the caller can mark them.
    async fn queue_cart_emails(
        &self,
        request: QueueCartEmails,
    ) -> Result<Vec<DedupKey>, SchedulerError>;

    /// Delete all unsent cart emails addressed to the given user and/or
    /// email. Returns how many were dropped.
    async fn delete_unsent_cart_emails(
        &self,
        user_id: Option<UserId>,
        email: Option<&Email>,
    ) -> Result<u64, SchedulerError>;

    /// Query the sent-email history, most recent first.
    async fn sent_emails(
        &self,
        query: &SentEmailQuery,
    ) -> Result<Vec<SentEmailRecord>, SchedulerError>;
}
