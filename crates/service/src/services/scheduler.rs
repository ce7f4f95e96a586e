//! HTTP client for the email scheduler service.
//!
//! Implements [`EmailScheduler`] against the scheduler's JSON API. The
//! scheduler owns email definitions, the queue, and send history; every
//! call here is a thin typed wrapper over one of its endpoints.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;

use followup_core::{Email, EmailId, UserId};

use crate::config::SchedulerConfig;
use crate::dedup::DedupKey;
use crate::scheduler::{EmailScheduler, QueueCartEmails, SchedulerError, SentEmailQuery, SentEmailRecord};

/// List envelope used by the scheduler API.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// Response to a delete request.
#[derive(Debug, Deserialize)]
struct DeleteResponse {
    deleted: u64,
}

/// Email scheduler API client.
#[derive(Clone)]
pub struct HttpScheduler {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScheduler {
    /// Create a new scheduler API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the token is not
    /// a valid header value.
    pub fn new(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_token.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| SchedulerError::Parse(format!("Invalid API token format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Check a response status, mapping failures to a typed error.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SchedulerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(SchedulerError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl EmailScheduler for HttpScheduler {
    async fn active_email_ids(&self) -> Result<Vec<EmailId>, SchedulerError> {
        let response = self
            .client
            .get(self.endpoint("emails/active"))
            .send()
            .await?;

        let body: ListResponse<EmailId> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SchedulerError::Parse(e.to_string()))?;

        Ok(body.data)
    }

    async fn queue_cart_emails(
        &self,
        request: QueueCartEmails,
    ) -> Result<Vec<DedupKey>, SchedulerError> {
        let body = serde_json::json!({
            "user_id": request.user_id,
            "email": request.email,
            "added_product": request.added_product,
            "items": request.items,
            "already_queued": request.already_queued,
        });

        let response = self
            .client
            .post(self.endpoint("cart-emails/queue"))
            .json(&body)
            .send()
            .await?;

        let body: ListResponse<DedupKey> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SchedulerError::Parse(e.to_string()))?;

        Ok(body.data)
    }

    async fn delete_unsent_cart_emails(
        &self,
        user_id: Option<UserId>,
        email: Option<&Email>,
    ) -> Result<u64, SchedulerError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(user_id) = user_id {
            query.push(("user_id", user_id.to_string()));
        }
        if let Some(email) = email {
            query.push(("email", email.as_str().to_owned()));
        }

        let response = self
            .client
            .delete(self.endpoint("cart-emails/unsent"))
            .query(&query)
            .send()
            .await?;

        let body: DeleteResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SchedulerError::Parse(e.to_string()))?;

        Ok(body.deleted)
    }

    async fn sent_emails(
        &self,
        query: &SentEmailQuery,
    ) -> Result<Vec<SentEmailRecord>, SchedulerError> {
        let email_ids = query
            .email_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut params: Vec<(&str, String)> = vec![
            ("email_ids", email_ids),
            ("sent_after", query.sent_after.to_rfc3339()),
            ("sent_before", query.sent_before.to_rfc3339()),
            ("limit", query.limit.to_string()),
            ("order", "sent_desc".to_owned()),
        ];
        if let Some(user_id) = query.user_id {
            params.push(("user_id", user_id.to_string()));
        }
        if let Some(email) = query.email.as_ref() {
            params.push(("email", email.as_str().to_owned()));
        }

        let response = self
            .client
            .get(self.endpoint("cart-emails/sent"))
            .query(&params)
            .send()
            .await?;

        let body: ListResponse<SentEmailRecord> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SchedulerError::Parse(e.to_string()))?;

        Ok(body.data)
    }
}
