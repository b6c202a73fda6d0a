//! Ticketing API client implementation

use crate::{
    error::ApiError,
    types::{
        AttendeeList, CheckInCommand, Envelope, OrganizerPlan, ScanTicketRequest,
        ScanTicketResponse, SetCheckInRequest,
    },
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Ticketing API client
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct TicketingClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl TicketingClient {
    /// Create a client for `base_url` with default HTTP settings
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, Client::new())
    }

    /// Create a client with a connect timeout
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn with_connect_timeout(
        base_url: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self::with_http_client(base_url, client))
    }

    /// Create a client around an existing `reqwest::Client`
    #[must_use]
    pub fn with_http_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            access_token: None,
        }
    }

    /// Attach a bearer token to every request
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Plans the operator can manage, unfiltered
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the operator has no plans, and other
    /// variants for transport, status, or decoding failures.
    pub async fn list_organizer_plans(
        &self,
        operator_id: &str,
    ) -> Result<Vec<OrganizerPlan>, ApiError> {
        let path = format!("/plans/organizer/{operator_id}");
        let request = self.client.get(self.url(&path));
        let plans = self.execute::<Vec<OrganizerPlan>>(request, &path).await?;
        Ok(plans.unwrap_or_default())
    }

    /// Submit a decoded ticket payload for verification
    ///
    /// # Errors
    ///
    /// Invalid, expired, or used codes come back as `ApiError::Api` or
    /// `ApiError::Rejected` carrying the server's message.
    pub async fn scan_ticket(
        &self,
        code: &str,
        operator_id: &str,
    ) -> Result<ScanTicketResponse, ApiError> {
        let path = "/tickets/scan";
        let request = self.client.post(self.url(path)).json(&ScanTicketRequest {
            code,
            user_id: operator_id,
        });

        self.execute::<ScanTicketResponse>(request, path)
            .await?
            .ok_or_else(|| ApiError::Decode("scan response carried no data".to_string()))
    }

    /// Check an attendee in or out
    ///
    /// # Errors
    ///
    /// Returns an error unless the backend confirms the change.
    pub async fn set_check_in_state(
        &self,
        registration_id: &str,
        operator_id: &str,
        action: CheckInCommand,
    ) -> Result<(), ApiError> {
        let path = "/tickets/check-in";
        let request = self.client.post(self.url(path)).json(&SetCheckInRequest {
            registration_id,
            user_id: operator_id,
            action,
        });

        self.execute::<serde_json::Value>(request, path).await?;
        Ok(())
    }

    /// Registrations and aggregates for a plan
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the plan has no roster yet, and other
    /// variants for transport, status, or decoding failures.
    pub async fn list_attendees(
        &self,
        plan_id: &str,
        operator_id: &str,
    ) -> Result<AttendeeList, ApiError> {
        let path = format!("/plans/{plan_id}/attendees");
        let request = self
            .client
            .get(self.url(&path))
            .query(&[("user_id", operator_id)]);

        let list = self.execute::<AttendeeList>(request, &path).await?;
        Ok(list.unwrap_or_default())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request and unwrap the response envelope
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Option<T>, ApiError> {
        let request = match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(path, status = status.as_u16(), "ticketing API responded");

        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| {
                tracing::warn!(
                    path,
                    status = status.as_u16(),
                    body = %excerpt(&body),
                    "ticketing API error without a message envelope"
                );
                String::new()
            });
            return Err(match status {
                StatusCode::NOT_FOUND => ApiError::NotFound { message },
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ApiError::Unauthorized { message }
                },
                status => ApiError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;

        if !envelope.success {
            return Err(ApiError::Rejected {
                message: envelope.message.unwrap_or_default(),
            });
        }

        Ok(envelope.data)
    }
}

/// Pull `message` out of an error envelope
///
/// Bodies that are not an envelope (proxy pages, plain text) yield `None`
/// and never reach the operator.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
}

/// First characters of a body, for logs
fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    body.trim().chars().take(LIMIT).collect()
}
