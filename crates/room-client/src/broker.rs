//! Credential broker HTTP client.
//!
//! The broker is the REST service that creates rooms and issues the
//! single-use connection tokens the media transport accepts.
//!
//! # Security
//!
//! - Every request carries static basic-auth credentials
//! - Tokens are held as [`SecretString`] and never logged
//! - Error response bodies are never logged or surfaced
//! - No retries at this layer; callers decide what a failure means

use crate::config::Config;
use crate::errors::{BrokerError, RoomError};
use crate::observability::metrics;
use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use common::types::SessionId;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Connect timeout for broker requests in seconds.
const BROKER_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Role requested for a connection token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Receive-only participant.
    Subscriber,
    /// May publish local media (the role this client always requests).
    Publisher,
    /// Publisher with moderation rights.
    Moderator,
}

/// Room as reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionInfo {
    /// Room identifier.
    #[serde(alias = "sessionId")]
    pub id: SessionId,

    /// Creation time in epoch milliseconds, when reported.
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<i64>,
}

impl SessionInfo {
    /// Minimal description when the broker could not describe the room.
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            created_at: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest<'a> {
    custom_session_id: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateConnectionRequest {
    role: Role,
}

#[derive(Debug, Deserialize)]
struct ConnectionResponse {
    token: SecretString,
}

/// Source of admission tokens for the room orchestrator.
#[async_trait]
pub trait AdmissionBroker: Send + Sync {
    /// Ensure the room exists and obtain a publisher token for it.
    async fn request_admission(&self, session_id: &SessionId) -> Result<SecretString, RoomError>;

    /// Check that the broker is reachable and accepts our credentials.
    async fn test_connection(&self) -> Result<(), RoomError>;
}

/// HTTP client for the token broker.
#[derive(Clone)]
pub struct BrokerClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Broker base URL including the API prefix.
    api_base: Url,

    /// Precomputed `Authorization` header value.
    authorization: SecretString,
}

impl BrokerClient {
    /// Create a new broker client.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Internal` if the HTTP client cannot be built or the
    /// configured URL does not parse.
    pub fn new(config: &Config) -> Result<Self, RoomError> {
        let client = Client::builder()
            .timeout(config.broker_request_timeout())
            .connect_timeout(Duration::from_secs(BROKER_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "room.broker", error = %e, "Failed to build HTTP client");
                RoomError::Internal(format!("failed to build HTTP client: {e}"))
            })?;

        let raw = format!("{}{}", config.broker_url, config.broker_api_path);
        let api_base = Url::parse(&raw).map_err(|e| {
            error!(target: "room.broker", error = %e, "Invalid broker URL");
            RoomError::Internal(format!("invalid broker URL: {e}"))
        })?;

        if api_base.cannot_be_a_base() {
            return Err(RoomError::Internal(format!(
                "broker URL cannot carry a path: {raw}"
            )));
        }

        Ok(Self {
            client,
            api_base,
            authorization: config.broker_credentials().authorization_header(),
        })
    }

    /// Build an endpoint URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Start a request with auth headers set. Callers attach any body after.
    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client
            .request(method, self.endpoint(segments))
            .header(AUTHORIZATION, self.authorization.expose_secret())
            .header(CONTENT_TYPE, "application/json")
    }

    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, BrokerError> {
        request
            .send()
            .await
            .map_err(|e| {
                warn!(target: "room.broker", operation, error = %e, "Broker request failed");
                metrics::record_broker_request(operation, "unreachable");
                BrokerError::Unreachable(e.without_url().to_string())
            })
    }

    /// Create the room, or look it up if it already exists.
    ///
    /// # Errors
    ///
    /// - `RoomError::Broker(Unreachable)` if the broker cannot be reached
    /// - `RoomError::Broker(Status)` for any non-2xx status other than 409
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn create_session(&self, session_id: &SessionId) -> Result<SessionInfo, RoomError> {
        let body = CreateSessionRequest {
            custom_session_id: session_id.as_str(),
        };
        let request = self.request(Method::POST, &["sessions"]).json(&body);

        let response = self
            .execute("create_session", request)
            .await
            .map_err(RoomError::Broker)?;
        let status = response.status();
        metrics::record_broker_request("create_session", status_label(status));

        if status.is_success() {
            return Ok(response.json::<SessionInfo>().await.unwrap_or_else(|e| {
                warn!(target: "room.broker", error = %e, "Unparsable session body, using requested id");
                SessionInfo::new(session_id.clone())
            }));
        }

        if status == StatusCode::CONFLICT {
            debug!(target: "room.broker", "Session already exists, fetching it");
            return Ok(match self.fetch_session(session_id).await {
                Ok(info) => info,
                Err(e) => {
                    warn!(target: "room.broker", error = %e, "Existing session lookup failed, continuing");
                    SessionInfo::new(session_id.clone())
                }
            });
        }

        warn!(target: "room.broker", status = %status, "Session creation rejected");
        Err(RoomError::Broker(BrokerError::Status(status.as_u16())))
    }

    /// Look up an existing room.
    ///
    /// # Errors
    ///
    /// `RoomError::Broker` for transport failures, non-2xx statuses, or an
    /// unparsable body.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn fetch_session(&self, session_id: &SessionId) -> Result<SessionInfo, RoomError> {
        let request = self.request(Method::GET, &["sessions", session_id.as_str()]);

        let response = self
            .execute("fetch_session", request)
            .await
            .map_err(RoomError::Broker)?;
        let status = response.status();
        metrics::record_broker_request("fetch_session", status_label(status));

        if !status.is_success() {
            return Err(RoomError::Broker(BrokerError::Status(status.as_u16())));
        }

        response.json::<SessionInfo>().await.map_err(|e| {
            RoomError::Broker(BrokerError::InvalidResponse(format!(
                "session body did not parse: {e}"
            )))
        })
    }

    /// Issue a connection token for the room.
    ///
    /// # Errors
    ///
    /// `RoomError::Token` for transport failures, non-2xx statuses, or a
    /// body without a usable token.
    #[instrument(skip_all, fields(session_id = %session_id, role = ?role))]
    pub async fn create_token(
        &self,
        session_id: &SessionId,
        role: Role,
    ) -> Result<SecretString, RoomError> {
        let request = self
            .request(Method::POST, &["sessions", session_id.as_str(), "connection"])
            .json(&CreateConnectionRequest { role });

        let response = self
            .execute("create_token", request)
            .await
            .map_err(RoomError::Token)?;
        let status = response.status();
        metrics::record_broker_request("create_token", status_label(status));

        if !status.is_success() {
            warn!(target: "room.broker", status = %status, "Token request rejected");
            return Err(RoomError::Token(BrokerError::Status(status.as_u16())));
        }

        let parsed: ConnectionResponse = response.json().await.map_err(|e| {
            warn!(target: "room.broker", error = %e, "Failed to parse token response");
            RoomError::Token(BrokerError::InvalidResponse(
                "token body did not parse".to_string(),
            ))
        })?;

        if parsed.token.expose_secret().is_empty() {
            return Err(RoomError::Token(BrokerError::InvalidResponse(
                "empty token".to_string(),
            )));
        }

        Ok(parsed.token)
    }
}

#[async_trait]
impl AdmissionBroker for BrokerClient {
    #[instrument(skip_all, fields(session_id = %session_id))]
    async fn request_admission(&self, session_id: &SessionId) -> Result<SecretString, RoomError> {
        let info = self.create_session(session_id).await?;
        let token = self.create_token(&info.id, Role::Publisher).await?;

        info!(
            target: "room.broker",
            created_at = ?info.created_at,
            "Admission token issued"
        );
        Ok(token)
    }

    #[instrument(skip_all)]
    async fn test_connection(&self) -> Result<(), RoomError> {
        let response = self
            .execute("test_connection", self.request(Method::GET, &["config"]))
            .await
            .map_err(RoomError::Broker)?;
        let status = response.status();
        metrics::record_broker_request("test_connection", status_label(status));

        if !status.is_success() {
            warn!(target: "room.broker", status = %status, "Broker probe rejected");
            return Err(RoomError::Broker(BrokerError::Status(status.as_u16())));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map(|_| ())
            .map_err(|e| {
                RoomError::Broker(BrokerError::InvalidResponse(format!(
                    "config body did not parse: {e}"
                )))
            })
    }
}

/// Bounded metric label for a response status.
fn status_label(status: StatusCode) -> &'static str {
    if status.is_success() {
        "success"
    } else if status == StatusCode::CONFLICT {
        "conflict"
    } else if status.is_client_error() {
        "client_error"
    } else if status.is_server_error() {
        "server_error"
    } else {
        "unexpected"
    }
}
