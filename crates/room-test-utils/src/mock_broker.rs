//! Mock token broker.
//!
//! Implements [`AdmissionBroker`] with scripted results so orchestrator
//! tests run without HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! use room_test_utils::MockBroker;
//!
//! let broker = MockBroker::builder()
//!     .respond_with(Err(RoomError::Token(BrokerError::Status(500))))
//!     .build();
//! ```

use async_trait::async_trait;
use common::secret::SecretString;
use common::types::SessionId;
use room_client::broker::AdmissionBroker;
use room_client::errors::{BrokerError, RoomError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Token handed out by an accepting mock.
pub const MOCK_TOKEN: &str = "wss://media.test?sessionId=mock&token=tok_mock";

/// Mock broker for orchestrator tests.
pub struct MockBroker {
    /// Results to return (cycles through them).
    responses: Vec<Result<String, RoomError>>,
    /// Whether `test_connection` succeeds.
    reachable: bool,
    /// When set, each admission waits for one `notify_one`.
    gate: Option<Arc<Notify>>,
    call_count: AtomicUsize,
    requested: Mutex<Vec<SessionId>>,
}

impl MockBroker {
    #[must_use]
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder::default()
    }

    /// A mock that always issues [`MOCK_TOKEN`].
    #[must_use]
    pub fn accepting() -> Self {
        Self::builder().build()
    }

    /// A mock whose every admission fails with `error`.
    #[must_use]
    pub fn failing(error: RoomError) -> Self {
        Self::builder().respond_with(Err(error)).build()
    }

    /// Number of admission requests made.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Room ids requested, in order.
    pub fn requested_sessions(&self) -> Vec<SessionId> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdmissionBroker for MockBroker {
    async fn request_admission(&self, session_id: &SessionId) -> Result<SecretString, RoomError> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(session_id.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.responses.is_empty() {
            return Ok(SecretString::from(MOCK_TOKEN));
        }

        let idx = count % self.responses.len();
        self.responses[idx].clone().map(SecretString::from)
    }

    async fn test_connection(&self) -> Result<(), RoomError> {
        if self.reachable {
            Ok(())
        } else {
            Err(RoomError::Broker(BrokerError::Unreachable(
                "mock broker offline".to_string(),
            )))
        }
    }
}

/// Builder for [`MockBroker`].
pub struct MockBrokerBuilder {
    responses: Vec<Result<String, RoomError>>,
    reachable: bool,
    gate: Option<Arc<Notify>>,
}

impl Default for MockBrokerBuilder {
    fn default() -> Self {
        Self {
            responses: Vec::new(),
            reachable: true,
            gate: None,
        }
    }
}

impl MockBrokerBuilder {
    /// Append a scripted admission result.
    #[must_use]
    pub fn respond_with(mut self, result: Result<String, RoomError>) -> Self {
        self.responses.push(result);
        self
    }

    /// Make `test_connection` fail.
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Hold every admission until `gate.notify_one()`.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    #[must_use]
    pub fn build(self) -> MockBroker {
        MockBroker {
            responses: self.responses,
            reachable: self.reachable,
            gate: self.gate,
            call_count: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }
}
