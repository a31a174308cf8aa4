//! Orchestrator test harness.
//!
//! Spawns a `RoomActor` wired to a [`MockBroker`] and a [`MockRtcFactory`]
//! and offers helpers to wait for published state.

use crate::fixtures::test_config;
use crate::mock_broker::MockBroker;
use crate::mock_rtc::{MockRtcFactory, MockRtcSession};
use room_client::actors::{RoomActor, RoomHandle, RoomPhase, RoomSnapshot};
use room_client::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on any single wait.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// A running room actor with its mocks.
pub struct TestRoom {
    pub handle: RoomHandle,
    pub broker: Arc<MockBroker>,
    pub rtc: Arc<MockRtcFactory>,
    pub task: JoinHandle<()>,
}

impl TestRoom {
    /// Room with an accepting broker and a transport where everything works.
    pub fn spawn() -> Self {
        Self::spawn_with(
            test_config("http://broker.test"),
            MockBroker::accepting(),
            MockRtcFactory::new(),
        )
    }

    pub fn spawn_with(config: Config, broker: MockBroker, rtc: MockRtcFactory) -> Self {
        let broker = Arc::new(broker);
        let rtc = Arc::new(rtc);
        let (handle, task) = RoomActor::spawn(
            config,
            Arc::clone(&broker) as _,
            Arc::clone(&rtc) as _,
            CancellationToken::new(),
        );
        Self {
            handle,
            broker,
            rtc,
            task,
        }
    }

    /// Transport session of the current (latest) join.
    pub fn session(&self) -> Arc<MockRtcSession> {
        self.rtc
            .latest_session()
            .expect("a join should have created a transport session")
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for(&self, predicate: impl Fn(&RoomSnapshot) -> bool) -> RoomSnapshot {
        let mut rx = self.handle.subscribe();
        let waited = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(|s| predicate(s)))
            .await
            .expect("timed out waiting for room state");
        let snapshot = waited.expect("room actor stopped").clone();
        snapshot
    }

    pub async fn wait_for_phase(&self, phase: RoomPhase) -> RoomSnapshot {
        self.wait_for(|s| s.phase == phase).await
    }

    /// Stop the actor and wait for its task.
    pub async fn shutdown(self) {
        self.handle.shutdown();
        let _ = tokio::time::timeout(WAIT_TIMEOUT, self.task).await;
    }
}
