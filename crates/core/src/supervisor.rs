//! Runs sessions concurrently and closes them all on process shutdown.

use crate::{
    error::SessionError,
    lifecycle::{SessionController, SessionReport, StateObserver},
    transport::SessionHandle,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};
use uuid::Uuid;

pub type SessionResult = Result<SessionReport, SessionError>;

/// A session started by [`SessionSupervisor::spawn`].
pub struct SpawnedSession {
    pub id: Uuid,
    pub task: JoinHandle<SessionResult>,
}

/// Owns every running session task.
pub struct SessionSupervisor {
    controller: Arc<SessionController>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl SessionSupervisor {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self {
            controller,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Starts a session on its own task.
    ///
    /// Returns `None` once shutdown has begun.
    pub fn spawn(
        &self,
        handle: Arc<dyn SessionHandle>,
        observer: Option<StateObserver>,
    ) -> Option<SpawnedSession> {
        if self.shutdown.is_cancelled() {
            warn!("Refusing new session during shutdown");
            return None;
        }

        let id = Uuid::new_v4();
        let controller = self.controller.clone();
        let shutdown = self.shutdown.clone();
        let task = self.tracker.spawn(async move {
            let result = controller
                .run_with_id(id, handle, shutdown, observer)
                .await;
            match &result {
                Ok(report) => info!(
                    session_id = %report.id,
                    reason = ?report.close_reason,
                    "Agent session finished"
                ),
                Err(e) => error!(session_id = %id, error = %e, "Agent session terminated with error"),
            }
            result
        });
        Some(SpawnedSession { id, task })
    }

    pub fn active_sessions(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Closes every running session through its normal close path and waits
    /// for all of them to finish.
    pub async fn shutdown(&self) {
        info!(
            active = self.tracker.len(),
            "Closing active sessions for shutdown"
        );
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("All sessions closed");
    }
}
