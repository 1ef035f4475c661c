//! Session Lifecycle Controller
//!
//! Drives one agent session through `Starting → Negotiating → Active →
//! Closing → Closed`. Plugin initialization and capability negotiation run
//! concurrently during `Negotiating`; the session becomes `Active` once both
//! have finished, then waits with no timeout for the transport to close it.
//! An unresolvable participant sends the session to `Failed` instead.

use crate::{
    error::SessionError,
    negotiator,
    plugin::{AgentHandle, PluginInitializer},
    transport::{SessionHandle, TrackKind, TrackRef},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// The lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Starting,
    Negotiating,
    Active,
    Closing,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Starting, Negotiating)
            | (Negotiating, Active)
            | (Negotiating, Closing)
            | (Active, Closing)
            | (Closing, Closed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Starting => "starting",
            SessionState::Negotiating => "negotiating",
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What ended an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseReason {
    /// The transport reported the session closed.
    Transport,
    /// The process is shutting down.
    Shutdown,
}

/// Receives every state a session enters, in order.
pub type StateObserver = mpsc::UnboundedSender<SessionState>;

/// Summary of a session that closed normally.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub id: Uuid,
    pub participant: Option<String>,
    pub audio_track: Option<TrackRef>,
    pub agent_attached: bool,
    pub close_reason: CloseReason,
    pub history: Vec<SessionState>,
}

impl SessionReport {
    pub fn final_state(&self) -> SessionState {
        self.history
            .last()
            .copied()
            .unwrap_or(SessionState::Starting)
    }
}

/// One session's mutable state, owned by the controller for its duration.
struct Session {
    id: Uuid,
    participant: Option<String>,
    tracks: HashMap<TrackKind, TrackRef>,
    state: SessionState,
    agent: Option<AgentHandle>,
    agent_attached: bool,
    released: bool,
    history: Vec<SessionState>,
    observer: Option<StateObserver>,
}

impl Session {
    fn new(id: Uuid, observer: Option<StateObserver>) -> Self {
        let session = Self {
            id,
            participant: None,
            tracks: HashMap::new(),
            state: SessionState::Starting,
            agent: None,
            agent_attached: false,
            released: false,
            history: vec![SessionState::Starting],
            observer,
        };
        session.notify(SessionState::Starting);
        session
    }

    fn advance(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "Ignoring invalid session transition");
            return;
        }
        info!(from = %self.state, to = %next, "Session state changed");
        self.state = next;
        self.history.push(next);
        self.notify(next);
    }

    fn notify(&self, state: SessionState) {
        if let Some(observer) = &self.observer {
            // The observer going away does not affect the session.
            let _ = observer.send(state);
        }
    }

    fn attach_agent(&mut self, agent: Option<AgentHandle>) {
        self.agent_attached = agent.is_some();
        self.agent = agent;
    }

    /// Releases the agent. Runs its body once no matter how often it is called.
    async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(agent) = self.agent.take() {
            agent.close().await;
        }
    }

    fn report(&self, close_reason: CloseReason) -> SessionReport {
        SessionReport {
            id: self.id,
            participant: self.participant.clone(),
            audio_track: self.tracks.get(&TrackKind::Audio).cloned(),
            agent_attached: self.agent_attached,
            close_reason,
            history: self.history.clone(),
        }
    }
}

enum Setup {
    Ready(Option<TrackRef>),
    Closed(CloseReason),
    Failed(SessionError),
}

/// Runs agent sessions from hand-off to teardown.
pub struct SessionController {
    plugins: Arc<PluginInitializer>,
}

impl SessionController {
    pub fn new(plugins: Arc<PluginInitializer>) -> Self {
        Self { plugins }
    }

    /// Runs a session to completion, waiting only on the transport's close signal.
    pub async fn start_session(
        &self,
        handle: Arc<dyn SessionHandle>,
    ) -> Result<SessionReport, SessionError> {
        self.run(handle, CancellationToken::new(), None).await
    }

    /// Runs a session to completion.
    ///
    /// Cancelling `shutdown` closes the session through the same path as a
    /// transport close. A fatal error is returned after the session has
    /// entered `Failed`.
    pub async fn run(
        &self,
        handle: Arc<dyn SessionHandle>,
        shutdown: CancellationToken,
        observer: Option<StateObserver>,
    ) -> Result<SessionReport, SessionError> {
        self.run_with_id(Uuid::new_v4(), handle, shutdown, observer)
            .await
    }

    /// Like [`SessionController::run`], with an id chosen by the caller.
    pub async fn run_with_id(
        &self,
        session_id: Uuid,
        handle: Arc<dyn SessionHandle>,
        shutdown: CancellationToken,
        observer: Option<StateObserver>,
    ) -> Result<SessionReport, SessionError> {
        let session = Session::new(session_id, observer);
        let span = info_span!("session", session_id = %session.id);
        self.drive(session, handle.as_ref(), &shutdown)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        mut session: Session,
        handle: &dyn SessionHandle,
        shutdown: &CancellationToken,
    ) -> Result<SessionReport, SessionError> {
        info!("Agent session started");
        session.advance(SessionState::Negotiating);

        let close = wait_for_close(handle, shutdown);
        tokio::pin!(close);
        let plugin = self.plugins.initialize_configured();
        tokio::pin!(plugin);
        let negotiation = negotiator::negotiate_session(session.id, handle);
        tokio::pin!(negotiation);

        let mut plugin_done = false;
        let mut negotiation_done = false;
        let mut negotiated: Option<Option<TrackRef>> = None;

        // Finished setup results are taken before a pending close so that an
        // agent created in the same poll is still released.
        let setup = loop {
            if plugin_done && negotiated.is_some() {
                break Setup::Ready(negotiated.take().flatten());
            }
            tokio::select! {
                biased;
                agent = &mut plugin, if !plugin_done => {
                    plugin_done = true;
                    session.attach_agent(agent);
                }
                result = &mut negotiation, if !negotiation_done => {
                    negotiation_done = true;
                    match result {
                        Ok(outcome) => {
                            session.participant = Some(outcome.participant.identity().to_string());
                            negotiated = Some(outcome.audio_track);
                        }
                        Err(e) if e.is_fatal() => break Setup::Failed(e),
                        Err(e) => {
                            warn!(error = %e, "Continuing without audio");
                            negotiated = Some(None);
                        }
                    }
                }
                reason = &mut close => break Setup::Closed(reason),
            }
        };

        match setup {
            Setup::Ready(track) => {
                if let Some(track) = track {
                    session.tracks.insert(track.kind, track);
                }
                session.advance(SessionState::Active);
                info!(
                    agent_attached = session.agent_attached,
                    audio = session.tracks.contains_key(&TrackKind::Audio),
                    "Keeping session alive until close"
                );
                let reason = (&mut close).await;
                Ok(self.finish(session, reason).await)
            }
            Setup::Closed(reason) => {
                info!(?reason, "Session closed before negotiation completed");
                Ok(self.finish(session, reason).await)
            }
            Setup::Failed(err) => {
                error!(error = %err, "Session failed");
                session.release().await;
                session.advance(SessionState::Failed);
                Err(err)
            }
        }
    }

    async fn finish(&self, mut session: Session, reason: CloseReason) -> SessionReport {
        session.advance(SessionState::Closing);
        session.release().await;
        session.advance(SessionState::Closed);
        info!(?reason, "Session closed");
        session.report(reason)
    }
}

async fn wait_for_close(handle: &dyn SessionHandle, shutdown: &CancellationToken) -> CloseReason {
    tokio::select! {
        _ = handle.closed() => CloseReason::Transport,
        _ = shutdown.cancelled() => CloseReason::Shutdown,
    }
}
