//! Bridges a transport adapter's WebSocket connection to an agent session.
//!
//! The adapter opens one connection per participant session. The orchestrator
//! sees it through [`WsSessionHandle`], which implements the core
//! `SessionHandle` trait on top of the socket.

use super::protocol::{ControlMessage, ParticipantInfo, TransportMessage};
use crate::state::AppState;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use roomagent_core::{ParticipantRef, SessionHandle, TrackRef};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

type PendingSubscriptions = Arc<Mutex<HashMap<String, oneshot::Sender<Result<(), String>>>>>;

/// A participant whose tracks were announced in `session_start`.
pub struct WsParticipant {
    identity: String,
    tracks: Vec<TrackRef>,
    outbound: mpsc::UnboundedSender<ControlMessage>,
    pending: PendingSubscriptions,
}

#[async_trait]
impl ParticipantRef for WsParticipant {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn published_tracks(&self) -> Vec<TrackRef> {
        self.tracks.clone()
    }

    async fn subscribe(&self, track: &TrackRef) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(track.sid.clone(), tx);
        self.outbound
            .send(ControlMessage::Subscribe {
                track_sid: track.sid.clone(),
            })
            .map_err(|_| anyhow!("transport connection is gone"))?;

        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(anyhow!(reason)),
            Err(_) => Err(anyhow!("transport closed before answering the subscription")),
        }
    }
}

/// The orchestrator's view of one bridged session.
pub struct WsSessionHandle {
    participant: Option<Arc<WsParticipant>>,
    pending: PendingSubscriptions,
    announced: CancellationToken,
    closed: CancellationToken,
}

impl WsSessionHandle {
    pub fn new(
        participant: Option<ParticipantInfo>,
        outbound: mpsc::UnboundedSender<ControlMessage>,
    ) -> Self {
        let pending: PendingSubscriptions = Arc::default();
        let participant = participant.map(|info| {
            Arc::new(WsParticipant {
                tracks: info.track_refs(),
                identity: info.identity,
                outbound,
                pending: pending.clone(),
            })
        });
        Self {
            participant,
            pending,
            announced: CancellationToken::new(),
            closed: CancellationToken::new(),
        }
    }

    /// Lets the session resolve its participant. Held back until `started`
    /// is queued so no `subscribe` overtakes it.
    pub fn announce(&self) {
        self.announced.cancel();
    }

    /// Completes a pending subscription with the transport's answer.
    pub async fn resolve(&self, track_sid: &str, result: Result<(), String>) {
        match self.pending.lock().await.remove(track_sid) {
            Some(tx) => {
                let _ = tx.send(result);
            }
            None => warn!(track_sid, "Answer for a subscription that is not pending"),
        }
    }

    /// Signals closure and abandons every pending subscription.
    pub async fn close(&self) {
        self.closed.cancel();
        self.pending.lock().await.clear();
    }
}

#[async_trait]
impl SessionHandle for WsSessionHandle {
    async fn participant(&self) -> Option<Arc<dyn ParticipantRef>> {
        self.announced.cancelled().await;
        self.participant
            .clone()
            .map(|p| p as Arc<dyn ParticipantRef>)
    }

    async fn closed(&self) {
        self.closed.cancelled().await;
    }
}

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual transport connection.
#[instrument(name = "ws_bridge", skip_all, fields(room))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut socket_tx, mut socket_rx) = socket.split();

    let (room, participant) = match read_session_start(&mut socket_rx).await {
        Ok(Some(start)) => start,
        Ok(None) => {
            info!("Transport disconnected before sending session_start.");
            return;
        }
        Err(e) => {
            warn!(error = %e, "Rejecting transport connection");
            let _ = send_msg(
                &mut socket_tx,
                ControlMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };
    tracing::Span::current().record("room", room.as_str());
    info!(
        participant = participant.as_ref().map(|p| p.identity.as_str()),
        "Transport handed over a session"
    );

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(socket_tx, out_rx));
    let handle = Arc::new(WsSessionHandle::new(participant, out_tx.clone()));
    let (state_tx, state_rx) = mpsc::unbounded_channel();

    match state.supervisor.spawn(handle.clone(), Some(state_tx)) {
        Some(spawned) => {
            let _ = out_tx.send(ControlMessage::Started {
                session_id: spawned.id,
            });
            handle.announce();
            pump(&handle, socket_rx, state_rx, spawned.task, &out_tx).await;
        }
        None => {
            let _ = out_tx.send(ControlMessage::Error {
                message: "Service is shutting down".to_string(),
            });
        }
    }

    drop(out_tx);
    drop(handle);
    if let Err(e) = writer.await {
        error!("Transport writer task failed: {:?}", e);
    }
    info!("Transport connection closed.");
}

/// Reads the mandatory `session_start` message.
async fn read_session_start(
    socket_rx: &mut SplitStream<WebSocket>,
) -> Result<Option<(String, Option<ParticipantInfo>)>> {
    let Some(msg) = socket_rx.next().await else {
        return Ok(None);
    };
    match msg? {
        Message::Text(text) => match serde_json::from_str::<TransportMessage>(&text)? {
            TransportMessage::SessionStart { room, participant } => Ok(Some((room, participant))),
            _ => Err(anyhow!("First message must be `session_start`")),
        },
        Message::Close(_) => Ok(None),
        _ => Err(anyhow!("First message was not a text `session_start` message.")),
    }
}

/// Routes transport messages to the session and session states back to the
/// transport until the session task ends.
async fn pump(
    handle: &WsSessionHandle,
    mut socket_rx: SplitStream<WebSocket>,
    mut state_rx: mpsc::UnboundedReceiver<roomagent_core::SessionState>,
    mut task: tokio::task::JoinHandle<roomagent_core::supervisor::SessionResult>,
    out_tx: &mpsc::UnboundedSender<ControlMessage>,
) {
    let mut transport_open = true;

    loop {
        tokio::select! {
            msg = socket_rx.next(), if transport_open => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<TransportMessage>(&text) {
                    Ok(TransportMessage::SubscriptionConfirmed { track_sid }) => {
                        handle.resolve(&track_sid, Ok(())).await;
                    }
                    Ok(TransportMessage::SubscriptionFailed { track_sid, reason }) => {
                        handle.resolve(&track_sid, Err(reason)).await;
                    }
                    Ok(TransportMessage::Close) => {
                        info!("Transport reported the session closed.");
                        handle.close().await;
                    }
                    Ok(TransportMessage::SessionStart { .. }) => {
                        warn!("Ignoring repeated session_start.");
                    }
                    Err(e) => warn!(error = %e, "Ignoring malformed transport message."),
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!("Transport connection ended. Closing session.");
                    transport_open = false;
                    handle.close().await;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Error receiving from transport WebSocket: {:?}", e);
                    transport_open = false;
                    handle.close().await;
                }
            },
            Some(state) = state_rx.recv() => {
                let _ = out_tx.send(ControlMessage::State { state });
            },
            result = &mut task => {
                while let Ok(state) = state_rx.try_recv() {
                    let _ = out_tx.send(ControlMessage::State { state });
                }
                match result {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        let _ = out_tx.send(ControlMessage::Error { message: e.to_string() });
                    }
                    Err(e) => error!("Session task failed: {:?}", e),
                }
                break;
            },
        }
    }
}

/// Drains outbound control messages onto the socket.
async fn write_loop(
    mut socket_tx: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::UnboundedReceiver<ControlMessage>,
) {
    while let Some(msg) = out_rx.recv().await {
        if let Err(e) = send_msg(&mut socket_tx, msg).await {
            warn!(error = %e, "Failed to send control message; dropping the rest.");
            return;
        }
    }
    let _ = socket_tx.close().await;
}

/// A helper function to serialize and send a `ControlMessage` to the transport.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ControlMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
