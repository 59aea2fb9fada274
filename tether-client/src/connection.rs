//! Companion connection management
//!
//! Owns the lifecycle of the link to the editor companion: connect with
//! bounded timeouts, handshake, link-loss detection, retry cooldown,
//! and the pending-request table keyed by correlation id. The transport
//! and the pending table are owned exclusively here; no other component
//! writes to the socket.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tether_protocol::{
    methods, ClientCodec, InitializeParams, InitializeResult, Request, PROTOCOL_VERSION,
};
use tether_utils::{Result, TetherError};

use crate::config::IntegrationConfig;
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink};
use crate::discovery::ConnectionTarget;

/// Connection state (one per session)
///
/// Mutated only by [`Connection`]; everything else reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No companion was discovered; terminal state, all calls no-op
    Disabled,
    Disconnected,
    Connecting,
    Connected,
    /// Last attempt failed; retry allowed after a cooldown
    Failed,
}

/// In-flight requests awaiting a response, keyed by correlation id
type PendingMap = HashMap<Uuid, oneshot::Sender<Result<serde_json::Value>>>;

/// Live transport handle
struct Link {
    tx: mpsc::Sender<Request>,
    task: JoinHandle<()>,
}

/// Manages the connection to the editor companion
pub(crate) struct Connection {
    target: Option<ConnectionTarget>,
    workspace_path: Option<PathBuf>,
    config: IntegrationConfig,
    session_id: Uuid,
    sink: Arc<dyn DiagnosticsSink>,
    /// Current state; the watch channel is the single mutation point
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    /// Serializes connection attempts: callers arriving while an attempt
    /// is in flight wait here and observe its outcome
    connect_gate: Mutex<()>,
    pending: Arc<Mutex<PendingMap>>,
    link: Mutex<Option<Link>>,
    failed_at: std::sync::Mutex<Option<Instant>>,
}

impl Connection {
    pub fn new(
        target: Option<ConnectionTarget>,
        workspace_path: Option<PathBuf>,
        config: IntegrationConfig,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        let initial = if target.is_some() {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Disabled
        };
        let (state_tx, state_rx) = watch::channel(initial);

        Self {
            target,
            workspace_path,
            config,
            session_id: Uuid::new_v4(),
            sink,
            state_tx,
            state_rx,
            connect_gate: Mutex::new(()),
            pending: Arc::new(Mutex::new(HashMap::new())),
            link: Mutex::new(None),
            failed_at: std::sync::Mutex::new(None),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Session identifier carried on every request
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Reach `Connected` if possible; report usability, never an error
    ///
    /// Exactly one handshake runs at a time: concurrent callers queue on
    /// the connect gate and observe the first attempt's outcome.
    pub async fn ensure_connected(&self) -> bool {
        match self.state() {
            ConnectionState::Disabled => return false,
            ConnectionState::Connected => return true,
            _ => {}
        }

        let _gate = self.connect_gate.lock().await;

        // Re-check: the attempt we queued behind may have settled things
        match self.state() {
            ConnectionState::Disabled => return false,
            ConnectionState::Connected => return true,
            ConnectionState::Failed => {
                let in_cooldown = self
                    .failed_at
                    .lock()
                    .unwrap()
                    .is_some_and(|at| at.elapsed() < self.config.retry_cooldown);
                if in_cooldown {
                    debug!("Companion connection failed recently, still in cooldown");
                    return false;
                }
                self.set_state(ConnectionState::Disconnected);
            }
            ConnectionState::Disconnected | ConnectionState::Connecting => {}
        }

        // Drop the dead link from a lost connection, if any
        if let Some(old) = self.link.lock().await.take() {
            old.task.abort();
        }

        match self.try_connect().await {
            Ok(()) => true,
            Err(e) => {
                self.note_failure(&e);
                false
            }
        }
    }

    /// One connection attempt: TCP connect, spawn the socket task,
    /// handshake. Every error path leaves no live socket task behind.
    async fn try_connect(&self) -> Result<()> {
        let target = self
            .target
            .as_ref()
            .ok_or(TetherError::NotConnected)?
            .clone();

        self.set_state(ConnectionState::Connecting);
        debug!("Connecting to editor companion at {}", target.addr());

        let stream = match tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(target.addr()),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(TetherError::refused(e.to_string())),
            Err(_) => {
                return Err(TetherError::ConnectTimeout {
                    millis: self.config.connect_timeout.as_millis() as u64,
                })
            }
        };

        let framed = Framed::new(stream, ClientCodec::new());
        let (tx, outgoing_rx) = mpsc::channel::<Request>(32);
        let task = tokio::spawn(connection_task(
            framed,
            outgoing_rx,
            self.pending.clone(),
            self.state_tx.clone(),
        ));

        match self.handshake(&tx).await {
            Ok(()) => {
                *self.link.lock().await = Some(Link { tx, task });
                self.set_state(ConnectionState::Connected);
                info!("Connected to editor companion at {}", target.addr());
                Ok(())
            }
            Err(e) => {
                task.abort();
                Err(e)
            }
        }
    }

    /// `initialize` exchange; a version mismatch fails the connection
    async fn handshake(&self, tx: &mpsc::Sender<Request>) -> Result<()> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION,
            session_id: self.session_id,
            workspace_path: self
                .workspace_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        };
        let params = serde_json::to_value(params)
            .map_err(|e| TetherError::internal(e.to_string()))?;

        let result = request_over(
            tx,
            &self.pending,
            methods::INITIALIZE,
            params,
            // The handshake is part of connection establishment
            self.config.connect_timeout,
        )
        .await
        .map_err(|e| match e {
            TetherError::ResponseTimeout { millis } => TetherError::ConnectTimeout { millis },
            other => other,
        })?;

        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| TetherError::invalid_message(format!("malformed handshake: {}", e)))?;

        if init.protocol_version != PROTOCOL_VERSION {
            return Err(TetherError::ProtocolMismatch {
                client: PROTOCOL_VERSION,
                companion: init.protocol_version,
            });
        }

        Ok(())
    }

    /// Issue a request over the established connection
    pub async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        if self.state() != ConnectionState::Connected {
            return Err(TetherError::NotConnected);
        }

        let tx = {
            let link = self.link.lock().await;
            link.as_ref()
                .map(|l| l.tx.clone())
                .ok_or(TetherError::NotConnected)?
        };

        request_over(&tx, &self.pending, method, params, self.config.response_timeout).await
    }

    /// Tear down the link, failing anything still in flight
    pub async fn disconnect(&self) {
        if let Some(link) = self.link.lock().await.take() {
            link.task.abort();
        }
        fail_all_pending(&self.pending).await;
        if self.state() != ConnectionState::Disabled {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let _ = self.state_tx.send(state);
    }

    fn note_failure(&self, err: &TetherError) {
        *self.failed_at.lock().unwrap() = Some(Instant::now());
        self.set_state(ConnectionState::Failed);
        if let Some(event) = DiagnosticEvent::classify(err) {
            self.sink.record(event, &err.to_string());
        }
        warn!("Editor companion connection failed: {}", err);
    }
}

/// Socket task: owns the framed stream for the life of one connection
async fn connection_task(
    framed: Framed<TcpStream, ClientCodec>,
    mut outgoing: mpsc::Receiver<Request>,
    pending: Arc<Mutex<PendingMap>>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let (mut sink, mut stream) = framed.split();

    loop {
        tokio::select! {
            maybe_req = outgoing.recv() => {
                match maybe_req {
                    Some(req) => {
                        if let Err(e) = sink.send(req).await {
                            error!("Failed to send to companion: {}", e);
                            break;
                        }
                    }
                    // Connection handle dropped
                    None => break,
                }
            }
            result = stream.next() => {
                match result {
                    Some(Ok(resp)) => resolve_pending(&pending, resp).await,
                    Some(Err(e)) => {
                        error!("Failed to receive from companion: {}", e);
                        break;
                    }
                    None => {
                        info!("Companion closed connection");
                        break;
                    }
                }
            }
        }
    }

    // Link loss: fail anything still in flight, publish the transition.
    // Only a Connected link publishes Disconnected; a handshake that is
    // being failed concurrently owns the Failed transition.
    fail_all_pending(&pending).await;
    if *state_tx.borrow() == ConnectionState::Connected {
        let _ = state_tx.send(ConnectionState::Disconnected);
    }
}

/// Route one response to its pending request, matching by correlation id
async fn resolve_pending(pending: &Mutex<PendingMap>, resp: tether_protocol::Response) {
    let Some(tx) = pending.lock().await.remove(&resp.id) else {
        // The request already timed out; a stale response has no effect
        debug!(id = %resp.id, "Discarding stale response");
        return;
    };

    let outcome = match (resp.result, resp.error) {
        (_, Some(err)) => {
            debug!(id = %resp.id, code = ?err.code, "Companion rejected request");
            Err(TetherError::rejected(err.message))
        }
        (Some(result), None) => Ok(result),
        (None, None) => Err(TetherError::invalid_message(
            "response carries neither result nor error",
        )),
    };

    // The caller may have given up between eviction checks; that is fine
    let _ = tx.send(outcome);
}

/// Fail every in-flight request with `ConnectionClosed`
async fn fail_all_pending(pending: &Mutex<PendingMap>) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(TetherError::ConnectionClosed));
    }
}

/// Dispatch one request and await its response within `timeout`
///
/// Requests go out in issue order over the single writer channel;
/// responses are matched by id. On timeout the pending entry is evicted
/// so a late response is recognized as stale and discarded.
async fn request_over(
    tx: &mpsc::Sender<Request>,
    pending: &Arc<Mutex<PendingMap>>,
    method: &str,
    params: serde_json::Value,
    timeout: std::time::Duration,
) -> Result<serde_json::Value> {
    let req = Request::new(method, params);
    let id = req.id;

    let (resp_tx, resp_rx) = oneshot::channel();
    pending.lock().await.insert(id, resp_tx);

    if tx.send(req).await.is_err() {
        pending.lock().await.remove(&id);
        return Err(TetherError::ConnectionClosed);
    }

    match tokio::time::timeout(timeout, resp_rx).await {
        Ok(Ok(outcome)) => outcome,
        // Socket task dropped the sender while failing the link
        Ok(Err(_)) => Err(TetherError::ConnectionClosed),
        Err(_) => {
            pending.lock().await.remove(&id);
            debug!(%id, method, "Request timed out");
            Err(TetherError::ResponseTimeout {
                millis: timeout.as_millis() as u64,
            })
        }
    }
}
