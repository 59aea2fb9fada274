//! IdeClient: the public face of the editor integration
//!
//! Host logic talks to this type only. Protocol operations return typed
//! results; the `open_diff` wrapper is the isolation boundary that turns
//! any failure into a silent no-op, recording a classified event to the
//! diagnostics sink on the way. Nothing on this path ever reaches the
//! user as an error.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use tether_protocol::{methods, DiffAck, DiffParams};
use tether_utils::{Result, TetherError};

use crate::config::IntegrationConfig;
use crate::connection::{Connection, ConnectionState};
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink, TracingSink};
use crate::discovery;
use crate::probe::DiscoveryContext;

/// A proposed file edit to show in the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    /// Target file path, relative to or inside the editor workspace
    pub file_path: PathBuf,
    /// Full proposed new content
    pub proposed_content: String,
    /// Originating assistant session
    pub session_id: Uuid,
}

impl DiffRequest {
    pub fn new(
        file_path: impl Into<PathBuf>,
        proposed_content: impl Into<String>,
        session_id: Uuid,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            proposed_content: proposed_content.into(),
            session_id,
        }
    }
}

/// Client for the editor companion
///
/// Constructed once per session from the probed [`DiscoveryContext`].
/// When no companion is discoverable the client is permanently disabled
/// and every operation is an immediate no-op.
pub struct IdeClient {
    connection: Connection,
    sink: Arc<dyn DiagnosticsSink>,
}

impl IdeClient {
    /// Build a client from the probed context with default config and
    /// tracing diagnostics
    pub fn new(ctx: &DiscoveryContext) -> Self {
        // Outside the host editor the subsystem does no I/O at all, so
        // the config file is not consulted either
        let config = if ctx.is_host_editor {
            IntegrationConfig::load()
        } else {
            IntegrationConfig::default()
        };
        Self::with_config(ctx, config, Arc::new(TracingSink))
    }

    /// Build a client with explicit config and diagnostics sink
    pub fn with_config(
        ctx: &DiscoveryContext,
        config: IntegrationConfig,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        let target = discovery::resolve(ctx);
        if target.is_none() {
            sink.record(
                DiagnosticEvent::DiscoveryAbsent,
                "no editor companion discovered",
            );
        }

        let connection = Connection::new(
            target,
            ctx.workspace_path.clone(),
            config,
            sink.clone(),
        );

        Self { connection, sink }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Whether the integration is enabled for this session
    pub fn is_enabled(&self) -> bool {
        self.state() != ConnectionState::Disabled
    }

    /// Session identifier to stamp onto requests
    pub fn session_id(&self) -> Uuid {
        self.connection.session_id()
    }

    /// Reach a usable connection if possible; never errors
    pub async fn ensure_connected(&self) -> bool {
        self.connection.ensure_connected().await
    }

    /// Ask the companion to open a diff view; typed outcome
    ///
    /// Returns `NotConnected` without any I/O when no usable connection
    /// exists. This is the protocol-level operation; host logic normally
    /// goes through [`open_diff`](Self::open_diff) instead.
    pub async fn send_diff_request(&self, req: DiffRequest) -> Result<DiffAck> {
        if !self.ensure_connected().await {
            return Err(TetherError::NotConnected);
        }

        let params = DiffParams {
            file_path: req.file_path.to_string_lossy().into_owned(),
            proposed_content: req.proposed_content,
            session_id: req.session_id,
        };
        let params = serde_json::to_value(params)
            .map_err(|e| TetherError::internal(e.to_string()))?;

        let result = self.connection.request(methods::OPEN_DIFF, params).await?;

        serde_json::from_value(result).map_err(|e| {
            TetherError::invalid_message(format!("malformed openDiff acknowledgement: {}", e))
        })
    }

    /// Ask the companion to open a diff view; silent best-effort
    ///
    /// The isolation boundary: every failure is classified, recorded to
    /// the diagnostics sink, and converted to `None`. The caller
    /// proceeds exactly as if no editor integration existed.
    pub async fn open_diff(&self, req: DiffRequest) -> Option<DiffAck> {
        match self.send_diff_request(req).await {
            Ok(ack) => Some(ack),
            Err(err) => {
                if let Some(event) = DiagnosticEvent::classify(&err) {
                    self.sink.record(event, &err.to_string());
                }
                debug!("Editor diff unavailable: {}", err);
                None
            }
        }
    }

    /// Tear down the connection, failing anything in flight
    pub async fn shutdown(&self) {
        self.connection.disconnect().await;
    }
}
