//! Discovery resolution: probe signals to a concrete connection target
//!
//! Resolution never fails: the absence of a companion is an expected,
//! silent outcome, reported as `None` rather than an error. Any I/O or
//! parse problem while reading the on-disk discovery record is treated
//! identically to "not found".

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tether_utils::paths;

use crate::probe::DiscoveryContext;

/// Companion servers listen on the loopback interface only
const LOCALHOST: &str = "127.0.0.1";

/// Resolved companion endpoint for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
}

impl ConnectionTarget {
    /// Target on the loopback interface
    pub fn localhost(port: u16) -> Self {
        Self {
            host: LOCALHOST.into(),
            port,
        }
    }

    /// Socket address string for connecting
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// On-disk discovery record written by the editor extension
///
/// Scoped to a workspace: the embedded path lets the resolver reject a
/// record left behind by a companion serving a different workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct DiscoveryRecord {
    port: u16,
    workspace_path: String,
}

/// Resolve the probe context into a connection target
///
/// Fallback order: an environment-advertised port always wins over the
/// on-disk record (the environment comes from the live editor session
/// that spawned the assistant; the record can be stale).
pub fn resolve(ctx: &DiscoveryContext) -> Option<ConnectionTarget> {
    // Primary short-circuit: outside the host editor the integration is
    // not attempted at all, so no file I/O happens either.
    if !ctx.is_host_editor {
        return None;
    }

    if let Some(port) = ctx.advertised_port {
        return Some(ConnectionTarget::localhost(port));
    }

    let workspace = ctx.workspace_path.as_deref()?;
    read_record(workspace, &paths::discovery_file(workspace))
}

/// Read and validate a discovery record file
fn read_record(workspace: &Path, record_path: &Path) -> Option<ConnectionTarget> {
    let content = match std::fs::read_to_string(record_path) {
        Ok(content) => content,
        Err(e) => {
            debug!("No discovery record at {}: {}", record_path.display(), e);
            return None;
        }
    };

    let record: DiscoveryRecord = match serde_json::from_str(&content) {
        Ok(record) => record,
        Err(e) => {
            debug!(
                "Ignoring malformed discovery record {}: {}",
                record_path.display(),
                e
            );
            return None;
        }
    };

    if record.port == 0 {
        debug!("Ignoring discovery record with port 0");
        return None;
    }

    if Path::new(&record.workspace_path) != workspace {
        debug!(
            "Ignoring discovery record for different workspace {}",
            record.workspace_path
        );
        return None;
    }

    Some(ConnectionTarget::localhost(record.port))
}
