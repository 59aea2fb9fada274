//! Environment probe for companion discovery signals
//!
//! Builds an immutable [`DiscoveryContext`] from ambient session
//! configuration. The probe is pure: no network or disk I/O, and unset
//! or malformed signals resolve to absent, never to an error. The
//! context is constructed once per session and threaded through
//! constructors; nothing else reads these variables.

use std::path::PathBuf;

/// Terminal-identity variable set by the host terminal
pub const TERMINAL_MARKER_VAR: &str = "TERM_PROGRAM";

/// Terminal-identity value indicating the assistant runs inside the
/// editor's integrated terminal
pub const HOST_EDITOR_MARKER: &str = "vscode";

/// Companion server port advertised by the editor extension
pub const IDE_PORT_VAR: &str = "TETHER_IDE_SERVER_PORT";

/// Workspace directory advertised by the editor extension
pub const IDE_WORKSPACE_VAR: &str = "TETHER_IDE_WORKSPACE_PATH";

/// Immutable snapshot of the discovery signals for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryContext {
    /// Whether the terminal-identity heuristic matched the host editor
    pub is_host_editor: bool,
    /// Companion port advertised via the environment, if any
    pub advertised_port: Option<u16>,
    /// Editor workspace directory, if advertised
    pub workspace_path: Option<PathBuf>,
}

impl DiscoveryContext {
    /// Probe the process environment
    pub fn from_env() -> Self {
        Self::from_parts(
            std::env::var(TERMINAL_MARKER_VAR).ok().as_deref(),
            std::env::var(IDE_PORT_VAR).ok().as_deref(),
            std::env::var(IDE_WORKSPACE_VAR).ok().as_deref(),
        )
    }

    /// Build a context from already-read signals
    pub fn from_parts(
        term_program: Option<&str>,
        advertised_port: Option<&str>,
        workspace_path: Option<&str>,
    ) -> Self {
        Self {
            is_host_editor: term_program == Some(HOST_EDITOR_MARKER),
            advertised_port: advertised_port.and_then(parse_port),
            workspace_path: workspace_path
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Parse an advertised port value; port 0 is not a usable listener
fn parse_port(raw: &str) -> Option<u16> {
    raw.trim().parse::<u16>().ok().filter(|port| *port != 0)
}
