//! Diagnostics sink for classified integration failures
//!
//! The sink is write-only: events feed operator diagnostics and are
//! never consumed for control flow. Nothing recorded here is surfaced
//! to the end user.

use std::sync::Mutex;

use tether_utils::TetherError;

/// Classified failure events emitted by the integration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// No companion was discoverable; a normal outcome, not an error
    DiscoveryAbsent,
    ConnectTimeout,
    ConnectRefused,
    ProtocolError,
    ResponseTimeout,
}

impl DiagnosticEvent {
    /// Stable event name for log aggregation
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticEvent::DiscoveryAbsent => "discovery-absent",
            DiagnosticEvent::ConnectTimeout => "connect-timeout",
            DiagnosticEvent::ConnectRefused => "connect-refused",
            DiagnosticEvent::ProtocolError => "protocol-error",
            DiagnosticEvent::ResponseTimeout => "response-timeout",
        }
    }

    /// Classify an error onto the event taxonomy
    ///
    /// This is the single translation point from internal error kinds to
    /// recorded events. Errors that return `None` are either ambient
    /// (config, logging) or already covered by an earlier event on the
    /// same call path (`NotConnected` after a recorded connect failure).
    pub fn classify(err: &TetherError) -> Option<Self> {
        match err {
            TetherError::ConnectTimeout { .. } => Some(Self::ConnectTimeout),
            TetherError::ConnectRefused(_) | TetherError::Io(_) => Some(Self::ConnectRefused),
            TetherError::ProtocolMismatch { .. }
            | TetherError::Rejected { .. }
            | TetherError::InvalidMessage(_)
            | TetherError::ConnectionClosed => Some(Self::ProtocolError),
            TetherError::ResponseTimeout { .. } => Some(Self::ResponseTimeout),
            TetherError::NotConnected
            | TetherError::FileWrite { .. }
            | TetherError::Config(_)
            | TetherError::Internal(_) => None,
        }
    }
}

impl std::fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write-only sink receiving classified failure events
pub trait DiagnosticsSink: Send + Sync {
    /// Record one event with free-form detail
    fn record(&self, event: DiagnosticEvent, detail: &str);
}

/// Default sink: forwards events to the tracing subscriber
///
/// Discovery absence is an expected outcome and logs at debug; actual
/// failures log at warn so they land in the client log file.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, event: DiagnosticEvent, detail: &str) {
        match event {
            DiagnosticEvent::DiscoveryAbsent => {
                tracing::debug!(event = event.as_str(), "{}", detail);
            }
            _ => {
                tracing::warn!(event = event.as_str(), "{}", detail);
            }
        }
    }
}

/// Sink that collects events in memory, for host-side tests
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<(DiagnosticEvent, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<(DiagnosticEvent, String)> {
        self.events.lock().unwrap().clone()
    }

    /// Recorded events of one kind
    pub fn count(&self, event: DiagnosticEvent) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| *e == event)
            .count()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn record(&self, event: DiagnosticEvent, detail: &str) {
        self.events
            .lock()
            .unwrap()
            .push((event, detail.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Event Name Tests ====================

    #[test]
    fn test_event_names() {
        assert_eq!(DiagnosticEvent::DiscoveryAbsent.as_str(), "discovery-absent");
        assert_eq!(DiagnosticEvent::ConnectTimeout.as_str(), "connect-timeout");
        assert_eq!(DiagnosticEvent::ConnectRefused.as_str(), "connect-refused");
        assert_eq!(DiagnosticEvent::ProtocolError.as_str(), "protocol-error");
        assert_eq!(DiagnosticEvent::ResponseTimeout.as_str(), "response-timeout");
    }

    #[test]
    fn test_event_display_matches_name() {
        assert_eq!(
            DiagnosticEvent::ConnectRefused.to_string(),
            DiagnosticEvent::ConnectRefused.as_str()
        );
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_classify_connection_failures() {
        assert_eq!(
            DiagnosticEvent::classify(&TetherError::ConnectTimeout { millis: 2000 }),
            Some(DiagnosticEvent::ConnectTimeout)
        );
        assert_eq!(
            DiagnosticEvent::classify(&TetherError::refused("os error 111")),
            Some(DiagnosticEvent::ConnectRefused)
        );
    }

    #[test]
    fn test_classify_protocol_failures() {
        assert_eq!(
            DiagnosticEvent::classify(&TetherError::ProtocolMismatch {
                client: 1,
                companion: 2
            }),
            Some(DiagnosticEvent::ProtocolError)
        );
        assert_eq!(
            DiagnosticEvent::classify(&TetherError::rejected("no")),
            Some(DiagnosticEvent::ProtocolError)
        );
        assert_eq!(
            DiagnosticEvent::classify(&TetherError::ConnectionClosed),
            Some(DiagnosticEvent::ProtocolError)
        );
    }

    #[test]
    fn test_classify_response_timeout() {
        assert_eq!(
            DiagnosticEvent::classify(&TetherError::ResponseTimeout { millis: 100 }),
            Some(DiagnosticEvent::ResponseTimeout)
        );
    }

    #[test]
    fn test_not_connected_is_not_reclassified() {
        // The connect failure that preceded NotConnected was already
        // recorded; classifying it again would double-count.
        assert_eq!(DiagnosticEvent::classify(&TetherError::NotConnected), None);
    }

    // ==================== CollectingSink Tests ====================

    #[test]
    fn test_collecting_sink_records() {
        let sink = CollectingSink::new();
        sink.record(DiagnosticEvent::ConnectRefused, "refused");
        sink.record(DiagnosticEvent::ConnectRefused, "refused again");
        sink.record(DiagnosticEvent::ResponseTimeout, "slow");

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.count(DiagnosticEvent::ConnectRefused), 2);
        assert_eq!(sink.count(DiagnosticEvent::ConnectTimeout), 0);
    }
}
