//! Mock editor companion for tests
//!
//! Listens on an ephemeral loopback port and answers the wire protocol
//! with a configurable behavior, mirroring how a real companion serves
//! `initialize` and `openDiff`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use tether_protocol::{methods, CompanionCodec, ErrorCode, Response, PROTOCOL_VERSION};

/// How the companion behaves after accepting a connection
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    /// Handshake normally, acknowledge every diff request
    Ack,
    /// Handshake normally, reject every diff request
    Reject,
    /// Handshake normally, never answer diff requests
    SilentDiff,
    /// Handshake normally, answer diff requests after a delay
    AckAfter(Duration),
    /// Read requests but never respond at all
    Mute,
    /// Handshake with an incompatible protocol version
    WrongVersion,
    /// Handshake normally, then immediately close the connection
    DropAfterInit,
}

/// A running mock companion
pub struct MockCompanion {
    pub port: u16,
    accepts: Arc<AtomicUsize>,
}

impl MockCompanion {
    /// Start a companion with the given behavior
    pub async fn spawn(mode: Mode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepts = Arc::new(AtomicUsize::new(0));

        let task_accepts = accepts.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                task_accepts.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, mode));
            }
        });

        Self { port, accepts }
    }

    /// Number of connections accepted so far
    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }
}

/// Serve one connection with [`Mode::Ack`] behavior
pub async fn serve_ack(stream: TcpStream) {
    serve(stream, Mode::Ack).await;
}

async fn serve(stream: TcpStream, mode: Mode) {
    let mut framed = Framed::new(stream, CompanionCodec::new());

    while let Some(Ok(req)) = framed.next().await {
        if matches!(mode, Mode::Mute) {
            continue;
        }

        let resp = match req.method.as_str() {
            methods::INITIALIZE => {
                let version = match mode {
                    Mode::WrongVersion => PROTOCOL_VERSION + 1,
                    _ => PROTOCOL_VERSION,
                };
                Response::success(req.id, serde_json::json!({ "protocolVersion": version }))
            }
            methods::OPEN_DIFF => match mode {
                Mode::Reject => {
                    Response::failure(req.id, ErrorCode::DiffFailed, "file outside workspace")
                }
                Mode::SilentDiff => continue,
                Mode::AckAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Response::success(req.id, serde_json::json!({ "message": "diff opened" }))
                }
                _ => Response::success(req.id, serde_json::json!({ "message": "diff opened" })),
            },
            _ => Response::failure(req.id, ErrorCode::MethodNotFound, "unknown method"),
        };

        if framed.send(resp).await.is_err() {
            break;
        }

        if matches!(mode, Mode::DropAfterInit) && req.method == methods::INITIALIZE {
            break;
        }
    }
}

/// A loopback port with nothing listening on it
pub async fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
