use crate::grpc::p4::v1::StreamMessageResponse;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tonic::Status;

/// Outbound half of a StreamChannel. Bounded, and only ever written with `try_send()` so a slow
/// controller can't stall the manager's lock.
pub type StreamResponseSender = mpsc::Sender<Result<StreamMessageResponse, Status>>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of one controller stream. Never reused within a process.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// SdnConnection is the transport layer's handle to one live controller stream. The transport
/// owns it for the lifetime of the stream; the manager only ever sees `&SdnConnection` and keys
/// its own bookkeeping off of `id()`.
pub struct SdnConnection {
    id: ConnectionId,
    peer: String,
    sender: StreamResponseSender,
}

impl SdnConnection {
    pub fn new(peer: impl Into<String>, sender: StreamResponseSender) -> Self {
        SdnConnection {
            id: ConnectionId::next(),
            peer: peer.into(),
            sender,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub(crate) fn sender(&self) -> &StreamResponseSender {
        &self.sender
    }
}

impl fmt::Debug for SdnConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.id, self.peer)
    }
}

/// Non-blocking delivery of one response. A full or closed stream is logged and dropped; the
/// transport will `disconnect()` a stream that is going away.
pub(crate) fn send_stream_message(
    logger: &slog::Logger,
    connection_id: ConnectionId,
    sender: &StreamResponseSender,
    response: StreamMessageResponse,
) {
    if let Err(e) = sender.try_send(Ok(response)) {
        let reason = match e {
            mpsc::error::TrySendError::Full(_) => "outbound buffer full",
            mpsc::error::TrySendError::Closed(_) => "stream closed",
        };
        slog::warn!(
            logger,
            "Could not send StreamMessageResponse to {}: {}",
            connection_id,
            reason
        );
    }
}
