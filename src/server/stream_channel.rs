use crate::controller::{SdnConnection, SdnControllerManager};
use crate::grpc::p4::v1::{stream_message_request, StreamMessageRequest, StreamMessageResponse};
use crate::target::SwitchTarget;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tonic::{Status, Streaming};

/// Counts open StreamChannel streams. A slot is held by an `OpenStreamPermit` and released when
/// the permit drops.
pub(crate) struct OpenStreamLimit {
    open: AtomicUsize,
    max: usize,
}

pub(crate) struct OpenStreamPermit {
    limit: Arc<OpenStreamLimit>,
}

impl OpenStreamLimit {
    pub(crate) fn new(max: usize) -> Self {
        OpenStreamLimit {
            open: AtomicUsize::new(0),
            max,
        }
    }

    pub(crate) fn try_acquire(self: &Arc<Self>) -> Option<OpenStreamPermit> {
        let mut open = self.open.load(Ordering::SeqCst);
        loop {
            if open >= self.max {
                return None;
            }
            match self
                .open
                .compare_exchange(open, open + 1, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return Some(OpenStreamPermit { limit: self.clone() }),
                Err(actual) => open = actual,
            }
        }
    }
}

impl Drop for OpenStreamPermit {
    fn drop(&mut self) {
        self.limit.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One controller's StreamChannel. Reads requests until the controller hangs up or a request is
/// rejected, then removes the connection from the manager.
pub(crate) struct StreamSession {
    pub(crate) logger: slog::Logger,
    pub(crate) manager: Arc<SdnControllerManager>,
    pub(crate) target: Arc<dyn SwitchTarget>,
    pub(crate) connection: SdnConnection,
    pub(crate) outbound: mpsc::Sender<Result<StreamMessageResponse, Status>>,
    pub(crate) _permit: OpenStreamPermit,
}

impl StreamSession {
    pub(crate) async fn run(self, mut inbound: Streaming<StreamMessageRequest>) {
        slog::info!(self.logger, "StreamChannel opened: {:?}", self.connection);

        loop {
            match inbound.message().await {
                Ok(Some(request)) => {
                    if let Err(status) = self.handle_request(request).await {
                        slog::warn!(
                            self.logger,
                            "Closing StreamChannel {:?}: {}",
                            self.connection,
                            status.message()
                        );
                        // Terminal status for the controller. Ignore if it already hung up.
                        let _ = self.outbound.send(Err(status)).await;
                        break;
                    }
                }
                Ok(None) => {
                    slog::info!(self.logger, "StreamChannel {:?} closed by the controller.", self.connection);
                    break;
                }
                Err(status) => {
                    slog::info!(
                        self.logger,
                        "StreamChannel {:?} broke: {}",
                        self.connection,
                        status.message()
                    );
                    break;
                }
            }
        }

        self.manager.disconnect(&self.connection);
    }

    async fn handle_request(&self, request: StreamMessageRequest) -> Result<(), Status> {
        slog::debug!(self.logger, "ServerWire - {:?}", request);

        match request.update {
            Some(stream_message_request::Update::Arbitration(update)) => {
                self.manager.handle_arbitration_update(&update, &self.connection)?;
            }
            Some(stream_message_request::Update::Packet(packet)) => {
                if !self.manager.is_primary(&self.connection) {
                    slog::debug!(
                        self.logger,
                        "Dropping packet-out from non-primary connection {:?}.",
                        self.connection
                    );
                    return Ok(());
                }
                if let Err(e) = self.target.transmit_packet(packet).await {
                    slog::warn!(self.logger, "Failed to transmit packet-out: {}", e);
                }
            }
            Some(stream_message_request::Update::DigestAck(_)) => {
                slog::trace!(self.logger, "Ignoring digest ack from {:?}.", self.connection);
            }
            None => {
                return Err(Status::invalid_argument("Need to specify either arbitration or packet."));
            }
        }

        Ok(())
    }
}
