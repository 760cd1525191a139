use crate::controller::{NotificationError, SdnControllerManager};
use crate::grpc::p4::v1::{stream_message_response, PacketIn, StreamMessageResponse};
use crate::target::SwitchTarget;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Registers with `target` for packet-ins and forwards each one to the primaries. The task ends
/// when the target drops its writer.
pub(crate) fn spawn_packet_in_pump(
    logger: slog::Logger,
    manager: Arc<SdnControllerManager>,
    target: &dyn SwitchTarget,
    buffer_size: usize,
) -> tokio::task::JoinHandle<()> {
    let (tx, rx) = mpsc::channel(buffer_size);
    target.register_packet_in_writer(tx);

    tokio::spawn(run_packet_in_pump(logger, manager, rx))
}

async fn run_packet_in_pump(
    logger: slog::Logger,
    manager: Arc<SdnControllerManager>,
    mut packet_ins: mpsc::Receiver<PacketIn>,
) {
    while let Some(packet) = packet_ins.recv().await {
        let response = StreamMessageResponse {
            update: Some(stream_message_response::Update::Packet(packet)),
        };
        match manager.send_packet_in_to_primary(response) {
            Ok(()) => {}
            Err(NotificationError::NoPrimary) => {
                slog::debug!(logger, "Dropping packet-in, no primary connection.");
            }
            Err(e) => {
                slog::warn!(logger, "Failed to deliver packet-in: {}", e);
            }
        }
    }

    slog::info!(logger, "Packet-in pump has exited.");
}
