use crate::controller::{ElectionId, RoleConfig, SdnConnection, SdnControllerManager};
use crate::grpc::p4::v1::{stream_message_response, MasterArbitrationUpdate, Role, StreamMessageResponse, Uint128};
use tokio::sync::mpsc;
use tonic::Status;

pub(crate) const DEVICE_ID: u64 = 183807201;

pub(crate) fn test_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

pub(crate) fn test_manager() -> SdnControllerManager {
    SdnControllerManager::new(test_logger(), DEVICE_ID)
}

pub(crate) fn election_id(id: u128) -> Uint128 {
    Uint128::from(ElectionId::new(id))
}

pub(crate) fn arbitration(device_id: u64, role: Option<&str>, id: Option<u128>) -> MasterArbitrationUpdate {
    MasterArbitrationUpdate {
        device_id,
        role: role.map(|name| Role {
            name: name.to_string(),
            config: None,
        }),
        election_id: id.map(election_id),
        status: None,
    }
}

pub(crate) fn arbitration_with_config(
    device_id: u64,
    role: &str,
    id: Option<u128>,
    config: &RoleConfig,
) -> MasterArbitrationUpdate {
    MasterArbitrationUpdate {
        device_id,
        role: Some(Role {
            name: role.to_string(),
            config: Some(config.pack()),
        }),
        election_id: id.map(election_id),
        status: None,
    }
}

/// A controller stream whose outbound side the test can inspect.
pub(crate) struct TestController {
    pub(crate) connection: SdnConnection,
    rx: mpsc::Receiver<Result<StreamMessageResponse, Status>>,
}

impl TestController {
    pub(crate) fn new(peer: &str) -> Self {
        let (tx, rx) = mpsc::channel(64);
        TestController {
            connection: SdnConnection::new(peer, tx),
            rx,
        }
    }

    pub(crate) fn next_message(&mut self) -> StreamMessageResponse {
        self.rx
            .try_recv()
            .expect("Expected a queued StreamMessageResponse")
            .expect("Expected an Ok response")
    }

    pub(crate) fn next_arbitration(&mut self) -> MasterArbitrationUpdate {
        match self.next_message().update {
            Some(stream_message_response::Update::Arbitration(update)) => update,
            other => panic!("Expected arbitration response, got {:?}", other),
        }
    }

    pub(crate) fn assert_no_messages(&mut self) {
        if let Ok(message) = self.rx.try_recv() {
            panic!("Expected no queued messages, got {:?}", message);
        }
    }

    pub(crate) fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}
