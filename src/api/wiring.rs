use crate::api::options::P4rtServerOptionsValidated;
use crate::controller::SdnControllerManager;
use crate::server::{self, P4rtServer, P4rtServerShutdownHandle};
use crate::target::SwitchTarget;
use crate::P4rtServerOptions;
use std::convert::TryFrom;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

pub struct P4rtServerConfig {
    pub device_id: u64,
    // Port 0 picks a free port, see `P4rtServerHandle::local_addr()`.
    pub listen_addr: SocketAddr,
    pub info_logger: slog::Logger,
    pub options: P4rtServerOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum P4rtServerCreationError {
    #[error("Illegal options for configuring server: {0}")]
    IllegalServerOptions(String),
    #[error("Failed to bind listen address")]
    Bind(io::Error),
}

/// A running P4Runtime server. Dropping the handle stops the server.
pub struct P4rtServerHandle {
    logger: slog::Logger,
    manager: Arc<SdnControllerManager>,
    local_addr: SocketAddr,
    shutdown_handle: P4rtServerShutdownHandle,
    server_task: JoinHandle<()>,
}

impl P4rtServerHandle {
    pub fn manager(&self) -> &Arc<SdnControllerManager> {
        &self.manager
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting requests and waits for the server task to exit. Open StreamChannels keep
    /// the server alive, so the wait is capped at `SHUTDOWN_GRACE_PERIOD`.
    pub async fn shutdown(self) {
        self.shutdown_handle.shutdown();
        if timeout(SHUTDOWN_GRACE_PERIOD, self.server_task).await.is_err() {
            slog::warn!(self.logger, "Server did not exit within {:?}.", SHUTDOWN_GRACE_PERIOD);
        }
    }
}

pub async fn try_create_p4rt_server(
    config: P4rtServerConfig,
    target: Arc<dyn SwitchTarget>,
) -> Result<P4rtServerHandle, P4rtServerCreationError> {
    let root_logger = config.info_logger;

    let options = P4rtServerOptionsValidated::try_from(config.options)
        .map_err(|e| P4rtServerCreationError::IllegalServerOptions(e.to_string()))?;

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(P4rtServerCreationError::Bind)?;
    let local_addr = listener.local_addr().map_err(P4rtServerCreationError::Bind)?;

    let manager = Arc::new(SdnControllerManager::new(root_logger.clone(), config.device_id));

    server::spawn_packet_in_pump(
        root_logger.clone(),
        manager.clone(),
        target.as_ref(),
        options.packet_in_buffer_size,
    );

    let (shutdown_handle, shutdown_signal) = server::shutdown_signal();
    let p4rt_server = P4rtServer::new(
        root_logger.clone(),
        manager.clone(),
        target,
        options.stream_buffer_size,
        options.max_open_streams,
    );
    let server_task = tokio::spawn(p4rt_server.run(listener, shutdown_signal));

    Ok(P4rtServerHandle {
        logger: root_logger,
        manager,
        local_addr,
        shutdown_handle,
        server_task,
    })
}
