use p4rt::{InMemorySwitch, P4rtServerConfig, P4rtServerOptions};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

const DEVICE_ID: u64 = 1;
const P4RUNTIME_PORT: u16 = 9559;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = p4rt::create_root_logger_for_stdout(DEVICE_ID);
    let target = Arc::new(InMemorySwitch::new(logger.clone()));

    let config = P4rtServerConfig {
        device_id: DEVICE_ID,
        listen_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, P4RUNTIME_PORT)),
        info_logger: logger.clone(),
        options: P4rtServerOptions::default(),
    };
    let server = p4rt::try_create_p4rt_server(config, target).await?;
    slog::info!(logger, "P4Runtime server for device {} up on {}", DEVICE_ID, server.local_addr());

    tokio::signal::ctrl_c().await?;
    slog::info!(logger, "Shutting down.");
    server.shutdown().await;

    Ok(())
}
