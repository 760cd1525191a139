//! Per-device arbitration, authorization and notification routing for SDN controller connections.
mod authorization;
mod connection;
mod error;
mod manager;
mod notification;
mod role_config;
#[cfg(test)]
mod test_utils;
mod types;
mod wildcard;

pub use connection::ConnectionId;
pub use connection::SdnConnection;
pub use connection::StreamResponseSender;
pub use error::ArbitrationError;
pub use error::AuthorizationError;
pub use error::NotificationError;
pub use manager::SdnControllerManager;
pub use role_config::PacketInFilter;
pub use role_config::RoleConfig;
pub use types::ElectionId;
pub use types::RoleName;
pub use types::SDN_CONTROLLER_ROLE;
