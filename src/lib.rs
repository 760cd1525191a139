mod api;
mod controller;
mod server;
mod target;
mod grpc {
    pub mod p4 {
        pub mod v1 {
            include!("../generated/p4.v1.rs");
        }
        pub mod config {
            pub mod v1 {
                include!("../generated/p4.config.v1.rs");
            }
        }
    }
    pub mod stratum {
        include!("../generated/stratum.rs");
    }
}

pub use api::create_root_logger_for_file;
pub use api::create_root_logger_for_stdout;
pub use api::try_create_p4rt_server;
pub use api::P4rtServerConfig;
pub use api::P4rtServerCreationError;
pub use api::P4rtServerHandle;
pub use api::P4rtServerOptions;
pub use controller::ArbitrationError;
pub use controller::AuthorizationError;
pub use controller::ConnectionId;
pub use controller::ElectionId;
pub use controller::NotificationError;
pub use controller::PacketInFilter;
pub use controller::RoleConfig;
pub use controller::RoleName;
pub use controller::SdnConnection;
pub use controller::SdnControllerManager;
pub use controller::StreamResponseSender;
pub use controller::SDN_CONTROLLER_ROLE;
pub use grpc::p4;
pub use grpc::stratum;
pub use target::InMemorySwitch;
pub use target::PacketInWriter;
pub use target::SwitchTarget;
pub use target::TargetError;

// `crate::{root_mod}` should not have any code. Just `mod` and `pub use` statements. The generated
// proto tree is the exception, it has to mirror the proto package hierarchy so prost's relative
// `super::` paths resolve.
