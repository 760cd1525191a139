//! This mod is meant to hold most of the code for the library's client-facing API.
mod logging;
mod options;
mod wiring;

pub use logging::create_root_logger_for_file;
pub use logging::create_root_logger_for_stdout;
pub use options::P4rtServerOptions;
pub use wiring::try_create_p4rt_server;
pub use wiring::P4rtServerConfig;
pub use wiring::P4rtServerCreationError;
pub use wiring::P4rtServerHandle;
