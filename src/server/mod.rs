mod packet_in;
mod server;
mod shutdown;
mod stream_channel;

pub(crate) use server::P4rtServer;
pub(crate) use packet_in::spawn_packet_in_pump;
pub(crate) use shutdown::shutdown_signal;
pub(crate) use shutdown::P4rtServerShutdownHandle;
pub(crate) use shutdown::P4rtServerShutdownSignal;
