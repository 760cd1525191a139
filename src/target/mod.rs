mod error;
mod in_memory;
mod switch;

pub use error::TargetError;
pub use in_memory::InMemorySwitch;
pub use switch::PacketInWriter;
pub use switch::SwitchTarget;
