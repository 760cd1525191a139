use tonic::{Code, Status};

/// Failures reported by a `SwitchTarget`. These are about the request contents or the device, not
/// about who sent the request.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TargetError {
    #[error("No forwarding pipeline config has been pushed to the device.")]
    PipelineNotInstalled,

    #[error("No forwarding pipeline config has been saved to commit.")]
    NothingToCommit,

    #[error("Invalid forwarding pipeline config: {0}")]
    InvalidPipelineConfig(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Table {0} is not part of the installed pipeline.")]
    UnknownTable(u32),

    #[error("Table entry already exists in table {0}.")]
    EntryExists(u32),

    #[error("Table entry does not exist in table {0}.")]
    EntryNotFound(u32),

    #[error("{0} is not supported by this target.")]
    Unsupported(&'static str),

    // Nobody registered to receive packet-ins, or the receiver went away.
    #[error("Packet-in writer is not available.")]
    PacketInWriterUnavailable,
}

impl TargetError {
    pub fn code(&self) -> Code {
        match self {
            TargetError::PipelineNotInstalled => Code::FailedPrecondition,
            TargetError::NothingToCommit => Code::FailedPrecondition,
            TargetError::InvalidPipelineConfig(_) => Code::InvalidArgument,
            TargetError::InvalidUpdate(_) => Code::InvalidArgument,
            TargetError::UnknownTable(_) => Code::NotFound,
            TargetError::EntryExists(_) => Code::AlreadyExists,
            TargetError::EntryNotFound(_) => Code::NotFound,
            TargetError::Unsupported(_) => Code::Unimplemented,
            TargetError::PacketInWriterUnavailable => Code::Unavailable,
        }
    }
}

// ------- Conversions --------

impl From<TargetError> for Status {
    fn from(e: TargetError) -> Self {
        Status::new(e.code(), e.to_string())
    }
}
