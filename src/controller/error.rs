use crate::controller::types::{pretty_role, ElectionId, RoleName};
use tonic::{Code, Status};

/// Rejections of a `MasterArbitrationUpdate`. None of these mutate manager state.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ArbitrationError {
    // First message on a stream addressed the wrong device.
    #[error("Arbitration request has the wrong device ID '{requested}'. Cannot establish connection to this device '{expected}'.")]
    UnknownDevice { requested: u64, expected: u64 },

    // Later message on an established stream addressed the wrong device.
    #[error("Arbitration request has the wrong device ID '{requested}'. This stream is connected to device '{expected}'.")]
    DeviceIdChanged { requested: u64, expected: u64 },

    // Role is fixed once a stream has been accepted. Open a new stream to change it.
    #[error("Arbitration request cannot change the role from {} to {}.", pretty_role(.from), pretty_role(.to))]
    RoleChanged { from: RoleName, to: RoleName },

    #[error("Election ID {election_id} is already used by another connection with the same role.")]
    ElectionIdInUse { election_id: ElectionId },

    #[error("Role config cannot be set for the default role.")]
    RoleConfigOnDefaultRole,

    #[error("Invalid role config: {0}")]
    InvalidRoleConfig(String),

    #[error("Role config for {} claims P4 ID {p4_id} which role {} already holds.", pretty_role(.role), pretty_role(.conflicting_role))]
    RoleConfigConflict {
        role: RoleName,
        conflicting_role: RoleName,
        p4_id: u32,
    },
}

impl ArbitrationError {
    pub fn code(&self) -> Code {
        match self {
            ArbitrationError::UnknownDevice { .. } => Code::NotFound,
            ArbitrationError::DeviceIdChanged { .. } => Code::FailedPrecondition,
            ArbitrationError::RoleChanged { .. } => Code::FailedPrecondition,
            ArbitrationError::ElectionIdInUse { .. } => Code::InvalidArgument,
            ArbitrationError::RoleConfigOnDefaultRole => Code::InvalidArgument,
            ArbitrationError::InvalidRoleConfig(_) => Code::InvalidArgument,
            ArbitrationError::RoleConfigConflict { .. } => Code::InvalidArgument,
        }
    }
}

/// Rejections of Write/Read/SetForwardingPipelineConfig requests.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("Request does not have an election ID.")]
    MissingElectionId,

    #[error("Only the primary connection can issue requests, but no primary connection has been established for role {}.", pretty_role(.0))]
    NoPrimary(RoleName),

    #[error("Only the primary connection can issue requests. Election ID {election_id} is not the primary for role {}.", pretty_role(.role))]
    NotPrimary { role: RoleName, election_id: ElectionId },

    // Election ID matches history, but whoever held it has since disconnected.
    #[error("Election ID {election_id} for role {} is not held by any active connection.", pretty_role(.role))]
    InactiveElectionId { role: RoleName, election_id: ElectionId },

    #[error("Unknown role {}.", pretty_role(.0))]
    UnknownRole(RoleName),

    #[error("Role {} is not allowed to access P4 entity with ID {p4_id}.", pretty_role(.role))]
    P4IdNotPermitted { role: RoleName, p4_id: u32 },

    #[error("Role {} is not allowed to push a forwarding pipeline.", pretty_role(.0))]
    PipelinePushNotPermitted(RoleName),
}

impl AuthorizationError {
    pub fn code(&self) -> Code {
        match self {
            AuthorizationError::UnknownRole(_) => Code::NotFound,
            AuthorizationError::MissingElectionId
            | AuthorizationError::NoPrimary(_)
            | AuthorizationError::NotPrimary { .. }
            | AuthorizationError::InactiveElectionId { .. }
            | AuthorizationError::P4IdNotPermitted { .. }
            | AuthorizationError::PipelinePushNotPermitted(_) => Code::PermissionDenied,
        }
    }
}

/// Failures to route an async message to a primary. These are soft: nothing was sent.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum NotificationError {
    #[error("PacketIn message must use a packet.")]
    NotAPacket,

    #[error("No active role has a primary connection configured to receive StreamMessageResponse messages.")]
    NoPrimary,
}

impl NotificationError {
    pub fn code(&self) -> Code {
        match self {
            NotificationError::NotAPacket => Code::InvalidArgument,
            NotificationError::NoPrimary => Code::FailedPrecondition,
        }
    }
}

// ------- Conversions --------

impl From<ArbitrationError> for Status {
    fn from(e: ArbitrationError) -> Self {
        Status::new(e.code(), e.to_string())
    }
}

impl From<AuthorizationError> for Status {
    fn from(e: AuthorizationError) -> Self {
        Status::new(e.code(), e.to_string())
    }
}

impl From<NotificationError> for Status {
    fn from(e: NotificationError) -> Self {
        Status::new(e.code(), e.to_string())
    }
}
