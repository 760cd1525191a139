use crate::grpc::p4::v1::Uint128;
use std::fmt;

/// Well-known role name that is always present and, until a primary installs a config for it,
/// unrestricted.
pub const SDN_CONTROLLER_ROLE: &str = "sdn_controller";

/// `None` is the default (root) role. It is NOT the same as a role named `""`, which never reaches
/// the manager because [`role_name_from`] folds it into `None`.
pub type RoleName = Option<String>;

/// Canonical role key for a role string taken off the wire.
pub(crate) fn role_name_from(name: &str) -> RoleName {
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

pub(crate) fn pretty_role(role: &RoleName) -> String {
    match role {
        Some(name) => format!("'{}'", name),
        None => "<default>".to_string(),
    }
}

pub(crate) fn pretty_election_id(election_id: &Option<ElectionId>) -> String {
    match election_id {
        Some(id) => id.to_string(),
        None => "<backup>".to_string(),
    }
}

/// Election IDs rank controllers within a role. The highest one seen wins primacy.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ElectionId(u128);

impl ElectionId {
    pub fn new(id: u128) -> Self {
        ElectionId(id)
    }

    pub fn high(&self) -> u64 {
        (self.0 >> 64) as u64
    }

    pub fn low(&self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ high: {} low: {} }}", self.high(), self.low())
    }
}

impl From<Uint128> for ElectionId {
    fn from(proto: Uint128) -> Self {
        ElectionId((u128::from(proto.high) << 64) | u128::from(proto.low))
    }
}

impl From<&Uint128> for ElectionId {
    fn from(proto: &Uint128) -> Self {
        ElectionId::from(proto.clone())
    }
}

impl From<ElectionId> for Uint128 {
    fn from(id: ElectionId) -> Self {
        Uint128 {
            high: id.high(),
            low: id.low(),
        }
    }
}
