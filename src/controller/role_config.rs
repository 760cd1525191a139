use crate::controller::error::ArbitrationError;
use crate::controller::types::RoleName;
use crate::grpc::stratum::{p4_role_config, P4RoleConfig};
use prost::Message;
use std::collections::{BTreeSet, HashMap};
use std::convert::TryFrom;

pub(crate) const ROLE_CONFIG_TYPE_URL: &str = "type.googleapis.com/stratum.P4RoleConfig";

/// Policy attached to a role. A role without one is unrestricted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RoleConfig {
    pub can_push_pipeline: bool,
    pub receives_packet_ins: bool,
    pub packet_in_filter: Option<PacketInFilter>,
    pub exclusive_p4_ids: BTreeSet<u32>,
    pub shared_p4_ids: BTreeSet<u32>,
}

/// Only PacketIns with a metadata entry matching `(metadata_id, value)` exactly get through.
/// `value` is always in canonical bytestring form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PacketInFilter {
    pub metadata_id: u32,
    pub value: Vec<u8>,
}

impl RoleConfig {
    /// Whether this role may touch the P4 object `p4_id`.
    pub fn allows(&self, p4_id: u32) -> bool {
        self.exclusive_p4_ids.contains(&p4_id) || self.shared_p4_ids.contains(&p4_id)
    }

    pub(crate) fn unpack(any: &prost_types::Any) -> Result<Self, ArbitrationError> {
        let type_name = any.type_url.rsplit('/').next().unwrap_or_default();
        if type_name != "stratum.P4RoleConfig" {
            return Err(ArbitrationError::InvalidRoleConfig(format!(
                "expected a packed stratum.P4RoleConfig, got type URL '{}'",
                any.type_url
            )));
        }

        let proto = P4RoleConfig::decode(any.value.as_slice())
            .map_err(|e| ArbitrationError::InvalidRoleConfig(format!("failed to decode: {}", e)))?;

        RoleConfig::try_from(proto).map_err(ArbitrationError::InvalidRoleConfig)
    }

    pub(crate) fn pack(&self) -> prost_types::Any {
        let proto = P4RoleConfig::from(self);
        let mut value = Vec::with_capacity(proto.encoded_len());
        proto
            .encode(&mut value)
            .expect("Encoding into a Vec can't run out of capacity");

        prost_types::Any {
            type_url: ROLE_CONFIG_TYPE_URL.to_string(),
            value,
        }
    }
}

/// Strips leading zero bytes, keeping at least one, like P4Runtime's canonical bytestrings.
pub(crate) fn canonical_bytestring(value: &[u8]) -> Vec<u8> {
    match value.iter().position(|b| *b != 0) {
        Some(first_non_zero) => value[first_non_zero..].to_vec(),
        None if value.is_empty() => Vec::new(),
        None => vec![0],
    }
}

/// Checks `config` for `role` against every other role's installed config. Exclusive IDs may not
/// show up anywhere else; shared IDs may overlap other shared IDs.
pub(crate) fn validate_role_config(
    role: &RoleName,
    config: Option<&RoleConfig>,
    installed: &HashMap<RoleName, Option<RoleConfig>>,
) -> Result<(), ArbitrationError> {
    let config = match config {
        None => return Ok(()),
        Some(_) if role.is_none() => return Err(ArbitrationError::RoleConfigOnDefaultRole),
        Some(config) => config,
    };

    for (other_role, other_config) in installed {
        if other_role == role {
            continue;
        }
        let other_config = match other_config {
            Some(c) => c,
            None => continue,
        };

        let conflict = config
            .exclusive_p4_ids
            .intersection(&other_config.exclusive_p4_ids)
            .chain(config.exclusive_p4_ids.intersection(&other_config.shared_p4_ids))
            .chain(config.shared_p4_ids.intersection(&other_config.exclusive_p4_ids))
            .next();

        if let Some(p4_id) = conflict {
            return Err(ArbitrationError::RoleConfigConflict {
                role: role.clone(),
                conflicting_role: other_role.clone(),
                p4_id: *p4_id,
            });
        }
    }

    Ok(())
}

// ------- Conversions --------

impl TryFrom<P4RoleConfig> for RoleConfig {
    type Error = String;

    fn try_from(proto: P4RoleConfig) -> Result<Self, Self::Error> {
        let packet_in_filter = match proto.packet_in_filter {
            None => None,
            Some(_) if !proto.receives_packet_ins => {
                return Err("packet_in_filter is set but receives_packet_ins is false".to_string());
            }
            Some(filter) if filter.value.is_empty() => {
                return Err("packet_in_filter must have a non-empty value".to_string());
            }
            Some(filter) => Some(PacketInFilter {
                metadata_id: filter.metadata_id,
                value: canonical_bytestring(&filter.value),
            }),
        };

        Ok(RoleConfig {
            can_push_pipeline: proto.can_push_pipeline,
            receives_packet_ins: proto.receives_packet_ins,
            packet_in_filter,
            exclusive_p4_ids: proto.exclusive_p4_ids.into_iter().collect(),
            shared_p4_ids: proto.shared_p4_ids.into_iter().collect(),
        })
    }
}

impl From<&RoleConfig> for P4RoleConfig {
    fn from(config: &RoleConfig) -> Self {
        P4RoleConfig {
            exclusive_p4_ids: config.exclusive_p4_ids.iter().copied().collect(),
            shared_p4_ids: config.shared_p4_ids.iter().copied().collect(),
            receives_packet_ins: config.receives_packet_ins,
            packet_in_filter: config
                .packet_in_filter
                .as_ref()
                .map(|filter| p4_role_config::PacketFilter {
                    metadata_id: filter.metadata_id,
                    value: filter.value.clone(),
                }),
            can_push_pipeline: config.can_push_pipeline,
        }
    }
}
