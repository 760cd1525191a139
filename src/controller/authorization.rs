use crate::controller::error::AuthorizationError;
use crate::controller::manager::{ManagerState, SdnControllerManager};
use crate::controller::role_config::RoleConfig;
use crate::controller::types::{role_name_from, ElectionId, RoleName};
use crate::grpc::p4::v1::{entity, Entity, ReadRequest, SetForwardingPipelineConfigRequest, WriteRequest};

impl SdnControllerManager {
    /// Only the current primary of `role`, and only while it is still connected, may mutate state.
    pub fn allow_request(&self, role: &RoleName, election_id: Option<ElectionId>) -> Result<(), AuthorizationError> {
        let state = self.lock();
        state.allow_request(role, election_id)
    }

    /// Primary check plus role-based access to every P4 object the updates touch.
    pub fn allow_write_request(&self, request: &WriteRequest) -> Result<(), AuthorizationError> {
        let role = role_name_from(&request.role);
        let election_id = request.election_id.as_ref().map(ElectionId::from);

        let state = self.lock();
        let role_config = state.role_config(&role)?;
        for update in &request.updates {
            if let Some(entity) = &update.entity {
                check_entity_access(&role, role_config, entity)?;
            }
        }

        state.allow_request(&role, election_id)
    }

    /// Reads carry no election ID, so backups may read. Only role-based access is checked.
    pub fn allow_read_request(&self, request: &ReadRequest) -> Result<(), AuthorizationError> {
        let role = role_name_from(&request.role);

        let state = self.lock();
        let role_config = state.role_config(&role)?;
        for entity in &request.entities {
            check_entity_access(&role, role_config, entity)?;
        }

        Ok(())
    }

    /// Primary check, and the role must be allowed to push pipelines.
    pub fn allow_set_pipeline_request(
        &self,
        request: &SetForwardingPipelineConfigRequest,
    ) -> Result<(), AuthorizationError> {
        let role = role_name_from(&request.role);
        let election_id = request.election_id.as_ref().map(ElectionId::from);

        let state = self.lock();
        if let Some(config) = state.role_config(&role)? {
            if !config.can_push_pipeline {
                return Err(AuthorizationError::PipelinePushNotPermitted(role));
            }
        }

        state.allow_request(&role, election_id)
    }
}

impl ManagerState {
    /// `Ok(None)` means the role is unrestricted.
    pub(super) fn role_config(&self, role: &RoleName) -> Result<Option<&RoleConfig>, AuthorizationError> {
        match self.role_config_by_role.get(role) {
            Some(config) => Ok(config.as_ref()),
            None => Err(AuthorizationError::UnknownRole(role.clone())),
        }
    }

    fn allow_request(&self, role: &RoleName, election_id: Option<ElectionId>) -> Result<(), AuthorizationError> {
        let election_id = election_id.ok_or(AuthorizationError::MissingElectionId)?;

        let primary_election_id = self
            .election_id_past_by_role
            .get(role)
            .copied()
            .ok_or_else(|| AuthorizationError::NoPrimary(role.clone()))?;

        if election_id != primary_election_id {
            return Err(AuthorizationError::NotPrimary {
                role: role.clone(),
                election_id,
            });
        }

        self.verify_election_id_is_active(role, election_id)
    }

    // A matching election ID whose connection has since gone away must not be honored.
    fn verify_election_id_is_active(&self, role: &RoleName, election_id: ElectionId) -> Result<(), AuthorizationError> {
        let active = self
            .connections
            .iter()
            .any(|c| c.role == *role && c.election_id == Some(election_id));

        if active {
            Ok(())
        } else {
            Err(AuthorizationError::InactiveElectionId {
                role: role.clone(),
                election_id,
            })
        }
    }
}

pub(super) fn check_entity_access(
    role: &RoleName,
    role_config: Option<&RoleConfig>,
    entity: &Entity,
) -> Result<(), AuthorizationError> {
    let role_config = match role_config {
        Some(config) => config,
        None => return Ok(()),
    };

    match entity_p4_id(entity) {
        Some(p4_id) if p4_id != 0 && !role_config.allows(p4_id) => {
            Err(AuthorizationError::P4IdNotPermitted { role: role.clone(), p4_id })
        }
        _ => Ok(()),
    }
}

/// The P4 object an entity refers to. Direct resources are owned by their table. Replication
/// engine entries aren't P4 objects, so they have none.
pub(super) fn entity_p4_id(entity: &Entity) -> Option<u32> {
    match entity.entity.as_ref()? {
        entity::Entity::TableEntry(e) => Some(e.table_id),
        entity::Entity::ActionProfileMember(e) => Some(e.action_profile_id),
        entity::Entity::ActionProfileGroup(e) => Some(e.action_profile_id),
        entity::Entity::MeterEntry(e) => Some(e.meter_id),
        entity::Entity::DirectMeterEntry(e) => e.table_entry.as_ref().map(|t| t.table_id),
        entity::Entity::CounterEntry(e) => Some(e.counter_id),
        entity::Entity::DirectCounterEntry(e) => e.table_entry.as_ref().map(|t| t.table_id),
        entity::Entity::PacketReplicationEngineEntry(_) => None,
        entity::Entity::ValueSetEntry(e) => Some(e.value_set_id),
        entity::Entity::RegisterEntry(e) => Some(e.register_id),
        entity::Entity::DigestEntry(e) => Some(e.digest_id),
    }
}
