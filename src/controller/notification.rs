use crate::controller::connection::send_stream_message;
use crate::controller::error::NotificationError;
use crate::controller::manager::{ActiveConnection, ManagerState, SdnControllerManager};
use crate::controller::role_config::RoleConfig;
use crate::controller::types::{pretty_role, RoleName};
use crate::grpc::p4::v1::{
    stream_message_response, MasterArbitrationUpdate, Role, RpcStatus, StreamMessageResponse, Uint128,
};
use tonic::Code;

impl SdnControllerManager {
    /// Delivers `response` to the primary of every role whose packet filter lets it through.
    ///
    /// Fails only if no role has a primary at all. Being filtered out by every primary is fine.
    pub fn send_stream_message_to_primary(&self, response: StreamMessageResponse) -> Result<(), NotificationError> {
        let state = self.lock();

        let mut found_primary = false;
        for connection in state.connections.iter().filter(|c| state.is_primary(c)) {
            found_primary = true;

            let role_config = state.role_config_by_role.get(&connection.role).and_then(Option::as_ref);
            if !verify_stream_message_not_filtered(role_config, &response) {
                slog::trace!(
                    self.logger,
                    "Stream message filtered for primary {} of role {}.",
                    connection.id,
                    pretty_role(&connection.role)
                );
                continue;
            }
            send_stream_message(&self.logger, connection.id, &connection.sender, response.clone());
        }

        if !found_primary {
            return Err(NotificationError::NoPrimary);
        }

        Ok(())
    }

    pub fn send_packet_in_to_primary(&self, response: StreamMessageResponse) -> Result<(), NotificationError> {
        match &response.update {
            Some(stream_message_response::Update::Packet(_)) => self.send_stream_message_to_primary(response),
            _ => Err(NotificationError::NotAPacket),
        }
    }

    /// Tells every connection of `role` where it stands after primacy moved.
    pub(super) fn inform_connections_about_primary_change(&self, state: &ManagerState, role: &RoleName) {
        slog::debug!(
            self.logger,
            "Informing all connections of role {} about a primary change.",
            pretty_role(role)
        );
        for connection in state.connections.iter().filter(|c| c.role == *role) {
            self.send_arbitration_response(state, connection);
        }
    }

    pub(super) fn send_arbitration_response(&self, state: &ManagerState, connection: &ActiveConnection) {
        let role = connection.role.as_ref().map(|name| Role {
            name: name.clone(),
            config: state
                .role_config_by_role
                .get(&connection.role)
                .and_then(Option::as_ref)
                .map(RoleConfig::pack),
        });

        let status = if state.is_primary(connection) {
            RpcStatus {
                code: Code::Ok as i32,
                message: "you are the primary connection.".to_string(),
                details: vec![],
            }
        } else if state.primary_exists(&connection.role) {
            RpcStatus {
                code: Code::AlreadyExists as i32,
                message: "you are a backup connection, and a primary connection exists.".to_string(),
                details: vec![],
            }
        } else {
            RpcStatus {
                code: Code::NotFound as i32,
                message: "you are a backup connection, and NO primary connection exists.".to_string(),
                details: vec![],
            }
        };

        let update = MasterArbitrationUpdate {
            device_id: self.device_id,
            role,
            election_id: state
                .election_id_past_by_role
                .get(&connection.role)
                .copied()
                .map(Uint128::from),
            status: Some(status),
        };

        slog::debug!(
            self.logger,
            "Arbitration response to {} ({}): {:?}",
            connection.id,
            connection.peer,
            update
        );
        send_stream_message(
            &self.logger,
            connection.id,
            &connection.sender,
            StreamMessageResponse {
                update: Some(stream_message_response::Update::Arbitration(update)),
            },
        );
    }
}

/// Whether `response` may be delivered to a primary holding `role_config`. Only packet-ins are
/// ever filtered.
pub(crate) fn verify_stream_message_not_filtered(
    role_config: Option<&RoleConfig>,
    response: &StreamMessageResponse,
) -> bool {
    let role_config = match role_config {
        Some(config) => config,
        None => return true,
    };

    match &response.update {
        Some(stream_message_response::Update::Packet(packet)) => {
            if !role_config.receives_packet_ins {
                return false;
            }
            match &role_config.packet_in_filter {
                None => true,
                Some(filter) => packet
                    .metadata
                    .iter()
                    .any(|m| m.metadata_id == filter.metadata_id && m.value == filter.value),
            }
        }
        _ => true,
    }
}
