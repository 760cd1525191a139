use crate::controller::connection::{ConnectionId, SdnConnection, StreamResponseSender};
use crate::controller::error::ArbitrationError;
use crate::controller::role_config::{validate_role_config, RoleConfig};
use crate::controller::types::{
    pretty_election_id, pretty_role, role_name_from, ElectionId, RoleName, SDN_CONTROLLER_ROLE,
};
use crate::grpc::p4::v1::MasterArbitrationUpdate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// SdnControllerManager arbitrates which of the connected controllers is primary for each role,
/// decides whether requests may proceed, and routes async messages to primaries.
///
/// One instance per device. Every public method takes the single state lock for its full
/// duration, so arbitration, authorization and notification are totally ordered. Nothing in here
/// blocks while holding the lock: responses are queued with `try_send()`.
pub struct SdnControllerManager {
    pub(super) logger: slog::Logger,
    pub(super) device_id: u64,
    state: Mutex<ManagerState>,
}

pub(super) struct ManagerState {
    // Few connections are expected, so a list scan is fine. Order is connection order.
    pub(super) connections: Vec<ActiveConnection>,
    // Highest election ID ever accepted as primary, per role. Never decreases, and is NOT cleared
    // when the primary goes away.
    pub(super) election_id_past_by_role: HashMap<RoleName, ElectionId>,
    // `None` value means the role is known and unrestricted.
    pub(super) role_config_by_role: HashMap<RoleName, Option<RoleConfig>>,
}

/// The manager's view of an initialized connection.
pub(super) struct ActiveConnection {
    pub(super) id: ConnectionId,
    pub(super) peer: String,
    pub(super) role: RoleName,
    // `None` means backup forever.
    pub(super) election_id: Option<ElectionId>,
    pub(super) sender: StreamResponseSender,
}

impl SdnControllerManager {
    pub fn new(logger: slog::Logger, device_id: u64) -> Self {
        let mut role_config_by_role = HashMap::new();
        role_config_by_role.insert(None, None);
        role_config_by_role.insert(Some(SDN_CONTROLLER_ROLE.to_string()), None);

        SdnControllerManager {
            logger,
            device_id,
            state: Mutex::new(ManagerState {
                connections: Vec::new(),
                election_id_past_by_role: HashMap::new(),
                role_config_by_role,
            }),
        }
    }

    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state
            .lock()
            .expect("SdnControllerManager state mutex guard poison")
    }

    /// Handles a `MasterArbitrationUpdate` received on `connection`'s stream. The first accepted
    /// update initializes the connection. Every accepted update queues arbitration responses: to
    /// the whole role if primacy changed (or the primary re-asserted itself), otherwise just to
    /// `connection`.
    ///
    /// A rejected update leaves all state untouched.
    pub fn handle_arbitration_update(
        &self,
        update: &MasterArbitrationUpdate,
        connection: &SdnConnection,
    ) -> Result<(), ArbitrationError> {
        let mut state = self.lock();

        // An unset role and a role with an empty name are both the default role.
        let (role, role_config) = match &update.role {
            Some(proto_role) => {
                let config = proto_role.config.as_ref().map(RoleConfig::unpack).transpose()?;
                (role_name_from(&proto_role.name), config)
            }
            None => (None, None),
        };
        validate_role_config(&role, role_config.as_ref(), &state.role_config_by_role)?;

        // An unset election ID means the controller wants this stream to stay backup.
        let election_id = update.election_id.as_ref().map(ElectionId::from);

        let previous_election_id = match state.position(connection.id()) {
            None => {
                if update.device_id != self.device_id {
                    return Err(ArbitrationError::UnknownDevice {
                        requested: update.device_id,
                        expected: self.device_id,
                    });
                }
                state.validate_unique_election_id(&role, election_id, connection.id())?;

                slog::info!(
                    self.logger,
                    "New SDN connection {:?} for role {} with election ID {}.",
                    connection,
                    pretty_role(&role),
                    pretty_election_id(&election_id)
                );
                state.connections.push(ActiveConnection {
                    id: connection.id(),
                    peer: connection.peer().to_string(),
                    role: role.clone(),
                    election_id,
                    sender: connection.sender().clone(),
                });
                None
            }
            Some(index) => {
                if update.device_id != self.device_id {
                    return Err(ArbitrationError::DeviceIdChanged {
                        requested: update.device_id,
                        expected: self.device_id,
                    });
                }
                let existing_role = &state.connections[index].role;
                if *existing_role != role {
                    return Err(ArbitrationError::RoleChanged {
                        from: existing_role.clone(),
                        to: role,
                    });
                }
                state.validate_unique_election_id(&role, election_id, connection.id())?;

                let previous = state.connections[index].election_id;
                slog::info!(
                    self.logger,
                    "Update SDN connection {:?} for role {}: election ID {} -> {}.",
                    connection,
                    pretty_role(&role),
                    pretty_election_id(&previous),
                    pretty_election_id(&election_id)
                );
                state.connections[index].election_id = election_id;
                previous
            }
        };

        let past = state.election_id_past_by_role.get(&role).copied();
        let was_primary = previous_election_id.is_some() && previous_election_id == past;

        match election_id {
            // `>=` so a sitting primary re-asserting its own ID still gets acknowledged. Nobody
            // else can hold that ID, uniqueness was checked above.
            Some(new) if past.map_or(true, |past| new >= past) => {
                if was_primary && past == Some(new) {
                    slog::debug!(self.logger, "Primary for role {} re-asserted.", pretty_role(&role));
                } else {
                    slog::info!(
                        self.logger,
                        "New primary connection for role {} with election ID {}.",
                        pretty_role(&role),
                        new
                    );
                }
                state.election_id_past_by_role.insert(role.clone(), new);
                state.role_config_by_role.insert(role.clone(), role_config);
                self.inform_connections_about_primary_change(&state, &role);
            }
            _ if was_primary => {
                slog::info!(
                    self.logger,
                    "No longer have a primary connection for role {}.",
                    pretty_role(&role)
                );
                self.inform_connections_about_primary_change(&state, &role);
            }
            _ => {
                if let Some(index) = state.position(connection.id()) {
                    self.send_arbitration_response(&state, &state.connections[index]);
                }
            }
        }

        Ok(())
    }

    /// Forgets `connection`. A no-op if it never got through arbitration, or was already dropped.
    /// Losing the primary is broadcast to the role, but the role's highest election ID is kept: a
    /// new primary must still come in with an ID at least that high.
    pub fn disconnect(&self, connection: &SdnConnection) {
        let mut state = self.lock();

        let index = match state.position(connection.id()) {
            Some(index) => index,
            None => return,
        };
        let removed = state.connections.remove(index);
        slog::info!(
            self.logger,
            "Dropping SDN connection {:?} for role {} with election ID {}.",
            connection,
            pretty_role(&removed.role),
            pretty_election_id(&removed.election_id)
        );

        if state.is_primary(&removed) {
            slog::info!(
                self.logger,
                "Primary connection for role {} is gone.",
                pretty_role(&removed.role)
            );
            self.inform_connections_about_primary_change(&state, &removed.role);
        }
    }

    /// Number of initialized connections, across all roles.
    pub fn active_connections(&self) -> usize {
        self.lock().connections.len()
    }

    pub fn active_connections_for_role(&self, role: &RoleName) -> usize {
        self.lock()
            .connections
            .iter()
            .filter(|c| c.role == *role)
            .count()
    }

    /// Whether `connection` currently holds the primary slot of its role.
    pub fn is_primary(&self, connection: &SdnConnection) -> bool {
        let state = self.lock();
        match state.position(connection.id()) {
            Some(index) => state.is_primary(&state.connections[index]),
            None => false,
        }
    }

    /// Highest election ID ever accepted as primary for `role`.
    pub fn primary_election_id(&self, role: &RoleName) -> Option<ElectionId> {
        self.lock().election_id_past_by_role.get(role).copied()
    }

    /// The installed policy for `role`. `None` if the role is unknown, `Some(None)` if it is
    /// unrestricted.
    pub fn role_config(&self, role: &RoleName) -> Option<Option<RoleConfig>> {
        self.lock().role_config_by_role.get(role).cloned()
    }
}

impl ManagerState {
    pub(super) fn position(&self, id: ConnectionId) -> Option<usize> {
        self.connections.iter().position(|c| c.id == id)
    }

    pub(super) fn is_primary(&self, connection: &ActiveConnection) -> bool {
        connection.election_id.is_some()
            && connection.election_id == self.election_id_past_by_role.get(&connection.role).copied()
    }

    pub(super) fn primary_exists(&self, role: &RoleName) -> bool {
        self.connections
            .iter()
            .any(|c| c.role == *role && self.is_primary(c))
    }

    /// Election IDs are unique per role among connections that set one. `requester` is skipped so
    /// a connection can re-state its own ID.
    fn validate_unique_election_id(
        &self,
        role: &RoleName,
        election_id: Option<ElectionId>,
        requester: ConnectionId,
    ) -> Result<(), ArbitrationError> {
        let election_id = match election_id {
            Some(id) => id,
            None => return Ok(()),
        };

        let in_use = self
            .connections
            .iter()
            .any(|c| c.id != requester && c.role == *role && c.election_id == Some(election_id));
        if in_use {
            return Err(ArbitrationError::ElectionIdInUse { election_id });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::test_utils::{arbitration, arbitration_with_config, test_manager, TestController, DEVICE_ID};
    use crate::controller::{ArbitrationError, ElectionId, RoleConfig};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;
    use tonic::Code;

    fn role(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    #[test]
    fn first_backup_learns_there_is_no_primary() {
        let manager = test_manager();
        let mut a = TestController::new("a");

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, Some("r"), None), &a.connection)
            .unwrap();

        let response = a.next_arbitration();
        assert_eq!(Code::NotFound as i32, response.status.unwrap().code);
        assert_eq!(None, response.election_id);
        assert_eq!("r", response.role.unwrap().name);
        assert_eq!(1, manager.active_connections());
    }

    #[test]
    fn primary_backup_lifecycle() {
        let manager = test_manager();
        let mut a = TestController::new("a");
        let mut b = TestController::new("b");
        let mut c = TestController::new("c");
        let mut d = TestController::new("d");

        // A joins as backup.
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, Some("r"), None), &a.connection)
            .unwrap();
        assert_eq!(Code::NotFound as i32, a.next_arbitration().status.unwrap().code);

        // B becomes primary; everyone in the role hears about it.
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, Some("r"), Some(5)), &b.connection)
            .unwrap();
        assert_eq!(Some(ElectionId::new(5)), manager.primary_election_id(&role("r")));
        assert_eq!(Code::AlreadyExists as i32, a.next_arbitration().status.unwrap().code);
        let b_response = b.next_arbitration();
        assert_eq!(Code::Ok as i32, b_response.status.unwrap().code);
        assert_eq!(5, b_response.election_id.unwrap().low);
        assert!(manager.is_primary(&b.connection));

        // C collides with B.
        let err = manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, Some("r"), Some(5)), &c.connection)
            .unwrap_err();
        assert_eq!(Code::InvalidArgument, err.code());
        c.assert_no_messages();
        assert_eq!(2, manager.active_connections());

        // B leaves; the primary ID is kept.
        manager.disconnect(&b.connection);
        assert_eq!(Code::NotFound as i32, a.next_arbitration().status.unwrap().code);
        assert_eq!(Some(ElectionId::new(5)), manager.primary_election_id(&role("r")));

        // D takes over with a higher ID.
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, Some("r"), Some(7)), &d.connection)
            .unwrap();
        assert_eq!(Some(ElectionId::new(7)), manager.primary_election_id(&role("r")));
        assert_eq!(Code::Ok as i32, d.next_arbitration().status.unwrap().code);
        assert_eq!(Code::AlreadyExists as i32, a.next_arbitration().status.unwrap().code);
    }

    #[test]
    fn old_primary_id_can_be_reclaimed_after_disconnect() {
        let manager = test_manager();
        let b = TestController::new("b");
        let mut c = TestController::new("c");

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(5)), &b.connection)
            .unwrap();
        manager.disconnect(&b.connection);

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(5)), &c.connection)
            .unwrap();
        assert!(manager.is_primary(&c.connection));
        assert_eq!(Code::Ok as i32, c.next_arbitration().status.unwrap().code);
    }

    #[test]
    fn lower_election_id_stays_backup() {
        let manager = test_manager();
        let mut a = TestController::new("a");
        let mut b = TestController::new("b");

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(10)), &a.connection)
            .unwrap();
        a.next_arbitration();

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(3)), &b.connection)
            .unwrap();
        assert_eq!(Code::AlreadyExists as i32, b.next_arbitration().status.unwrap().code);
        // An ordinary backup update only answers the sender.
        a.assert_no_messages();
        assert!(manager.is_primary(&a.connection));
        assert!(!manager.is_primary(&b.connection));
    }

    #[test]
    fn primary_refresh_is_acknowledged_to_the_role() {
        let manager = test_manager();
        let mut a = TestController::new("a");
        let mut b = TestController::new("b");
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(1)), &a.connection)
            .unwrap();
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(9)), &b.connection)
            .unwrap();
        a.drain();
        b.drain();

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(9)), &b.connection)
            .unwrap();

        assert_eq!(Code::Ok as i32, b.next_arbitration().status.unwrap().code);
        assert_eq!(Code::AlreadyExists as i32, a.next_arbitration().status.unwrap().code);
    }

    #[test]
    fn primary_stepping_down_is_broadcast() {
        let manager = test_manager();
        let mut a = TestController::new("a");
        let mut b = TestController::new("b");
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, None), &a.connection)
            .unwrap();
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(9)), &b.connection)
            .unwrap();
        a.drain();
        b.drain();

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(2)), &b.connection)
            .unwrap();

        assert_eq!(Code::NotFound as i32, a.next_arbitration().status.unwrap().code);
        assert_eq!(Code::NotFound as i32, b.next_arbitration().status.unwrap().code);
        assert_eq!(Some(ElectionId::new(9)), manager.primary_election_id(&None));
        assert!(!manager.is_primary(&b.connection));
    }

    #[test]
    fn no_election_id_never_becomes_primary() {
        let manager = test_manager();
        let mut a = TestController::new("a");

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, None), &a.connection)
            .unwrap();

        assert!(!manager.is_primary(&a.connection));
        assert_eq!(None, manager.primary_election_id(&None));
        assert_eq!(Code::NotFound as i32, a.next_arbitration().status.unwrap().code);
    }

    #[test]
    fn election_id_zero_is_a_real_election_id() {
        let manager = test_manager();
        let mut a = TestController::new("a");

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(0)), &a.connection)
            .unwrap();

        assert!(manager.is_primary(&a.connection));
        assert_eq!(Code::Ok as i32, a.next_arbitration().status.unwrap().code);
    }

    #[test]
    fn roles_arbitrate_independently() {
        let manager = test_manager();
        let mut a = TestController::new("a");
        let mut b = TestController::new("b");
        let mut root = TestController::new("root");

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, Some("r1"), Some(5)), &a.connection)
            .unwrap();
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, Some("r2"), Some(5)), &b.connection)
            .unwrap();
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(5)), &root.connection)
            .unwrap();

        assert!(manager.is_primary(&a.connection));
        assert!(manager.is_primary(&b.connection));
        assert!(manager.is_primary(&root.connection));
        assert_eq!(Code::Ok as i32, a.next_arbitration().status.unwrap().code);
        a.assert_no_messages();
        b.next_arbitration();
        root.next_arbitration();
        assert_eq!(1, manager.active_connections_for_role(&role("r1")));
        assert_eq!(1, manager.active_connections_for_role(&None));
    }

    #[test]
    fn empty_role_name_is_default_role() {
        let manager = test_manager();
        let a = TestController::new("a");
        let b = TestController::new("b");

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, Some(""), Some(1)), &a.connection)
            .unwrap();
        let err = manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(1)), &b.connection)
            .unwrap_err();

        assert!(matches!(err, ArbitrationError::ElectionIdInUse { .. }));
        assert_eq!(1, manager.active_connections_for_role(&None));
    }

    #[test]
    fn wrong_device_id() {
        let manager = test_manager();
        let mut a = TestController::new("a");

        let err = manager
            .handle_arbitration_update(&arbitration(DEVICE_ID + 1, None, Some(1)), &a.connection)
            .unwrap_err();
        assert_eq!(Code::NotFound, err.code());
        assert_eq!(0, manager.active_connections());
        a.assert_no_messages();

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(1)), &a.connection)
            .unwrap();
        let err = manager
            .handle_arbitration_update(&arbitration(DEVICE_ID + 1, None, Some(1)), &a.connection)
            .unwrap_err();
        assert_eq!(Code::FailedPrecondition, err.code());
    }

    #[test]
    fn role_cannot_change_on_a_stream() {
        let manager = test_manager();
        let a = TestController::new("a");

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, Some("r1"), Some(1)), &a.connection)
            .unwrap();
        let err = manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, Some("r2"), Some(1)), &a.connection)
            .unwrap_err();

        assert_eq!(Code::FailedPrecondition, err.code());
        assert_eq!(1, manager.active_connections_for_role(&role("r1")));
        assert_eq!(0, manager.active_connections_for_role(&role("r2")));
    }

    #[test]
    fn collision_on_update_leaves_connection_untouched() {
        let manager = test_manager();
        let a = TestController::new("a");
        let b = TestController::new("b");

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(1)), &a.connection)
            .unwrap();
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(2)), &b.connection)
            .unwrap();

        let err = manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(2)), &a.connection)
            .unwrap_err();

        assert!(matches!(err, ArbitrationError::ElectionIdInUse { .. }));
        assert!(manager.is_primary(&b.connection));
        // A can still go higher.
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(3)), &a.connection)
            .unwrap();
        assert!(manager.is_primary(&a.connection));
    }

    #[test]
    fn overlapping_role_config_is_rejected_and_prior_config_kept() {
        let manager = test_manager();
        let a = TestController::new("a");
        let b = TestController::new("b");
        let r1_config = RoleConfig {
            exclusive_p4_ids: vec![10].into_iter().collect(),
            ..RoleConfig::default()
        };
        manager
            .handle_arbitration_update(
                &arbitration_with_config(DEVICE_ID, "r1", Some(1), &r1_config),
                &a.connection,
            )
            .unwrap();

        let r2_config = RoleConfig {
            shared_p4_ids: vec![10].into_iter().collect(),
            ..RoleConfig::default()
        };
        let err = manager
            .handle_arbitration_update(
                &arbitration_with_config(DEVICE_ID, "r2", Some(1), &r2_config),
                &b.connection,
            )
            .unwrap_err();

        assert!(matches!(err, ArbitrationError::RoleConfigConflict { p4_id: 10, .. }));
        assert_eq!(0, manager.active_connections_for_role(&role("r2")));
        assert_eq!(Some(Some(r1_config)), manager.role_config(&role("r1")));
    }

    #[test]
    fn default_role_rejects_role_config() {
        let manager = test_manager();
        let a = TestController::new("a");

        let err = manager
            .handle_arbitration_update(
                &arbitration_with_config(DEVICE_ID, "", Some(1), &RoleConfig::default()),
                &a.connection,
            )
            .unwrap_err();

        assert_eq!(ArbitrationError::RoleConfigOnDefaultRole, err);
    }

    #[test]
    fn arbitration_response_echoes_role_config() {
        let manager = test_manager();
        let mut a = TestController::new("a");
        let config = RoleConfig {
            can_push_pipeline: true,
            exclusive_p4_ids: vec![3].into_iter().collect(),
            ..RoleConfig::default()
        };

        manager
            .handle_arbitration_update(&arbitration_with_config(DEVICE_ID, "r1", Some(1), &config), &a.connection)
            .unwrap();

        let response = a.next_arbitration();
        let packed = response.role.unwrap().config.unwrap();
        assert_eq!(config, RoleConfig::unpack(&packed).unwrap());
        assert_eq!(DEVICE_ID, response.device_id);
    }

    #[test]
    fn backup_config_is_not_installed() {
        let manager = test_manager();
        let a = TestController::new("a");
        let b = TestController::new("b");
        let primary_config = RoleConfig {
            exclusive_p4_ids: vec![1].into_iter().collect(),
            ..RoleConfig::default()
        };
        let backup_config = RoleConfig {
            exclusive_p4_ids: vec![2].into_iter().collect(),
            ..RoleConfig::default()
        };

        manager
            .handle_arbitration_update(
                &arbitration_with_config(DEVICE_ID, "r1", Some(5), &primary_config),
                &a.connection,
            )
            .unwrap();
        manager
            .handle_arbitration_update(
                &arbitration_with_config(DEVICE_ID, "r1", Some(1), &backup_config),
                &b.connection,
            )
            .unwrap();

        assert_eq!(Some(Some(primary_config)), manager.role_config(&role("r1")));
    }

    #[test]
    fn disconnect_is_idempotent_and_ignores_uninitialized() {
        let manager = test_manager();
        let mut a = TestController::new("a");
        let mut b = TestController::new("b");
        let never_arbitrated = TestController::new("c");

        manager.disconnect(&never_arbitrated.connection);

        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, None), &a.connection)
            .unwrap();
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(1)), &b.connection)
            .unwrap();
        a.drain();

        manager.disconnect(&b.connection);
        manager.disconnect(&b.connection);

        assert_eq!(Code::NotFound as i32, a.next_arbitration().status.unwrap().code);
        a.assert_no_messages();
        assert_eq!(1, manager.active_connections());
    }

    #[test]
    fn backup_disconnect_is_not_broadcast() {
        let manager = test_manager();
        let mut a = TestController::new("a");
        let b = TestController::new("b");
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(4)), &a.connection)
            .unwrap();
        manager
            .handle_arbitration_update(&arbitration(DEVICE_ID, None, Some(1)), &b.connection)
            .unwrap();
        a.drain();

        manager.disconnect(&b.connection);

        a.assert_no_messages();
        assert!(manager.is_primary(&a.connection));
    }

    // Throws random arbitration/disconnect traffic at the manager and checks the invariants that
    // must hold after every step.
    #[test]
    fn random_traffic_keeps_arbitration_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let manager = test_manager();
        let roles = [None, role("r1"), role("r2")];
        let mut controllers: Vec<TestController> = (0..8).map(|i| TestController::new(&format!("c{}", i))).collect();
        // Role each controller was accepted with.
        let mut accepted_role: HashMap<usize, Option<String>> = HashMap::new();
        let mut past_by_role: HashMap<Option<String>, ElectionId> = HashMap::new();

        for _ in 0..2000 {
            let i = rng.gen_range(0..controllers.len());
            if rng.gen_bool(0.15) {
                manager.disconnect(&controllers[i].connection);
                accepted_role.remove(&i);
            } else {
                let role = accepted_role
                    .get(&i)
                    .cloned()
                    .unwrap_or_else(|| roles[rng.gen_range(0..roles.len())].clone());
                let election_id = if rng.gen_bool(0.2) {
                    None
                } else {
                    Some(rng.gen_range(0..12u128))
                };
                let update = arbitration(DEVICE_ID, role.as_deref(), election_id);
                if manager.handle_arbitration_update(&update, &controllers[i].connection).is_ok() {
                    accepted_role.insert(i, role);
                }
            }

            for role in roles.iter() {
                let primaries = accepted_role
                    .iter()
                    .filter(|(_, r)| *r == role)
                    .filter(|(c, _)| manager.is_primary(&controllers[**c].connection))
                    .count();
                assert!(primaries <= 1, "Role {:?} has {} primaries", role, primaries);

                if let Some(past) = manager.primary_election_id(role) {
                    if let Some(previous) = past_by_role.insert(role.clone(), past) {
                        assert!(past >= previous, "Election ID went backwards for {:?}", role);
                    }
                }
            }
            assert_eq!(accepted_role.len(), manager.active_connections());

            for controller in controllers.iter_mut() {
                controller.drain();
            }
        }
    }
}
