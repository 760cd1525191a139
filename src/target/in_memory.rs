use crate::grpc::p4::v1::{
    entity, set_forwarding_pipeline_config_request::Action, update, Entity, FieldMatch, ForwardingPipelineConfig,
    PacketIn, PacketOut, TableEntry, Update,
};
use crate::target::{PacketInWriter, SwitchTarget, TargetError};
use prost::Message;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

// Table entries are identified by table, match fields (order-insensitive) and priority.
type TableEntryKey = (u32, Vec<u8>, i32);

/// InMemorySwitch is a target without hardware. It keeps table entries in memory, remembers the
/// packets it was asked to transmit, and can be fed packet-ins.
pub struct InMemorySwitch {
    logger: slog::Logger,
    state: Mutex<SwitchState>,
}

#[derive(Default)]
struct SwitchState {
    committed: Option<ForwardingPipelineConfig>,
    saved: Option<ForwardingPipelineConfig>,
    table_entries: BTreeMap<TableEntryKey, TableEntry>,
    transmitted: Vec<PacketOut>,
    packet_in_writer: Option<PacketInWriter>,
}

impl InMemorySwitch {
    pub fn new(logger: slog::Logger) -> Self {
        InMemorySwitch {
            logger,
            state: Mutex::new(SwitchState::default()),
        }
    }

    /// Hands `packet` to whoever registered for packet-ins. Never blocks.
    pub fn inject_packet_in(&self, packet: PacketIn) -> Result<(), TargetError> {
        let state = self.lock();
        let writer = state
            .packet_in_writer
            .as_ref()
            .ok_or(TargetError::PacketInWriterUnavailable)?;
        writer
            .try_send(packet)
            .map_err(|_| TargetError::PacketInWriterUnavailable)
    }

    /// Every packet-out accepted so far, oldest first.
    pub fn transmitted_packets(&self) -> Vec<PacketOut> {
        self.lock().transmitted.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SwitchState> {
        self.state.lock().expect("InMemorySwitch state mutex guard poison")
    }
}

#[async_trait::async_trait]
impl SwitchTarget for InMemorySwitch {
    async fn push_forwarding_pipeline_config(
        &self,
        action: Action,
        config: Option<ForwardingPipelineConfig>,
    ) -> Result<(), TargetError> {
        let mut state = self.lock();

        match action {
            Action::Unspecified => Err(TargetError::InvalidPipelineConfig(
                "Action must be specified.".to_string(),
            )),
            Action::Verify => verify_pipeline_config(config).map(|_| ()),
            Action::VerifyAndSave => {
                state.saved = Some(verify_pipeline_config(config)?);
                Ok(())
            }
            Action::Commit => {
                let saved = state.saved.take().ok_or(TargetError::NothingToCommit)?;
                state.commit(saved);
                slog::info!(self.logger, "Committed saved forwarding pipeline config.");
                Ok(())
            }
            Action::VerifyAndCommit => {
                let config = verify_pipeline_config(config)?;
                state.commit(config);
                slog::info!(self.logger, "Committed new forwarding pipeline config.");
                Ok(())
            }
            Action::ReconcileAndCommit => {
                // Forwarding state survives a reconcile.
                state.committed = Some(verify_pipeline_config(config)?);
                slog::info!(self.logger, "Reconciled forwarding pipeline config.");
                Ok(())
            }
        }
    }

    async fn get_forwarding_pipeline_config(&self) -> Result<Option<ForwardingPipelineConfig>, TargetError> {
        Ok(self.lock().committed.clone())
    }

    async fn write(&self, updates: Vec<Update>) -> Result<(), TargetError> {
        let mut state = self.lock();
        if state.committed.is_none() {
            return Err(TargetError::PipelineNotInstalled);
        }

        for proto_update in updates {
            let update_type = update::Type::from_i32(proto_update.r#type)
                .ok_or_else(|| TargetError::InvalidUpdate(format!("Unknown update type {}", proto_update.r#type)))?;

            let table_entry = match proto_update.entity.and_then(|e| e.entity) {
                Some(entity::Entity::TableEntry(table_entry)) => table_entry,
                Some(_) => return Err(TargetError::Unsupported("Writing entities other than table entries")),
                None => return Err(TargetError::InvalidUpdate("Update has no entity.".to_string())),
            };
            state.validate_table(table_entry.table_id)?;

            let key = table_entry_key(&table_entry);
            match update_type {
                update::Type::Unspecified => {
                    return Err(TargetError::InvalidUpdate("Update type must be specified.".to_string()))
                }
                update::Type::Insert => {
                    if state.table_entries.contains_key(&key) {
                        return Err(TargetError::EntryExists(table_entry.table_id));
                    }
                    state.table_entries.insert(key, table_entry);
                }
                update::Type::Modify => match state.table_entries.get_mut(&key) {
                    Some(existing) => *existing = table_entry,
                    None => return Err(TargetError::EntryNotFound(table_entry.table_id)),
                },
                update::Type::Delete => {
                    if state.table_entries.remove(&key).is_none() {
                        return Err(TargetError::EntryNotFound(table_entry.table_id));
                    }
                }
            }
        }

        Ok(())
    }

    async fn read(&self, entities: Vec<Entity>) -> Result<Vec<Entity>, TargetError> {
        let state = self.lock();

        let mut found = Vec::new();
        for requested in entities {
            let table_id = match requested.entity {
                Some(entity::Entity::TableEntry(table_entry)) => table_entry.table_id,
                Some(_) => return Err(TargetError::Unsupported("Reading entities other than table entries")),
                None => continue,
            };

            found.extend(
                state
                    .table_entries
                    .values()
                    .filter(|entry| table_id == 0 || entry.table_id == table_id)
                    .map(|entry| Entity {
                        entity: Some(entity::Entity::TableEntry(entry.clone())),
                    }),
            );
        }

        Ok(found)
    }

    async fn transmit_packet(&self, packet: PacketOut) -> Result<(), TargetError> {
        slog::trace!(self.logger, "Transmitting packet of {} bytes.", packet.payload.len());
        self.lock().transmitted.push(packet);
        Ok(())
    }

    fn register_packet_in_writer(&self, writer: PacketInWriter) {
        self.lock().packet_in_writer = Some(writer);
    }
}

impl SwitchState {
    fn commit(&mut self, config: ForwardingPipelineConfig) {
        self.committed = Some(config);
        self.table_entries.clear();
    }

    fn validate_table(&self, table_id: u32) -> Result<(), TargetError> {
        let known = self
            .committed
            .as_ref()
            .and_then(|config| config.p4info.as_ref())
            .map_or(false, |p4info| {
                p4info
                    .tables
                    .iter()
                    .any(|table| table.preamble.as_ref().map_or(false, |p| p.id == table_id))
            });

        if !known {
            return Err(TargetError::UnknownTable(table_id));
        }
        Ok(())
    }
}

fn verify_pipeline_config(config: Option<ForwardingPipelineConfig>) -> Result<ForwardingPipelineConfig, TargetError> {
    let config = config.ok_or_else(|| TargetError::InvalidPipelineConfig("Config is missing.".to_string()))?;
    if config.p4info.is_none() {
        return Err(TargetError::InvalidPipelineConfig("P4Info is missing.".to_string()));
    }
    Ok(config)
}

fn table_entry_key(table_entry: &TableEntry) -> TableEntryKey {
    let mut matches: Vec<&FieldMatch> = table_entry.r#match.iter().collect();
    matches.sort_by_key(|m| m.field_id);

    let mut encoded = Vec::new();
    for field_match in matches {
        field_match
            .encode_length_delimited(&mut encoded)
            .expect("Vec<u8> grows to fit any message");
    }

    (table_entry.table_id, encoded, table_entry.priority)
}
