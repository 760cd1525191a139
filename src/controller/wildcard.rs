use crate::controller::error::AuthorizationError;
use crate::controller::manager::SdnControllerManager;
use crate::controller::types::role_name_from;
use crate::grpc::p4::config::v1::{
    ActionProfile, Counter, Digest, DirectCounter, DirectMeter, Meter, P4Info, Preamble, Register, Table, ValueSet,
};
use crate::grpc::p4::v1::{entity, Entity, ReadRequest, TableEntry};

trait Catalogued {
    fn preamble(&self) -> Option<&Preamble>;
}

macro_rules! impl_catalogued {
    ($($t:ty),*) => {
        $(impl Catalogued for $t {
            fn preamble(&self) -> Option<&Preamble> {
                self.preamble.as_ref()
            }
        })*
    };
}

impl_catalogued!(Table, ActionProfile, Counter, Meter, ValueSet, Register, Digest);

fn catalog_ids<T: Catalogued>(catalog: &[T]) -> Vec<u32> {
    catalog
        .iter()
        .filter_map(|item| item.preamble())
        .map(|preamble| preamble.id)
        .filter(|id| *id != 0)
        .collect()
}

fn direct_counter_table_ids(catalog: &[DirectCounter]) -> Vec<u32> {
    catalog.iter().map(|c| c.direct_table_id).filter(|id| *id != 0).collect()
}

fn direct_meter_table_ids(catalog: &[DirectMeter]) -> Vec<u32> {
    catalog.iter().map(|m| m.direct_table_id).filter(|id| *id != 0).collect()
}

fn is_wildcard_table(table_entry: &Option<TableEntry>) -> bool {
    table_entry.as_ref().map_or(true, |t| t.table_id == 0)
}

impl SdnControllerManager {
    /// Replaces every wildcard entity (object ID 0) with one concrete entity per object of that
    /// kind in `p4info` that the request's role may read. Objects the role can't access are
    /// silently left out. Concrete entities, and kinds that can't be enumerated, pass through.
    pub fn expand_wildcards_in_read_request(
        &self,
        request: &ReadRequest,
        p4info: &P4Info,
    ) -> Result<ReadRequest, AuthorizationError> {
        let role = role_name_from(&request.role);

        let state = self.lock();
        let role_config = state.role_config(&role)?;
        let allowed = |id: &u32| role_config.map_or(true, |config| config.allows(*id));

        let mut entities = Vec::with_capacity(request.entities.len());
        for requested in &request.entities {
            let kind = match &requested.entity {
                Some(kind) => kind,
                None => {
                    entities.push(requested.clone());
                    continue;
                }
            };

            let expanded: Option<Vec<entity::Entity>> = match kind {
                entity::Entity::TableEntry(e) if e.table_id == 0 => Some(
                    catalog_ids(&p4info.tables)
                        .into_iter()
                        .filter(allowed)
                        .map(|table_id| {
                            let mut e = e.clone();
                            e.table_id = table_id;
                            entity::Entity::TableEntry(e)
                        })
                        .collect(),
                ),
                entity::Entity::ActionProfileMember(e) if e.action_profile_id == 0 => Some(
                    catalog_ids(&p4info.action_profiles)
                        .into_iter()
                        .filter(allowed)
                        .map(|action_profile_id| {
                            let mut e = e.clone();
                            e.action_profile_id = action_profile_id;
                            entity::Entity::ActionProfileMember(e)
                        })
                        .collect(),
                ),
                entity::Entity::ActionProfileGroup(e) if e.action_profile_id == 0 => Some(
                    catalog_ids(&p4info.action_profiles)
                        .into_iter()
                        .filter(allowed)
                        .map(|action_profile_id| {
                            let mut e = e.clone();
                            e.action_profile_id = action_profile_id;
                            entity::Entity::ActionProfileGroup(e)
                        })
                        .collect(),
                ),
                entity::Entity::CounterEntry(e) if e.counter_id == 0 => Some(
                    catalog_ids(&p4info.counters)
                        .into_iter()
                        .filter(allowed)
                        .map(|counter_id| {
                            let mut e = e.clone();
                            e.counter_id = counter_id;
                            entity::Entity::CounterEntry(e)
                        })
                        .collect(),
                ),
                entity::Entity::DirectCounterEntry(e) if is_wildcard_table(&e.table_entry) => Some(
                    direct_counter_table_ids(&p4info.direct_counters)
                        .into_iter()
                        .filter(allowed)
                        .map(|table_id| {
                            let mut e = e.clone();
                            e.table_entry.get_or_insert_with(TableEntry::default).table_id = table_id;
                            entity::Entity::DirectCounterEntry(e)
                        })
                        .collect(),
                ),
                entity::Entity::MeterEntry(e) if e.meter_id == 0 => Some(
                    catalog_ids(&p4info.meters)
                        .into_iter()
                        .filter(allowed)
                        .map(|meter_id| {
                            let mut e = e.clone();
                            e.meter_id = meter_id;
                            entity::Entity::MeterEntry(e)
                        })
                        .collect(),
                ),
                entity::Entity::DirectMeterEntry(e) if is_wildcard_table(&e.table_entry) => Some(
                    direct_meter_table_ids(&p4info.direct_meters)
                        .into_iter()
                        .filter(allowed)
                        .map(|table_id| {
                            let mut e = e.clone();
                            e.table_entry.get_or_insert_with(TableEntry::default).table_id = table_id;
                            entity::Entity::DirectMeterEntry(e)
                        })
                        .collect(),
                ),
                entity::Entity::ValueSetEntry(e) if e.value_set_id == 0 => Some(
                    catalog_ids(&p4info.value_sets)
                        .into_iter()
                        .filter(allowed)
                        .map(|value_set_id| {
                            let mut e = e.clone();
                            e.value_set_id = value_set_id;
                            entity::Entity::ValueSetEntry(e)
                        })
                        .collect(),
                ),
                entity::Entity::RegisterEntry(e) if e.register_id == 0 => Some(
                    catalog_ids(&p4info.registers)
                        .into_iter()
                        .filter(allowed)
                        .map(|register_id| {
                            let mut e = e.clone();
                            e.register_id = register_id;
                            entity::Entity::RegisterEntry(e)
                        })
                        .collect(),
                ),
                entity::Entity::DigestEntry(e) if e.digest_id == 0 => Some(
                    catalog_ids(&p4info.digests)
                        .into_iter()
                        .filter(allowed)
                        .map(|digest_id| entity::Entity::DigestEntry(crate::grpc::p4::v1::DigestEntry { digest_id }))
                        .collect(),
                ),
                _ => None,
            };

            match expanded {
                Some(kinds) => entities.extend(kinds.into_iter().map(|kind| Entity { entity: Some(kind) })),
                None => entities.push(requested.clone()),
            }
        }

        Ok(ReadRequest {
            device_id: request.device_id,
            role: request.role.clone(),
            entities,
        })
    }
}
