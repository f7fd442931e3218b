//! Name-or-id addressing of registry records
//!
//! Commands other than `provision` only ever look records up; `provision`
//! find-or-creates one after checking its name is free.

use crate::storage::Registry;
use eden_common::{Error, Result, ServiceInstance};

/// Look up an instance without creating anything. Absence is `None`, never a
/// blank record.
pub fn lookup(registry: &Registry, id_or_name: &str) -> Option<ServiceInstance> {
    registry.find_instance(id_or_name).cloned()
}

/// Resolve the instance a bind, unbind, update, deprovision, services,
/// credentials or rename command operates on
pub fn resolve_for_mutation(registry: &Registry, id_or_name: &str) -> Result<ServiceInstance> {
    lookup(registry, id_or_name).ok_or_else(|| Error::InstanceNotFound(id_or_name.to_string()))
}

/// Fail with `DuplicateInstanceName` when `name` already addresses an
/// instance other than `id`
pub fn ensure_name_available(registry: &Registry, id: &str, name: &str) -> Result<()> {
    match registry.find_instance(name) {
        Some(existing) if existing.id != id => {
            Err(Error::DuplicateInstanceName(name.to_string()))
        }
        _ => Ok(()),
    }
}

/// Find or create the record a provision command writes to
pub fn resolve_for_creation(registry: &mut Registry, id: &str, name: &str) -> ServiceInstance {
    registry.find_or_create_by_id_and_name(id, name)
}
