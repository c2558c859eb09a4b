//! Step 8: storage of transients left on the host.

use stratum_device::{AllocationLifetime, StorageType};
use stratum_ir::Sdfg;

use super::discovery::dynamic_range_targets;
use crate::config::DeviceTransformConfig;
use crate::placement::DeviceScalars;

/// Promotes top-level transients to device global memory and demotes
/// transients inside scopes to registers. Returns the number of descriptor
/// updates.
pub fn migrate(sdfg: &mut Sdfg, device_scalars: &DeviceScalars, config: &DeviceTransformConfig) -> usize {
    let constant = sdfg.constant_symbols();

    // (data, top level) per transient access node, outside dynamic ranges.
    let mut accesses = Vec::new();
    for (_, state) in sdfg.states() {
        let scopes = state.scope_dict();
        for (id, data) in state.data_nodes() {
            if !sdfg.array(data).is_some_and(|d| d.transient) {
                continue;
            }
            if !dynamic_range_targets(state, id).is_empty() {
                continue;
            }
            accesses.push((data.to_string(), scopes.get(&id).copied().flatten().is_none()));
        }
    }

    let mut updated = 0;
    for (name, top_level) in accesses {
        let Some(desc) = sdfg.array_mut(&name) else { continue };
        if desc.storage.is_device_resident() {
            continue;
        }

        if top_level {
            if desc.is_scalar() && !device_scalars.contains_key(&name) {
                continue;
            }
            desc.storage = StorageType::GpuGlobal;
            let hoist = config.hoist_top_level_transients
                && !desc.is_stream()
                && desc.free_symbols().iter().all(|s| constant.contains(s));
            if hoist {
                desc.lifetime = AllocationLifetime::Sdfg;
            }
            tracing::trace!(data = %name, hoist, "promoted transient to device");
            updated += 1;
        } else if config.registerize_scoped_transients && desc.storage != StorageType::Register {
            desc.storage = StorageType::Register;
            tracing::trace!(data = %name, "demoted scoped transient to register");
            updated += 1;
        }
    }
    tracing::debug!(graph = %sdfg.name, updated, "migrated transients");
    updated
}
