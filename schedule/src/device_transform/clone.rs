//! Step 2: device clones of host inputs and outputs.

use snafu::{OptionExt, ResultExt};
use stratum_device::StorageType;
use stratum_ir::Sdfg;

use super::discovery::Discovered;
use crate::config::{ClonePair, CloneTable};
use crate::error::{MissingDescriptorSnafu, NameCollisionSnafu, Result};

/// Registers a `gpu_<name>` transient in device global memory for every
/// discovered array the device cannot already address, then points all states
/// at the clones. Scalars stay on the host.
pub fn clone_io(sdfg: &mut Sdfg, io: &Discovered) -> Result<CloneTable> {
    let mut clones = CloneTable::new();

    for name in io.inputs.iter().chain(&io.outputs) {
        if clones.contains_key(name) {
            continue;
        }
        let desc = sdfg.array(name).context(MissingDescriptorSnafu { graph: &sdfg.name, name })?;
        if desc.is_scalar() || desc.storage.is_device_resident() {
            continue;
        }

        let clone = desc.clone().with_storage(StorageType::GpuGlobal).with_transient(true);
        let base = format!("gpu_{name}");
        let device =
            sdfg.add_datadesc(&base, clone, true).context(NameCollisionSnafu { graph: &sdfg.name, name: base })?;
        clones.insert(name.clone(), ClonePair::device(device));
    }

    for (name, pair) in &clones {
        sdfg.rename_data(name, &pair.device);
    }
    tracing::debug!(graph = %sdfg.name, cloned = clones.len(), "created device clones");
    Ok(clones)
}
