//! Steps 3, 4 and 10: states that move data between host and device.

use indexmap::IndexSet;
use snafu::{OptionExt, ResultExt};
use stratum_device::StorageType;
use stratum_ir::{InterstateEdge, Memlet, Sdfg, StateId};

use crate::config::{ClonePair, CloneTable};
use crate::error::{MissingDescriptorSnafu, NameCollisionSnafu, Result};
use crate::placement::DeviceScalars;

/// Whole-container copy edge `src -> dst` in `state`, described by `data`.
fn add_copy(sdfg: &mut Sdfg, state: StateId, src: &str, dst: &str, data: &str) -> Result<()> {
    let desc = sdfg.array(data).context(MissingDescriptorSnafu { graph: &sdfg.name, name: data })?;
    let memlet = Memlet::from_array(data, desc);
    let state = sdfg.state_mut(state);
    let src = state.add_access(src);
    let dst = state.add_access(dst);
    state.add_nedge(src, dst, memlet);
    Ok(())
}

/// Host-side transient copy of `data` named from `prefix`, in host heap memory.
fn add_host_shadow(sdfg: &mut Sdfg, data: &str, prefix: &str) -> Result<String> {
    let desc = sdfg.array(data).context(MissingDescriptorSnafu { graph: &sdfg.name, name: data })?;
    let shadow = desc.clone().with_storage(StorageType::CpuHeap).with_transient(true);
    let base = format!("{prefix}{data}");
    sdfg.add_datadesc(&base, shadow, true).context(NameCollisionSnafu { graph: &sdfg.name, name: base })
}

/// New start state copying every cloned input to the device.
pub fn add_copy_in(
    sdfg: &mut Sdfg,
    start: Option<StateId>,
    inputs: &IndexSet<String>,
    clones: &CloneTable,
    excluded: &IndexSet<String>,
) -> Result<StateId> {
    let copy_in = sdfg.add_state(format!("{}_copyin", sdfg.name));
    if let Some(start) = start {
        sdfg.add_edge(copy_in, start, InterstateEdge::unconditional());
    }
    sdfg.set_start_state(copy_in);

    for name in inputs {
        let Some(pair) = clones.get(name) else { continue };
        if excluded.contains(name) {
            continue;
        }
        add_copy(sdfg, copy_in, name, &pair.device, name)?;
    }
    tracing::debug!(graph = %sdfg.name, state = %copy_in, "added copy-in state");
    Ok(copy_in)
}

/// One state after all of `sinks` copying every cloned output back.
pub fn add_copy_out(
    sdfg: &mut Sdfg,
    sinks: &[StateId],
    outputs: &IndexSet<String>,
    clones: &CloneTable,
    excluded: &IndexSet<String>,
) -> Result<StateId> {
    let copy_out = sdfg.add_state(format!("{}_copyout", sdfg.name));
    for &sink in sinks {
        sdfg.add_edge(sink, copy_out, InterstateEdge::unconditional());
    }

    for name in outputs {
        let Some(pair) = clones.get(name) else { continue };
        if excluded.contains(name) {
            continue;
        }
        add_copy(sdfg, copy_out, &pair.device, name, name)?;
    }
    tracing::debug!(graph = %sdfg.name, state = %copy_out, sinks = sinks.len(), "added copy-out state");
    Ok(copy_out)
}

/// Device data that transitions may read: clone table keys, device scalars
/// and anything living in device-only storage.
fn tracked_names(sdfg: &Sdfg, clones: &CloneTable, device_scalars: &DeviceScalars) -> IndexSet<String> {
    let mut tracked: IndexSet<String> =
        clones.keys().chain(device_scalars.keys()).filter(|n| sdfg.array(n).is_some()).cloned().collect();
    tracked.extend(sdfg.arrays().iter().filter(|(_, d)| d.storage.is_device_only()).map(|(n, _)| n.clone()));
    tracked
}

/// Splices a copy-back state after every state whose outgoing transitions
/// read device data, and makes those transitions read the host copies.
pub fn add_interim_copy_outs(
    sdfg: &mut Sdfg,
    clones: &mut CloneTable,
    device_scalars: &mut DeviceScalars,
) -> Result<Vec<StateId>> {
    let tracked = tracked_names(sdfg, clones, device_scalars);
    let mut added = Vec::new();

    for state in sdfg.state_ids() {
        let used: IndexSet<String> = sdfg
            .out_edges(state)
            .into_iter()
            .flat_map(|t| sdfg.transition(t).edge.free_symbols())
            .filter(|name| tracked.contains(name))
            .collect();
        if used.is_empty() {
            continue;
        }

        let label = format!("{}_icopyout", sdfg.state(state).label);
        let interim = sdfg.add_state_after(state, label);

        for name in &used {
            let (device, host) = if let Some(shadow) = device_scalars.get(name) {
                let host = match shadow {
                    Some(host) => host.clone(),
                    None => add_host_shadow(sdfg, name, "host_")?,
                };
                device_scalars.insert(name.clone(), Some(host.clone()));
                (name.clone(), host)
            } else if let Some(pair) = clones.get(name).filter(|p| p.host.is_none() && p.device != *name) {
                (pair.device.clone(), name.clone())
            } else {
                let host = match clones.get(name).and_then(|p| p.host.clone()) {
                    Some(host) => host,
                    None => {
                        let host = add_host_shadow(sdfg, name, "cpu_")?;
                        clones.insert(name.clone(), ClonePair::shadowed(host.clone(), name.clone()));
                        host
                    }
                };
                (name.clone(), host)
            };

            add_copy(sdfg, interim, &device, &host, &host)?;
            for t in sdfg.out_edges(interim) {
                sdfg.transition_mut(t).edge.rename(&device, &host);
            }
        }

        tracing::debug!(state = %sdfg.state(state).label, data = ?used, "added interim copy-out");
        added.push(interim);
    }
    Ok(added)
}
