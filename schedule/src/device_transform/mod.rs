//! Migration of a whole graph to the device.
//!
//! [`DeviceTransform::apply`] runs these steps in order:
//!
//! 1. discover non-transient inputs and outputs ([`discovery`])
//! 2. clone them into device global memory ([`clone`])
//! 3. add a copy-in start state, 4. add one copy-out state after every sink ([`copies`])
//! 5. schedule top-level scopes on the device ([`reschedule`])
//! 6. classify host tasklets ([`crate::placement`])
//! 7. recurse into nested graphs ([`nested`])
//! 8. migrate transients ([`transients`])
//! 9. shadow device data touched by host tasklets ([`shadows`])
//! 10. copy device data read by control flow back to the host ([`copies`])
//! 11. simplify ([`crate::simplify`])

pub mod clone;
pub mod copies;
pub mod discovery;
pub mod nested;
pub mod reschedule;
pub mod shadows;
pub mod transients;

use snafu::ResultExt;
use stratum_device::ScheduleType;
use stratum_ir::{Node, NodeId, Sdfg, StateId, validate};

use crate::config::{CloneTable, DeviceTransformConfig};
use crate::error::{Result, ValidationSnafu};
use crate::placement::{DeviceScalars, classify_tasklets};
use crate::simplify::{RedundantStateElimination, SimplificationHook};

/// What one application of the transform did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Clone pairs of this graph, host shadows included.
    pub cloned: CloneTable,
    pub copy_in: StateId,
    pub copy_out: StateId,
    /// Top-level scopes and library/nested nodes moved to the device.
    pub rescheduled: usize,
    /// Tasklets the classifier moved to the device.
    pub device_tasklets: Vec<(StateId, NodeId)>,
    pub classifier_passes: usize,
    pub nested_applied: usize,
    pub migrated_transients: usize,
    /// Host shadows created for host tasklets.
    pub shadows: Vec<String>,
    /// States inserted to copy control-flow data back to the host.
    pub interim_states: Vec<StateId>,
    /// Changes reported by the simplification hook.
    pub simplified: usize,
}

/// Device placement transform.
#[derive(Debug, Clone, Default)]
pub struct DeviceTransform {
    config: DeviceTransformConfig,
    /// Schedule of the nested node owning the graph, when recursing.
    parent_schedule: Option<ScheduleType>,
}

impl DeviceTransform {
    pub fn new(config: DeviceTransformConfig) -> Self {
        Self { config, parent_schedule: None }
    }

    pub fn config(&self) -> &DeviceTransformConfig {
        &self.config
    }

    /// Whether the transform supports `sdfg`.
    ///
    /// Rejects consume scopes anywhere, nested graphs included, and direct
    /// edges between two top-level code nodes.
    pub fn can_apply(sdfg: &Sdfg) -> bool {
        let consume = sdfg
            .all_nodes_recursive()
            .into_iter()
            .find(|r| matches!(r.node, Node::ConsumeEntry { .. } | Node::ConsumeExit { .. }));
        if let Some(found) = consume {
            tracing::warn!(graph = %found.sdfg.name, node = %found.id, "consume scopes are not supported on the device");
            return false;
        }

        for (_, state) in sdfg.states() {
            let scopes = state.scope_dict();
            let top_level_code = |id: NodeId| scopes.get(&id).copied().flatten().is_none() && state.node(id).is_code();
            if let Some((edge, _)) = state.edges().find(|(_, e)| top_level_code(e.src) && top_level_code(e.dst)) {
                tracing::warn!(graph = %sdfg.name, state = %state.label, %edge, "top-level code nodes are connected directly");
                return false;
            }
        }
        true
    }

    /// Transforms `sdfg` in place with [`RedundantStateElimination`].
    ///
    /// # Panics
    ///
    /// When [`Self::can_apply`] rejects `sdfg`.
    pub fn apply(&self, sdfg: &mut Sdfg) -> Result<ApplyReport> {
        self.apply_with_hook(sdfg, &RedundantStateElimination)
    }

    /// Transforms `sdfg` in place, simplifying with `hook`.
    ///
    /// # Panics
    ///
    /// When [`Self::can_apply`] rejects `sdfg`.
    #[tracing::instrument(skip_all, fields(graph = %sdfg.name))]
    pub fn apply_with_hook(&self, sdfg: &mut Sdfg, hook: &dyn SimplificationHook) -> Result<ApplyReport> {
        assert!(Self::can_apply(sdfg), "device transform applied to unsupported graph {:?}", sdfg.name);

        let mut device_scalars = DeviceScalars::new();
        let report = self.run(sdfg, &mut device_scalars, hook)?;

        if self.config.validate_result {
            validate(sdfg).context(ValidationSnafu { graph: &sdfg.name })?;
        }
        Ok(report)
    }

    /// Transforms a copy of `sdfg`, leaving the original untouched.
    pub fn apply_to_copy(&self, sdfg: &Sdfg) -> Result<Sdfg> {
        let mut copy = sdfg.clone();
        self.apply(&mut copy)?;
        Ok(copy)
    }

    pub(crate) fn run(
        &self,
        sdfg: &mut Sdfg,
        device_scalars: &mut DeviceScalars,
        hook: &dyn SimplificationHook,
    ) -> Result<ApplyReport> {
        let io = discovery::discover(sdfg);
        tracing::debug!(inputs = ?io.inputs, outputs = ?io.outputs, "discovered graph interface");

        let start = sdfg.start_state();
        let sinks = sdfg.sink_states();
        let mut clones = clone::clone_io(sdfg, &io)?;

        let copy_in = copies::add_copy_in(sdfg, start, &io.inputs, &clones, &self.config.excluded_copyin)?;
        let copy_out = copies::add_copy_out(sdfg, &sinks, &io.outputs, &clones, &self.config.excluded_copyout)?;

        let rescheduled = reschedule::reschedule_top_level(sdfg);
        let classification = classify_tasklets(sdfg, device_scalars, self.parent_schedule);
        let nested_applied = nested::transform_nested(sdfg, self, &clones, device_scalars, hook)?;
        let migrated_transients = transients::migrate(sdfg, device_scalars, &self.config);
        let shadows = shadows::fix_host_tasklets(sdfg, &mut clones, &self.config.inherited_clones)?;
        let interim_states = copies::add_interim_copy_outs(sdfg, &mut clones, device_scalars)?;

        let simplified = if self.config.run_simplification { hook.simplify(sdfg) } else { 0 };

        Ok(ApplyReport {
            cloned: clones,
            copy_in,
            copy_out,
            rescheduled,
            device_tasklets: classification.marked.into_iter().collect(),
            classifier_passes: classification.passes,
            nested_applied,
            migrated_transients,
            shadows,
            interim_states,
            simplified,
        })
    }
}
