//! Classifier and transform properties over generated pipelines.

use proptest::prelude::*;
use stratum_device::StorageType;
use stratum_ir::validate;

use crate::device_transform::DeviceTransform;
use crate::placement::{DeviceScalars, check_inputs, check_outputs, classify_tasklets, host_tasklets};

use super::generators::*;

// ============================================================================
// Classification
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The fixpoint needs at most one pass per tasklet plus a quiet one, and
    /// running it again changes nothing.
    #[test]
    fn classification_terminates_and_is_stable(pipeline in arb_pipeline()) {
        let mut sdfg = pipeline.build();
        let tasklets = host_tasklets(&sdfg).len();
        let mut device_scalars = DeviceScalars::new();

        let first = classify_tasklets(&mut sdfg, &mut device_scalars, None);
        prop_assert!(first.passes <= tasklets + 1, "{} passes for {} tasklets", first.passes, tasklets);

        let known = device_scalars.clone();
        let second = classify_tasklets(&mut sdfg, &mut device_scalars, None);
        prop_assert!(second.marked.is_empty());
        prop_assert_eq!(second.passes, 1);
        prop_assert_eq!(device_scalars, known);
    }

    /// Every tasklet left on the host is host safe under the final
    /// device-scalar set.
    #[test]
    fn remaining_host_tasklets_are_host_safe(pipeline in arb_pipeline()) {
        let mut sdfg = pipeline.build();
        let mut device_scalars = DeviceScalars::new();
        classify_tasklets(&mut sdfg, &mut device_scalars, None);

        for (state_id, node) in host_tasklets(&sdfg) {
            let state = sdfg.state(state_id);
            prop_assert!(check_inputs(&sdfg, state, node, &device_scalars).host_safe);
            prop_assert!(check_outputs(&sdfg, state, node, &device_scalars).host_safe);
        }
    }
}

// ============================================================================
// Transform
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The transform accepts every generated pipeline and its result
    /// validates.
    #[test]
    fn transformed_pipelines_validate(pipeline in arb_valid_pipeline()) {
        let mut sdfg = pipeline.build();
        prop_assert!(DeviceTransform::can_apply(&sdfg));

        let report = DeviceTransform::default().apply(&mut sdfg);
        prop_assert!(report.is_ok(), "{:?}", report.err());
        prop_assert!(validate(&sdfg).is_ok());
        prop_assert!(!has_host_maps(&sdfg));
    }

    /// Every host array a stage touches gets a device clone.
    #[test]
    fn host_interface_is_cloned(pipeline in arb_valid_pipeline()) {
        let mut sdfg = pipeline.build();
        let report = DeviceTransform::default().apply(&mut sdfg).map_err(|e| TestCaseError::fail(e.to_string()))?;

        for name in pipeline.host_interface() {
            let pair = report.cloned.get(&name);
            prop_assert!(pair.is_some(), "{} has no clone", name);
            let device = &pair.unwrap().device;
            prop_assert_eq!(sdfg.array(device).map(|d| d.storage), Some(StorageType::GpuGlobal));
        }
    }

    /// Two runs on equal inputs give equal graphs.
    #[test]
    fn transform_is_deterministic(pipeline in arb_valid_pipeline()) {
        let sdfg = pipeline.build();
        let transform = DeviceTransform::default();
        let first = transform.apply_to_copy(&sdfg).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let second = transform.apply_to_copy(&sdfg).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(first, second);
    }
}
