//! Device transform configuration.
//!
//! Typed options with a bon builder and environment variable fallbacks.

use bon::bon;
use indexmap::{IndexMap, IndexSet};

/// Host and device names of one migrated data container.
///
/// `host` is `None` while the original host container is the host side; it is
/// set once a dedicated host shadow exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonePair {
    pub host: Option<String>,
    pub device: String,
}

impl ClonePair {
    pub fn device(device: impl Into<String>) -> Self {
        Self { host: None, device: device.into() }
    }

    pub fn shadowed(host: impl Into<String>, device: impl Into<String>) -> Self {
        Self { host: Some(host.into()), device: device.into() }
    }
}

/// Original name to host/device pair.
pub type CloneTable = IndexMap<String, ClonePair>;

/// Options of [`DeviceTransform`](crate::DeviceTransform).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTransformConfig {
    /// Hoist allocations of promoted top-level transients to graph lifetime
    /// when their size only depends on constant symbols.
    pub hoist_top_level_transients: bool,
    /// Demote transients inside device scopes to registers.
    pub registerize_scoped_transients: bool,
    /// Run the simplification hook after the transform.
    pub run_simplification: bool,
    /// Validate the result and report a failure as an error.
    pub validate_result: bool,
    /// Inputs that get a device clone but no copy-in.
    pub excluded_copyin: IndexSet<String>,
    /// Outputs that get a device clone but no copy-out.
    pub excluded_copyout: IndexSet<String>,
    /// Clone pairs created by enclosing graphs.
    pub inherited_clones: CloneTable,
}

impl Default for DeviceTransformConfig {
    fn default() -> Self {
        Self {
            hoist_top_level_transients: true,
            registerize_scoped_transients: true,
            run_simplification: true,
            validate_result: true,
            excluded_copyin: IndexSet::new(),
            excluded_copyout: IndexSet::new(),
            inherited_clones: CloneTable::new(),
        }
    }
}

#[bon]
impl DeviceTransformConfig {
    /// Create a configuration with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(default = true)] hoist_top_level_transients: bool,
        #[builder(default = true)] registerize_scoped_transients: bool,
        #[builder(default = true)] run_simplification: bool,
        #[builder(default = true)] validate_result: bool,
        #[builder(default)] excluded_copyin: IndexSet<String>,
        #[builder(default)] excluded_copyout: IndexSet<String>,
        #[builder(default)] inherited_clones: CloneTable,
    ) -> Self {
        Self {
            hoist_top_level_transients,
            registerize_scoped_transients,
            run_simplification,
            validate_result,
            excluded_copyin,
            excluded_copyout,
            inherited_clones,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `STRATUM_NO_HOIST` - Keep promoted transients at their original lifetime
    /// * `STRATUM_NO_REGISTERIZE` - Keep scoped transients in their original storage
    /// * `STRATUM_NO_SIMPLIFY` - Skip the simplification hook
    /// * `STRATUM_EXCLUDE_COPYIN` - Comma-separated inputs without copy-in
    /// * `STRATUM_EXCLUDE_COPYOUT` - Comma-separated outputs without copy-out
    pub fn from_env() -> Self {
        Self {
            hoist_top_level_transients: std::env::var("STRATUM_NO_HOIST").is_err(),
            registerize_scoped_transients: std::env::var("STRATUM_NO_REGISTERIZE").is_err(),
            run_simplification: std::env::var("STRATUM_NO_SIMPLIFY").is_err(),
            excluded_copyin: std::env::var("STRATUM_EXCLUDE_COPYIN").map(|v| parse_name_list(&v)).unwrap_or_default(),
            excluded_copyout: std::env::var("STRATUM_EXCLUDE_COPYOUT").map(|v| parse_name_list(&v)).unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Splits a comma-separated name list, dropping blanks.
pub fn parse_name_list(text: &str) -> IndexSet<String> {
    text.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}
