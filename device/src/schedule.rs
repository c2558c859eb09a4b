//! Execution schedules of scopes and computations.

use serde::{Deserialize, Serialize};

/// Execution schedule of a scope, tasklet, library node or nested graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter, strum::AsRefStr, strum::VariantArray)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    /// Inherit the schedule of the enclosing scope.
    #[default]
    Default,
    /// Sequential host loop.
    Sequential,
    /// Host loop split across threads.
    CpuMulticore,
    /// Host region executed once per thread; the scope carries exactly one range.
    CpuMulticoreSingleton,
    /// Device kernel launch; the scope's range becomes the launch grid.
    GpuDevice,
    /// Device execution with the launch shape chosen by code emission.
    GpuDefault,
    /// Thread-block level scope inside a device kernel.
    GpuThreadBlock,
    /// Fully unrolled loop.
    Unrolled,
}

impl ScheduleType {
    /// Schedules that run on the accelerator.
    pub const fn is_device(&self) -> bool {
        matches!(self, Self::GpuDevice | Self::GpuDefault | Self::GpuThreadBlock)
    }

    /// Schedules that open a device kernel.
    ///
    /// Everything nested inside such a scope already runs on the device.
    pub const fn is_kernel(&self) -> bool {
        matches!(self, Self::GpuDevice)
    }

    /// Schedules a consume scope may carry.
    pub const fn supports_consume(&self) -> bool {
        matches!(self, Self::Default | Self::Sequential | Self::CpuMulticore)
    }
}
