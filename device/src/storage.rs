//! Storage locations and allocation lifetimes.

use serde::{Deserialize, Serialize};

/// Memory location of a data container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter, strum::AsRefStr, strum::VariantArray)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// Decided later by code emission.
    #[default]
    Default,
    /// Host heap allocation.
    CpuHeap,
    /// Page-locked host memory, addressable from the device.
    CpuPinned,
    /// Host thread-local storage.
    CpuThreadLocal,
    /// Device global memory.
    GpuGlobal,
    /// Device memory shared by a thread block.
    GpuShared,
    /// Per-thread register storage.
    Register,
}

impl StorageType {
    /// Storage the device can address directly.
    ///
    /// Pinned host memory counts: kernels read and write it without an
    /// explicit copy.
    pub const fn is_device_resident(&self) -> bool {
        matches!(self, Self::GpuGlobal | Self::GpuShared | Self::CpuPinned)
    }

    /// Storage only the device can address.
    pub const fn is_device_only(&self) -> bool {
        matches!(self, Self::GpuGlobal | Self::GpuShared)
    }

    /// Storage the host can address directly.
    pub const fn is_host_accessible(&self) -> bool {
        matches!(self, Self::Default | Self::CpuHeap | Self::CpuPinned | Self::CpuThreadLocal)
    }
}

/// Allocation lifetime of a data container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter, strum::AsRefStr, strum::VariantArray)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AllocationLifetime {
    /// Allocated at the innermost scope that uses the container.
    #[default]
    Scope,
    /// Allocated for the duration of one state.
    State,
    /// Allocated once per graph invocation.
    Sdfg,
    /// Allocated once and kept across invocations.
    Persistent,
}
