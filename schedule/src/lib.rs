//! Device placement passes over Stratum graphs.
//!
//! The main entry point is [`DeviceTransform`], which moves a validated
//! graph onto the device: data is cloned into device memory, scopes are
//! scheduled as kernels, host computations are reconciled with the device
//! data they touch, and copies are inserted wherever host and device meet.
//!
//! # Module Organization
//!
//! - [`device_transform`] - The transform and its steps
//! - [`placement`] - Host/device classification of tasklets
//! - [`simplify`] - Post-pass cleanup hook
//! - [`config`] - Transform options
//! - [`error`] - Error types and result handling

pub mod config;
pub mod device_transform;
pub mod error;
pub mod placement;
pub mod simplify;


pub use config::{ClonePair, CloneTable, DeviceTransformConfig};
pub use device_transform::{ApplyReport, DeviceTransform};
pub use error::{Result, TransformError};
pub use placement::{Classification, DeviceScalars, ScalarClosure, classify_tasklets};
pub use simplify::{RedundantStateElimination, SimplificationHook};
