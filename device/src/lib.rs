//! Placement vocabulary shared by the IR and the scheduling passes.
//!
//! - [`StorageType`] - where a data container lives
//! - [`ScheduleType`] - how a scope or computation is executed
//! - [`AllocationLifetime`] - how long an allocation is kept alive

pub mod schedule;
pub mod storage;


pub use schedule::ScheduleType;
pub use storage::{AllocationLifetime, StorageType};
