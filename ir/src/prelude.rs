//! Common imports for building and inspecting graphs.
//!
//! ```rust,ignore
//! use stratum_ir::prelude::*;
//! ```

pub use crate::data::{DataDescriptor, DataKind};
pub use crate::interstate::InterstateEdge;
pub use crate::memlet::{Memlet, Wcr};
pub use crate::node::{Node, NodeId};
pub use crate::sdfg::{Sdfg, StateId};
pub use crate::state::State;
pub use crate::subset::Subset;
pub use crate::symbolic::Expr;
pub use crate::validation::validate;

pub use stratum_device::{AllocationLifetime, ScheduleType, StorageType};
pub use stratum_dtype::ScalarDType;
