//! Split a flat file of fixed-width records into a fixed number of parts.
//!
//! Non-final parts hold a whole number of records; the last part takes
//! whatever remains. Concatenating the parts in index order reproduces the
//! input byte for byte, in both sequential and parallel mode.

pub mod core;

pub use crate::core::engine::{split, Splitter};
pub use crate::core::error::{Result, SplitError};
pub use crate::core::events::SplitEvent;
pub use crate::core::model::{ChunkLen, ChunkOutput, ChunkRange, SplitConfig, SplitPlan, SplitReport};
pub use crate::core::planner::{plan_chunks, plan_ranges};
