//! Dataset assembly
//!
//! Joins ground-truth metadata with the aggregated observations of every angle into a
//! single wide table, the input of every analysis stage.

pub mod join;
pub mod wide;

pub use join::{assemble, wide_columns, JoinMode};
pub use wide::{WideRow, WideTable};
