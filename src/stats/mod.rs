//! Statistics
//!
//! Descriptive statistics, reference distributions and the significance tests used to
//! compare conditions.

pub mod descriptive;
pub mod distribution;
pub mod hypothesis;

pub use descriptive::{mean, median};
pub use hypothesis::{one_sample_t_test, wilcoxon_signed_rank, SignedRankResult, TTestResult};
