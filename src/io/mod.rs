//! File I/O modules
//!
//! Ground-truth metadata, API response documents and their at-most-once store,
//! and CSV cell encoding shared by every output table.

pub mod detection;
pub mod metadata;
pub mod result_store;
pub mod tables;
