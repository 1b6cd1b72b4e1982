//! Result ingestion
//!
//! Turns stored API responses into per-(angle, dish, condition) nutrient totals:
//! - Candidate selection policies
//! - Directory walking with null-filling of missing or malformed responses

pub mod ingestor;
pub mod policy;

pub use ingestor::{ingest_all, ingest_angle, AggregatedObservation, AngleResults, IngestSummary};
pub use policy::AggregationPolicy;
