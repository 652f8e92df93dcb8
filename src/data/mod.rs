//! Record ingestion and feature export
//!
//! CSV boundary of the engine: raw per-driver-per-race results in, feature rows out.

pub mod export;
pub mod records;

pub use export::FeatureWriter;
pub use records::{LoadedRecords, RecordLoader};
