//! Feature extraction
//!
//! Orders race records in time and turns each driver's history into
//! model-ready features.

pub mod chronology;
pub mod circuit;
pub mod form;
pub mod row;
pub mod walk_forward;
pub mod weighting;

pub use chronology::{ChronologicalIndex, TimeOrderKey};
pub use form::DriverForm;
pub use row::FeatureRow;
pub use walk_forward::{BuildSummary, FeatureTable, WalkForwardBuilder};
