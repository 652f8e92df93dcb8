//! Walk-forward feature engineering for Formula 1 race results
//!
//! Turns a flat table of per-driver-per-race results into a feature table where
//! every row only looks at races the driver completed strictly before it.

pub mod data;
pub mod features;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use features::weighting::AggregateError;

/// Status string the provider reports for a classified finish
pub const FINISHED_STATUS: &str = "Finished";

/// Stable identifier for a driver (the three-letter code, e.g. "VER")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverCode(pub String);

impl DriverCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DriverCode {
    fn from(code: &str) -> Self {
        DriverCode(code.to_string())
    }
}

/// One driver's result in one race, validated at the ingestion boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub season: u16,
    pub round: u8,
    pub event_name: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub driver_code: DriverCode,
    pub driver_name: Option<String>,
    pub team_name: Option<String>,
    /// None = not classified
    pub final_position: Option<u32>,
    pub grid_position: Option<u32>,
    pub status: Option<String>,
    pub points: Option<f64>,
}

impl PerformanceRecord {
    /// True only for the provider's literal "Finished" status
    pub fn is_finished(&self) -> bool {
        self.status.as_deref() == Some(FINISHED_STATUS)
    }

    /// Final position with missing values replaced by `sentinel`
    pub fn position_or(&self, sentinel: f64) -> f64 {
        self.final_position.map_or(sentinel, f64::from)
    }

    /// Grid position with missing values replaced by `sentinel`
    pub fn grid_or(&self, sentinel: f64) -> f64 {
        self.grid_position.map_or(sentinel, f64::from)
    }

    /// Points scored, zero when missing, negative or not finite
    pub fn points_or_zero(&self) -> f64 {
        self.points
            .filter(|p| p.is_finite() && *p >= 0.0)
            .unwrap_or(0.0)
    }

    /// Grouping key used for circuit-specific statistics
    pub fn circuit(&self, key: CircuitKey) -> Option<&str> {
        match key {
            CircuitKey::EventName => self.event_name.as_deref(),
            CircuitKey::Location => self.location.as_deref(),
        }
    }
}

/// Which record column identifies a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKey {
    #[default]
    EventName,
    Location,
}

impl std::str::FromStr for CircuitKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "event_name" | "event" => Ok(CircuitKey::EventName),
            "location" => Ok(CircuitKey::Location),
            _ => Err(format!("Unknown circuit key: {}. Use event_name or location.", s)),
        }
    }
}

/// What to report for `avg_position_on_circuit` when the driver has never raced there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitFallback {
    /// Reuse the recency-weighted average position
    #[default]
    WeightedPosition,
    /// Plain mean over the whole history, matching the unweighted circuit average
    MeanPosition,
}

/// How to treat rows whose season or round cannot be ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnorderablePolicy {
    /// Drop the row before indexing and count it
    #[default]
    Skip,
    /// Abort the run
    Reject,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum PaddockError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input is missing required column: {0}")]
    MissingColumn(String),

    #[error("Duplicate record for season {season}, round {round}, driver {driver}")]
    DuplicateRecord {
        season: u16,
        round: u8,
        driver: DriverCode,
    },

    #[error("Round {round} out of range for season {season}, driver {driver} (must be below 100)")]
    RoundOutOfRange {
        season: u16,
        round: u32,
        driver: String,
    },

    #[error("Cannot order record on line {line}: {reason}")]
    UnorderableRecord { line: u64, reason: String },

    #[error("Record on line {line} has no driver code")]
    MissingDriver { line: u64 },

    #[error("Aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),
}

pub type Result<T> = std::result::Result<T, PaddockError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Parameters of the walk-forward engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Prior races required before a row is emitted
    pub min_history: usize,
    /// Exponent applied to the oldest race in the recency weights
    pub weight_exponent_start: f64,
    /// Exponent applied to the most recent race
    pub weight_exponent_end: f64,
    /// Races in the short form window
    pub form_window: usize,
    /// Races scanned for podium counts
    pub podium_window: usize,
    /// Position assumed for unclassified finishes and missing grid slots
    pub imputed_position: f64,
    pub circuit_key: CircuitKey,
    pub circuit_fallback: CircuitFallback,
    pub unorderable_records: UnorderablePolicy,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            min_history: 3,
            weight_exponent_start: -2.0,
            weight_exponent_end: 0.0,
            form_window: 3,
            podium_window: 5,
            imputed_position: 20.0,
            circuit_key: CircuitKey::EventName,
            circuit_fallback: CircuitFallback::WeightedPosition,
            unorderable_records: UnorderablePolicy::Skip,
        }
    }
}

impl FeatureConfig {
    /// Reject parameters that would silently produce undefined features
    pub fn validate(&self) -> Result<()> {
        if self.form_window == 0 {
            return Err(PaddockError::Config("form_window must be at least 1".to_string()));
        }
        if self.podium_window == 0 {
            return Err(PaddockError::Config(
                "podium_window must be at least 1".to_string(),
            ));
        }
        if !self.imputed_position.is_finite() {
            return Err(PaddockError::Config(format!(
                "imputed_position must be finite, got {}",
                self.imputed_position
            )));
        }
        if !self.weight_exponent_start.is_finite() || !self.weight_exponent_end.is_finite() {
            return Err(PaddockError::Config(format!(
                "weight exponents must be finite, got {}..{}",
                self.weight_exponent_start, self.weight_exponent_end
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub input_path: String,
    pub output_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            input_path: "f1_race_dataset.csv".to_string(),
            output_path: "f1_race_features.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Process drivers on the calling thread even when built with `parallel`
    pub sequential: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PaddockError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| PaddockError::Config(format!("Failed to parse config: {}", e)))?;
        config.features.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PaddockError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
