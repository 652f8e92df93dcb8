//! Driver form statistics
//!
//! Summaries of a driver's history prefix: recency-weighted averages, short
//! form windows, reliability and qualifying statistics.

use crate::features::chronology::IndexedRecord;
use crate::features::circuit::CircuitHistory;
use crate::features::weighting::{
    exponential_weights, mean, rate, sample_std, weighted_mean, AggregateError,
};
use crate::FeatureConfig;

/// Highest finishing position that counts as a podium
pub const PODIUM_POSITION: f64 = 3.0;

/// Statistics computed from a driver's races before the current one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverForm {
    pub race_experience: usize,
    pub weighted_avg_position: f64,
    pub weighted_avg_points: f64,
    /// Mean position over the form window
    pub recent_form: f64,
    /// Points summed over the form window
    pub recent_points: f64,
    /// Podiums within the podium window
    pub recent_podiums: usize,
    /// Sample std of finishing positions, NaN below two races
    pub consistency_std_position: f64,
    pub finish_rate: f64,
    pub avg_grid_position: f64,
    /// Positive = usually gains places from the grid
    pub avg_grid_to_race_gain: f64,
    pub avg_position_on_circuit: f64,
    pub circuit_experience: usize,
}

impl DriverForm {
    /// Summarize `history` (oldest first) for a race held at `circuit`
    pub fn compute(
        history: &[&IndexedRecord],
        circuit: Option<&str>,
        config: &FeatureConfig,
    ) -> Result<Self, AggregateError> {
        if config.form_window == 0 {
            return Err(AggregateError::EmptyWindow("form"));
        }
        if config.podium_window == 0 {
            return Err(AggregateError::EmptyWindow("podium"));
        }

        let sentinel = config.imputed_position;
        let n = history.len();

        let positions: Vec<f64> = history
            .iter()
            .map(|r| r.record.position_or(sentinel))
            .collect();
        let grids: Vec<f64> = history.iter().map(|r| r.record.grid_or(sentinel)).collect();
        let points: Vec<f64> = history.iter().map(|r| r.record.points_or_zero()).collect();

        let weights = exponential_weights(
            n,
            config.weight_exponent_start,
            config.weight_exponent_end,
        );
        let weighted_avg_position = weighted_mean(&positions, &weights)?;
        let weighted_avg_points = weighted_mean(&points, &weights)?;

        let form_start = n.saturating_sub(config.form_window);
        let podium_start = n.saturating_sub(config.podium_window);

        let recent_podiums = positions[podium_start..]
            .iter()
            .filter(|p| **p <= PODIUM_POSITION)
            .count();

        let finished = history.iter().filter(|r| r.record.is_finished()).count();

        let gains: Vec<f64> = grids.iter().zip(&positions).map(|(g, p)| g - p).collect();

        let mean_position = mean(&positions);
        let circuit_history =
            CircuitHistory::collect(history, circuit, config.circuit_key, sentinel);

        Ok(DriverForm {
            race_experience: n,
            weighted_avg_position,
            weighted_avg_points,
            recent_form: mean(&positions[form_start..]),
            recent_points: points[form_start..].iter().sum(),
            recent_podiums,
            consistency_std_position: sample_std(&positions),
            finish_rate: rate(finished, n),
            avg_grid_position: mean(&grids),
            avg_grid_to_race_gain: mean(&gains),
            avg_position_on_circuit: circuit_history.position_or_fallback(
                config.circuit_fallback,
                weighted_avg_position,
                mean_position,
            ),
            circuit_experience: circuit_history.races,
        })
    }
}
