//! Circuit-specific performance
//!
//! Tracks how a driver has finished at the circuit of the race being featurized.

use crate::features::chronology::IndexedRecord;
use crate::{CircuitFallback, CircuitKey};

/// A driver's prior results at one circuit
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CircuitHistory {
    /// Prior races at this circuit
    pub races: usize,
    /// Mean imputed finishing position there, None if never raced there
    pub avg_position: Option<f64>,
}

impl CircuitHistory {
    /// Collect results from `history` held at `circuit`.
    ///
    /// A missing circuit name never matches, so the result is empty.
    pub fn collect(
        history: &[&IndexedRecord],
        circuit: Option<&str>,
        key: CircuitKey,
        imputed_position: f64,
    ) -> Self {
        let circuit = match circuit {
            Some(c) => c,
            None => return CircuitHistory::default(),
        };

        let (races, total) = history
            .iter()
            .filter(|r| r.record.circuit(key) == Some(circuit))
            .fold((0usize, 0.0f64), |(n, sum), r| {
                (n + 1, sum + r.record.position_or(imputed_position))
            });

        CircuitHistory {
            races,
            avg_position: (races > 0).then(|| total / races as f64),
        }
    }

    /// Circuit average, or the configured fallback for an unseen circuit
    pub fn position_or_fallback(
        &self,
        fallback: CircuitFallback,
        weighted_avg_position: f64,
        mean_position: f64,
    ) -> f64 {
        match self.avg_position {
            Some(avg) => avg,
            None => match fallback {
                CircuitFallback::WeightedPosition => weighted_avg_position,
                CircuitFallback::MeanPosition => mean_position,
            },
        }
    }
}
