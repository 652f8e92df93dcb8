//! Walk-forward feature construction
//!
//! For every driver, walks their timeline in race order and builds one row per
//! race from the races strictly before it. Drivers are independent, so timelines
//! are processed on the rayon pool when the `parallel` feature is enabled.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use std::collections::BTreeMap;

use crate::features::chronology::{ChronologicalIndex, EntityTimeline, TimeOrderKey};
use crate::features::form::DriverForm;
use crate::features::row::FeatureRow;
use crate::FeatureConfig;

/// Accounting for one build, merged from per-driver counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildSummary {
    /// Records that entered the walk
    pub records_indexed: usize,
    pub rows_emitted: usize,
    /// Races skipped because the driver had too few prior races
    pub insufficient_history: usize,
    /// Races whose aggregates could not be computed
    pub failed_rows: usize,
    /// Input rows dropped before indexing
    pub unorderable_records: usize,
    pub drivers_processed: usize,
    pub rows_per_season: BTreeMap<u16, usize>,
    pub skipped_per_season: BTreeMap<u16, usize>,
}

impl BuildSummary {
    /// Fold another partial summary into this one
    pub fn merge(&mut self, other: BuildSummary) {
        self.records_indexed += other.records_indexed;
        self.rows_emitted += other.rows_emitted;
        self.insufficient_history += other.insufficient_history;
        self.failed_rows += other.failed_rows;
        self.unorderable_records += other.unorderable_records;
        self.drivers_processed += other.drivers_processed;
        for (season, count) in other.rows_per_season {
            *self.rows_per_season.entry(season).or_default() += count;
        }
        for (season, count) in other.skipped_per_season {
            *self.skipped_per_season.entry(season).or_default() += count;
        }
    }

    /// Every indexed record is either emitted, skipped or failed
    pub fn is_balanced(&self) -> bool {
        self.rows_emitted + self.insufficient_history + self.failed_rows == self.records_indexed
    }
}

/// Result of a build: rows sorted by race then driver, plus accounting
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    pub summary: BuildSummary,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rows and counters produced by a single driver's walk
struct TimelineOutput {
    rows: Vec<(TimeOrderKey, FeatureRow)>,
    summary: BuildSummary,
}

/// Builds feature rows from an indexed record table
#[derive(Debug, Clone, Default)]
pub struct WalkForwardBuilder {
    config: FeatureConfig,
    force_sequential: bool,
}

impl WalkForwardBuilder {
    pub fn new(config: FeatureConfig) -> Self {
        WalkForwardBuilder {
            config,
            force_sequential: false,
        }
    }

    /// Process drivers on the calling thread even when built with `parallel`
    pub fn sequential(mut self, force_sequential: bool) -> Self {
        self.force_sequential = force_sequential;
        self
    }

    /// Build the feature table for every driver in `index`
    pub fn build(&self, index: &ChronologicalIndex) -> FeatureTable {
        let timelines = index.timelines();
        log::info!(
            "Building features for {} drivers over {} races (min history {})",
            timelines.len(),
            index.race_count(),
            self.config.min_history
        );

        let outputs = self.map_timelines(&timelines);

        let mut summary = BuildSummary::default();
        let mut keyed_rows = Vec::with_capacity(index.len());
        for output in outputs {
            keyed_rows.extend(output.rows);
            summary.merge(output.summary);
        }

        keyed_rows.sort_by(|(ka, ra), (kb, rb)| {
            ka.cmp(kb)
                .then_with(|| ra.driver_code.cmp(&rb.driver_code))
        });
        let rows: Vec<FeatureRow> = keyed_rows.into_iter().map(|(_, row)| row).collect();

        log::info!(
            "Generated {} rows ({} skipped for insufficient history, {} failed)",
            summary.rows_emitted,
            summary.insufficient_history,
            summary.failed_rows
        );
        for (season, count) in &summary.rows_per_season {
            log::debug!("  {}: {} rows", season, count);
        }

        FeatureTable { rows, summary }
    }

    fn map_timelines(&self, timelines: &[EntityTimeline<'_>]) -> Vec<TimelineOutput> {
        #[cfg(feature = "parallel")]
        {
            if self.force_sequential {
                timelines.iter().map(|t| self.walk(t)).collect()
            } else {
                timelines.par_iter().map(|t| self.walk(t)).collect()
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = self.force_sequential;
            timelines.iter().map(|t| self.walk(t)).collect()
        }
    }

    /// Walk one driver's timeline, using only `races[..idx]` for race `idx`
    fn walk(&self, timeline: &EntityTimeline<'_>) -> TimelineOutput {
        let mut rows = Vec::new();
        let mut summary = BuildSummary {
            records_indexed: timeline.races.len(),
            drivers_processed: 1,
            ..BuildSummary::default()
        };

        for (idx, current) in timeline.races.iter().enumerate() {
            let season = current.record.season;
            let history = &timeline.races[..idx];

            if history.len() < self.config.min_history {
                summary.insufficient_history += 1;
                *summary.skipped_per_season.entry(season).or_default() += 1;
                continue;
            }

            let circuit = current.record.circuit(self.config.circuit_key);
            match DriverForm::compute(history, circuit, &self.config) {
                Ok(form) => {
                    rows.push((current.key, FeatureRow::assemble(current, &form)));
                    summary.rows_emitted += 1;
                    *summary.rows_per_season.entry(season).or_default() += 1;
                }
                Err(e) => {
                    log::warn!(
                        "Skipping {} at race {} (round {}): {}",
                        timeline.driver,
                        current.key,
                        current.record.round,
                        e
                    );
                    summary.failed_rows += 1;
                }
            }
        }

        log::debug!(
            "{}: {} races, {} rows",
            timeline.driver,
            timeline.races.len(),
            summary.rows_emitted
        );

        TimelineOutput { rows, summary }
    }
}
