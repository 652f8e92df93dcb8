//! Output rows of the feature table

use serde::{Deserialize, Serialize};

use crate::features::chronology::IndexedRecord;
use crate::features::form::{DriverForm, PODIUM_POSITION};
use crate::DriverCode;

/// One driver in one race: identity, outcome labels and pre-race features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    // Meta
    pub season: u16,
    pub round: u8,
    pub event_name: Option<String>,
    pub location: Option<String>,
    pub driver_code: DriverCode,
    pub driver_name: Option<String>,
    pub team_name: Option<String>,

    // Labels from the race itself
    pub final_position: Option<u32>,
    pub won: u8,
    pub podium: u8,
    pub points_scored: Option<f64>,
    pub grid_position: Option<u32>,

    // Features from prior races only
    pub race_experience: usize,
    pub weighted_avg_position: f64,
    pub weighted_avg_points: f64,
    pub recent_form_3races: f64,
    pub recent_points_3races: f64,
    pub podiums_last_5races: usize,
    /// Empty when fewer than two prior races
    pub consistency_std_position: Option<f64>,
    pub finish_rate: f64,
    pub avg_grid_position_history: f64,
    pub avg_grid_to_race_gain: f64,
    pub avg_position_on_circuit: f64,
    pub circuit_experience: usize,
}

impl FeatureRow {
    /// Output column names, in order
    pub const COLUMNS: [&'static str; 24] = [
        "season",
        "round",
        "event_name",
        "location",
        "driver_code",
        "driver_name",
        "team_name",
        "final_position",
        "won",
        "podium",
        "points_scored",
        "grid_position",
        "race_experience",
        "weighted_avg_position",
        "weighted_avg_points",
        "recent_form_3races",
        "recent_points_3races",
        "podiums_last_5races",
        "consistency_std_position",
        "finish_rate",
        "avg_grid_position_history",
        "avg_grid_to_race_gain",
        "avg_position_on_circuit",
        "circuit_experience",
    ];

    /// Combine the current race with the form computed from its history
    pub fn assemble(current: &IndexedRecord, form: &DriverForm) -> Self {
        let record = &current.record;
        let position = record.final_position;

        FeatureRow {
            season: record.season,
            round: record.round,
            event_name: record.event_name.clone(),
            location: record.location.clone(),
            driver_code: record.driver_code.clone(),
            driver_name: record.driver_name.clone(),
            team_name: record.team_name.clone(),
            final_position: position,
            won: u8::from(position == Some(1)),
            podium: u8::from(position.map_or(false, |p| f64::from(p) <= PODIUM_POSITION)),
            points_scored: record.points,
            grid_position: record.grid_position,
            race_experience: form.race_experience,
            weighted_avg_position: form.weighted_avg_position,
            weighted_avg_points: form.weighted_avg_points,
            recent_form_3races: form.recent_form,
            recent_points_3races: form.recent_points,
            podiums_last_5races: form.recent_podiums,
            consistency_std_position: Some(form.consistency_std_position)
                .filter(|std| !std.is_nan()),
            finish_rate: form.finish_rate,
            avg_grid_position_history: form.avg_grid_position,
            avg_grid_to_race_gain: form.avg_grid_to_race_gain,
            avg_position_on_circuit: form.avg_position_on_circuit,
            circuit_experience: form.circuit_experience,
        }
    }
}
