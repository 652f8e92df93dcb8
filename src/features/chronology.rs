//! Chronological ordering of race records
//!
//! Assigns every record a time-order key so that races sort by season and then
//! by round, independent of gaps in the round numbering or ingestion order.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::{DriverCode, PaddockError, PerformanceRecord, Result};

/// Rounds per season must stay below this for keys to remain unambiguous
pub const MAX_ROUNDS: u32 = 100;

/// Totally ordered position of a race: `season * 100 + dense round rank`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOrderKey(pub u32);

impl TimeOrderKey {
    pub fn new(season: u16, round_rank: u32) -> Self {
        TimeOrderKey(season as u32 * MAX_ROUNDS + round_rank)
    }
}

impl fmt::Display for TimeOrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / MAX_ROUNDS, self.0 % MAX_ROUNDS)
    }
}

/// A record together with its time-order key
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub key: TimeOrderKey,
    pub record: PerformanceRecord,
}

/// One driver's races in chronological order
#[derive(Debug, Clone)]
pub struct EntityTimeline<'a> {
    pub driver: &'a DriverCode,
    pub races: Vec<&'a IndexedRecord>,
}

/// The record table with time-order keys, in canonical order
/// (season, key, driver code)
#[derive(Debug, Clone, Default)]
pub struct ChronologicalIndex {
    records: Vec<IndexedRecord>,
}

impl ChronologicalIndex {
    /// Validate and index a record table.
    ///
    /// Fails on a duplicate (season, round, driver) or a round that does not fit
    /// in the key.
    pub fn build(records: Vec<PerformanceRecord>) -> Result<Self> {
        let rounds = Self::validate(&records)?;

        // Dense rank of each round within its season, starting at 1
        let ranks: BTreeMap<(u16, u8), u32> = rounds
            .iter()
            .flat_map(|(season, season_rounds)| {
                season_rounds
                    .iter()
                    .enumerate()
                    .map(move |(i, round)| ((*season, *round), i as u32 + 1))
            })
            .collect();

        let mut indexed: Vec<IndexedRecord> = records
            .into_iter()
            .map(|record| {
                let rank = ranks[&(record.season, record.round)];
                IndexedRecord {
                    key: TimeOrderKey::new(record.season, rank),
                    record,
                }
            })
            .collect();

        indexed.sort_by(|a, b| {
            a.record
                .season
                .cmp(&b.record.season)
                .then(a.key.cmp(&b.key))
                .then_with(|| a.record.driver_code.cmp(&b.record.driver_code))
        });

        log::debug!(
            "Indexed {} records across {} seasons and {} races",
            indexed.len(),
            rounds.len(),
            ranks.len()
        );

        Ok(ChronologicalIndex { records: indexed })
    }

    /// Check key uniqueness and round range, collecting the rounds seen per season
    fn validate(records: &[PerformanceRecord]) -> Result<BTreeMap<u16, BTreeSet<u8>>> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut rounds: BTreeMap<u16, BTreeSet<u8>> = BTreeMap::new();

        for record in records {
            if record.round as u32 >= MAX_ROUNDS {
                return Err(PaddockError::RoundOutOfRange {
                    season: record.season,
                    round: record.round as u32,
                    driver: record.driver_code.to_string(),
                });
            }
            if !seen.insert((record.season, record.round, &record.driver_code)) {
                return Err(PaddockError::DuplicateRecord {
                    season: record.season,
                    round: record.round,
                    driver: record.driver_code.clone(),
                });
            }
            rounds.entry(record.season).or_default().insert(record.round);
        }

        Ok(rounds)
    }

    /// All records in canonical order
    pub fn records(&self) -> &[IndexedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct seasons, ascending
    pub fn seasons(&self) -> Vec<u16> {
        let mut seasons: Vec<u16> = self.records.iter().map(|r| r.record.season).collect();
        seasons.dedup();
        seasons
    }

    /// Number of distinct races
    pub fn race_count(&self) -> usize {
        let mut keys: Vec<TimeOrderKey> = self.records.iter().map(|r| r.key).collect();
        keys.dedup();
        keys.len()
    }

    /// Earliest and latest event dates, when the input carried them
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(|r| r.record.event_date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Number of distinct drivers
    pub fn driver_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| &r.record.driver_code)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Split the table into per-driver timelines, ordered by driver code
    pub fn timelines(&self) -> Vec<EntityTimeline<'_>> {
        let mut by_driver: BTreeMap<&DriverCode, Vec<&IndexedRecord>> = BTreeMap::new();
        for indexed in &self.records {
            by_driver
                .entry(&indexed.record.driver_code)
                .or_default()
                .push(indexed);
        }

        by_driver
            .into_iter()
            .map(|(driver, races)| EntityTimeline { driver, races })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(season: u16, round: u8, driver: &str) -> PerformanceRecord {
        PerformanceRecord {
            season,
            round,
            event_name: None,
            location: None,
            event_date: None,
            driver_code: DriverCode::from(driver),
            driver_name: None,
            team_name: None,
            final_position: Some(1),
            grid_position: Some(1),
            status: Some("Finished".to_string()),
            points: Some(25.0),
        }
    }

    fn key_of(index: &ChronologicalIndex, season: u16, round: u8, driver: &str) -> TimeOrderKey {
        index
            .records()
            .iter()
            .find(|r| {
                r.record.season == season
                    && r.record.round == round
                    && r.record.driver_code.as_str() == driver
            })
            .map(|r| r.key)
            .unwrap()
    }

    #[test]
    fn test_dense_rank_ignores_gaps() {
        let index = ChronologicalIndex::build(vec![
            make_record(2022, 7, "VER"),
            make_record(2022, 2, "VER"),
            make_record(2022, 15, "VER"),
        ])
        .unwrap();

        assert_eq!(key_of(&index, 2022, 2, "VER"), TimeOrderKey(202201));
        assert_eq!(key_of(&index, 2022, 7, "VER"), TimeOrderKey(202202));
        assert_eq!(key_of(&index, 2022, 15, "VER"), TimeOrderKey(202203));
    }

    #[test]
    fn test_earlier_season_always_first() {
        let index = ChronologicalIndex::build(vec![
            make_record(2023, 1, "HAM"),
            make_record(2022, 22, "HAM"),
            make_record(2021, 99, "HAM"),
        ])
        .unwrap();

        let k21 = key_of(&index, 2021, 99, "HAM");
        let k22 = key_of(&index, 2022, 22, "HAM");
        let k23 = key_of(&index, 2023, 1, "HAM");
        assert!(k21 < k22 && k22 < k23);
        assert_eq!(k23.to_string(), "2023.01");
    }

    #[test]
    fn test_canonical_order() {
        let index = ChronologicalIndex::build(vec![
            make_record(2022, 2, "VER"),
            make_record(2022, 1, "VER"),
            make_record(2022, 1, "ALO"),
            make_record(2021, 5, "VER"),
        ])
        .unwrap();

        let order: Vec<(u16, u8, &str)> = index
            .records()
            .iter()
            .map(|r| (r.record.season, r.record.round, r.record.driver_code.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(2021, 5, "VER"), (2022, 1, "ALO"), (2022, 1, "VER"), (2022, 2, "VER")]
        );
        assert_eq!(index.seasons(), vec![2021, 2022]);
        assert_eq!(index.race_count(), 3);
    }

    #[test]
    fn test_duplicate_is_fatal() {
        let err = ChronologicalIndex::build(vec![
            make_record(2022, 4, "NOR"),
            make_record(2022, 4, "NOR"),
        ])
        .unwrap_err();

        match err {
            PaddockError::DuplicateRecord {
                season,
                round,
                driver,
            } => {
                assert_eq!((season, round), (2022, 4));
                assert_eq!(driver.as_str(), "NOR");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_round_limit() {
        let err = ChronologicalIndex::build(vec![make_record(2022, 100, "NOR")]).unwrap_err();
        assert!(matches!(err, PaddockError::RoundOutOfRange { round: 100, .. }));
    }

    #[test]
    fn test_date_range() {
        let mut early = make_record(2022, 1, "VER");
        early.event_date = NaiveDate::from_ymd_opt(2022, 3, 20);
        let mut late = make_record(2022, 2, "VER");
        late.event_date = NaiveDate::from_ymd_opt(2022, 3, 27);
        let undated = make_record(2022, 3, "VER");

        let index = ChronologicalIndex::build(vec![late, undated, early]).unwrap();
        assert_eq!(
            index.date_range(),
            Some((
                NaiveDate::from_ymd_opt(2022, 3, 20).unwrap(),
                NaiveDate::from_ymd_opt(2022, 3, 27).unwrap()
            ))
        );
        assert_eq!(index.driver_count(), 1);

        let undated = ChronologicalIndex::build(vec![make_record(2022, 1, "VER")]).unwrap();
        assert_eq!(undated.date_range(), None);
    }

    #[test]
    fn test_timelines_grouped_and_ordered() {
        let index = ChronologicalIndex::build(vec![
            make_record(2022, 3, "SAI"),
            make_record(2022, 1, "PER"),
            make_record(2021, 9, "SAI"),
            make_record(2022, 1, "SAI"),
        ])
        .unwrap();

        let timelines = index.timelines();
        assert_eq!(timelines.len(), 2);
        assert_eq!(timelines[0].driver.as_str(), "PER");

        let sainz = &timelines[1];
        let keys: Vec<TimeOrderKey> = sainz.races.iter().map(|r| r.key).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(sainz.races[0].record.season, 2021);
    }
}
