//! CSV loading of race results
//!
//! Validates the record schema once so the feature engine never has to look for
//! columns. Numeric cells that are empty or unparseable become nulls, matching
//! what the provider exports (positions arrive as `1.0`, DNFs as blanks).

use chrono::NaiveDate;
use csv::{Reader, ReaderBuilder, StringRecord};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::features::chronology::MAX_ROUNDS;
use crate::{DriverCode, PaddockError, PerformanceRecord, Result, UnorderablePolicy};

/// Columns every input file must carry
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "season",
    "round",
    "event_name",
    "location",
    "driver_code",
    "driver_name",
    "team_name",
    "final_position",
    "grid_position",
    "status",
    "points",
];

/// One CSV row before validation
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(deserialize_with = "csv::invalid_option")]
    season: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    round: Option<f64>,
    event_name: Option<String>,
    location: Option<String>,
    #[serde(default)]
    event_date: Option<String>,
    driver_code: Option<String>,
    driver_name: Option<String>,
    team_name: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    final_position: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    grid_position: Option<f64>,
    status: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    points: Option<f64>,
}

/// Records accepted from an input file
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: Vec<PerformanceRecord>,
    /// Rows dropped because their season or round could not be ordered
    pub unorderable: usize,
}

/// Reads performance records from delimited text
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordLoader {
    policy: UnorderablePolicy,
}

impl RecordLoader {
    pub fn new(policy: UnorderablePolicy) -> Self {
        RecordLoader { policy }
    }

    /// Load records from a CSV file
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<LoadedRecords> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PaddockError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open {}: {}", path.display(), e),
            ))
        })?;
        log::info!("Loading records from {}", path.display());
        self.load_reader(file)
    }

    /// Load records from any reader producing CSV with a header row
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<LoadedRecords> {
        let mut reader: Reader<R> = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();
        check_columns(&headers)?;

        let mut loaded = LoadedRecords::default();
        let mut row = StringRecord::new();
        while reader.read_record(&mut row)? {
            let line = row.position().map_or(0, |p| p.line());
            let raw: RawRecord = row.deserialize(Some(&headers))?;

            match self.validate(raw, line)? {
                Some(record) => loaded.records.push(record),
                None => loaded.unorderable += 1,
            }
        }

        log::info!(
            "Loaded {} records ({} unorderable rows skipped)",
            loaded.records.len(),
            loaded.unorderable
        );
        Ok(loaded)
    }

    /// Turn a raw row into a typed record, or None when it is skipped by policy
    fn validate(&self, raw: RawRecord, line: u64) -> Result<Option<PerformanceRecord>> {
        let driver_code = match non_empty(raw.driver_code) {
            Some(code) => DriverCode(code),
            None => return Err(PaddockError::MissingDriver { line }),
        };

        let (season, round) = match order_fields(raw.season, raw.round) {
            Ok(fields) => fields,
            Err(reason) => match self.policy {
                UnorderablePolicy::Skip => {
                    log::warn!("Skipping line {} ({}): {}", line, driver_code, reason);
                    return Ok(None);
                }
                UnorderablePolicy::Reject => {
                    return Err(PaddockError::UnorderableRecord { line, reason });
                }
            },
        };

        if round >= MAX_ROUNDS {
            return Err(PaddockError::RoundOutOfRange {
                season,
                round,
                driver: driver_code.0,
            });
        }

        Ok(Some(PerformanceRecord {
            season,
            round: round as u8,
            event_name: non_empty(raw.event_name),
            location: non_empty(raw.location),
            event_date: raw.event_date.as_deref().and_then(parse_event_date),
            driver_code,
            driver_name: non_empty(raw.driver_name),
            team_name: non_empty(raw.team_name),
            final_position: to_position(raw.final_position),
            grid_position: to_position(raw.grid_position),
            status: non_empty(raw.status),
            points: raw.points.filter(|p| p.is_finite()),
        }))
    }
}

fn check_columns(headers: &StringRecord) -> Result<()> {
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(PaddockError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Season and round as integers, or the reason they cannot be used
fn order_fields(season: Option<f64>, round: Option<f64>) -> std::result::Result<(u16, u32), String> {
    let season = season.ok_or("missing or unparseable season")?;
    let round = round.ok_or("missing or unparseable round")?;

    if season.fract() != 0.0 || !(1.0..=u16::MAX as f64).contains(&season) {
        return Err(format!("invalid season {}", season));
    }
    if round.fract() != 0.0 || !(1.0..=u32::MAX as f64).contains(&round) {
        return Err(format!("invalid round {}", round));
    }
    Ok((season as u16, round as u32))
}

/// Positive whole-number positions; anything else is treated as missing
fn to_position(value: Option<f64>) -> Option<u32> {
    value
        .filter(|v| v.is_finite() && *v >= 1.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32)
}

/// Accepts `2022-03-20` and timestamp forms such as `2022-03-20 00:00:00`
fn parse_event_date(value: &str) -> Option<NaiveDate> {
    let date = value.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const HEADER: &str = "season,round,event_name,location,event_date,driver_code,driver_number,driver_name,team_name,grid_position,final_position,status,points,laps_completed";

    fn load(body: &str, policy: UnorderablePolicy) -> Result<LoadedRecords> {
        let text = format!("{}\n{}", HEADER, body);
        RecordLoader::new(policy).load_reader(text.as_bytes())
    }

    #[test]
    fn test_load_provider_export() {
        let loaded = load(
            "2022,1,Bahrain Grand Prix,Sakhir,2022-03-20 00:00:00,LEC,16,Charles Leclerc,Ferrari,1.0,1.0,Finished,26.0,57\n\
             2022,1,Bahrain Grand Prix,Sakhir,2022-03-20,VER,1,Max Verstappen,Red Bull Racing,2.0,19.0,Fuel pressure,0.0,54\n",
            UnorderablePolicy::Skip,
        )
        .unwrap();

        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.unorderable, 0);

        let lec = &loaded.records[0];
        assert_eq!(lec.driver_code.as_str(), "LEC");
        assert_eq!(lec.final_position, Some(1));
        assert_eq!(lec.points, Some(26.0));
        assert!(lec.is_finished());
        assert_eq!(lec.event_date, NaiveDate::from_ymd_opt(2022, 3, 20));

        let ver = &loaded.records[1];
        assert_eq!(ver.status.as_deref(), Some("Fuel pressure"));
        assert!(!ver.is_finished());
    }

    #[test]
    fn test_blank_and_garbage_numbers_become_null() {
        let loaded = load(
            "2023,5,Miami Grand Prix,Miami,,GAS,10,Pierre Gasly,Alpine,,R,Retired,,0\n",
            UnorderablePolicy::Skip,
        )
        .unwrap();

        let gas = &loaded.records[0];
        assert_eq!(gas.grid_position, None);
        assert_eq!(gas.final_position, None);
        assert_eq!(gas.points, None);
        assert_eq!(gas.event_date, None);
    }

    #[test]
    fn test_penalty_points_kept_for_label() {
        let loaded = load(
            "2019,9,Austrian Grand Prix,Spielberg,,HUL,27,Nico Hulkenberg,Renault,8,13,Finished,-2.0,70\n\
             2019,9,Austrian Grand Prix,Spielberg,,RUS,63,George Russell,Williams,20,18,Finished,inf,69\n",
            UnorderablePolicy::Skip,
        )
        .unwrap();

        let hul = &loaded.records[0];
        assert_eq!(hul.points, Some(-2.0));
        assert_eq!(hul.points_or_zero(), 0.0);
        assert_eq!(loaded.records[1].points, None);
    }

    #[test]
    fn test_unorderable_rows_skipped() {
        let loaded = load(
            "2023,,Miami Grand Prix,Miami,,GAS,10,Pierre Gasly,Alpine,3,4,Finished,12,57\n\
             twenty,5,Miami Grand Prix,Miami,,OCO,31,Esteban Ocon,Alpine,5,6,Finished,8,57\n\
             2023,5,Miami Grand Prix,Miami,,ALB,23,Alexander Albon,Williams,9,10,Finished,1,57\n",
            UnorderablePolicy::Skip,
        )
        .unwrap();

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.unorderable, 2);
    }

    #[test]
    fn test_unorderable_rows_rejected() {
        let err = load(
            "2023,5.5,Miami Grand Prix,Miami,,GAS,10,Pierre Gasly,Alpine,3,4,Finished,12,57\n",
            UnorderablePolicy::Reject,
        )
        .unwrap_err();

        match err {
            PaddockError::UnorderableRecord { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("round"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_round_out_of_range() {
        let err = load(
            "2023,120,Miami Grand Prix,Miami,,GAS,10,Pierre Gasly,Alpine,3,4,Finished,12,57\n",
            UnorderablePolicy::Skip,
        )
        .unwrap_err();
        assert!(matches!(err, PaddockError::RoundOutOfRange { round: 120, .. }));
    }

    #[test]
    fn test_missing_driver_code() {
        let err = load(
            "2023,5,Miami Grand Prix,Miami,,,10,Pierre Gasly,Alpine,3,4,Finished,12,57\n",
            UnorderablePolicy::Skip,
        )
        .unwrap_err();
        assert!(matches!(err, PaddockError::MissingDriver { line: 2 }));
    }

    #[test]
    fn test_missing_column() {
        let text = "season,round,driver_code\n2023,1,VER\n";
        let err = RecordLoader::default().load_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, PaddockError::MissingColumn(ref c) if c == "event_name"));
    }

    #[test]
    fn test_quoted_fields() {
        let loaded = load(
            "2021,3,\"Emilia Romagna Grand Prix, Imola\",Imola,,NOR,4,Lando Norris,McLaren,7,3,Finished,15,63\n",
            UnorderablePolicy::Skip,
        )
        .unwrap();

        assert_eq!(
            loaded.records[0].event_name.as_deref(),
            Some("Emilia Romagna Grand Prix, Imola")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("races.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(
            file,
            "2024,1,Bahrain Grand Prix,Sakhir,2024-03-02,VER,1,Max Verstappen,Red Bull Racing,1,1,Finished,26,57"
        )
        .unwrap();
        drop(file);

        let loaded = RecordLoader::default().load_path(&path).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].season, 2024);

        let missing = RecordLoader::default().load_path(dir.path().join("nope.csv"));
        assert!(matches!(missing, Err(PaddockError::Io(_))));
    }
}
