//! CSV export of the feature table

use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::features::FeatureRow;
use crate::Result;

/// Writes feature rows with a fixed header, even when there are no rows
pub struct FeatureWriter;

impl FeatureWriter {
    /// Write rows to a CSV file, creating parent directories as needed
    pub fn write_path<P: AsRef<Path>>(rows: &[FeatureRow], path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Self::write(rows, file)?;
        log::info!("Wrote {} feature rows to {}", rows.len(), path.display());
        Ok(())
    }

    /// Write rows to any writer
    pub fn write<W: Write>(rows: &[FeatureRow], writer: W) -> Result<()> {
        let mut writer: Writer<W> = WriterBuilder::new().has_headers(false).from_writer(writer);
        writer.write_record(FeatureRow::COLUMNS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
