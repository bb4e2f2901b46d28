use std::io::Write;
use std::path::Path;

use crate::entities::trial::TrialRecord;
use crate::error::DrugDashError;

/// Writes trial rows as CSV with a header row of [`TrialRecord::COLUMNS`].
pub fn write_trials<W: Write>(writer: W, rows: &[TrialRecord]) -> Result<(), DrugDashError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(TrialRecord::COLUMNS)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_trials_to_path(path: &Path, rows: &[TrialRecord]) -> Result<(), DrugDashError> {
    let file = std::fs::File::create(path)?;
    write_trials(file, rows)
}
