//! CSV export of harvested records.

use anyhow::{Context, Result};
use chrono::Utc;
use feed_harvest::Record;
use indexmap::IndexSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column names in first-seen order across all records.
pub fn header(records: &[Record]) -> Vec<String> {
    let mut names: IndexSet<String> = IndexSet::new();
    for record in records {
        for name in record.field_names() {
            if !names.contains(name) {
                names.insert(name.to_string());
            }
        }
    }
    names.into_iter().collect()
}

/// Write records as CSV; fields a record lacks render as empty cells.
pub fn write_records<W: Write>(writer: W, records: &[Record]) -> Result<()> {
    let columns = header(records);
    if columns.is_empty() {
        return Ok(());
    }
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(&columns).context("Failed to write CSV header")?;
    for record in records {
        let row = columns
            .iter()
            .map(|name| record.get(name).map(|v| v.to_cell()).unwrap_or_default());
        csv.write_record(row).context("Failed to write CSV row")?;
    }
    csv.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Default output path: `<dir>/<name>-<UTC timestamp>.csv`.
pub fn default_path(dir: &Path, name: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("{name}-{stamp}.csv"))
}

/// Write records to a file, creating parent directories.
pub fn write_file(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_records(file, records)
}
