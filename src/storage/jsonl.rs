// JSON Lines reading and writing

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::errors::{AnalyticsError, Result};

/// Read every record of a JSONL file
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(AnalyticsError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| AnalyticsError::io(path, e))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AnalyticsError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| AnalyticsError::Malformed {
            path: path.to_path_buf(),
            reason: format!("line {}: {}", line_no + 1, e),
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Write records as JSONL, replacing anything already at `path`
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AnalyticsError::io(parent, e))?;
    }

    let file = File::create(path).map_err(|e| AnalyticsError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record).map_err(|e| AnalyticsError::json(path, e))?;
        writer
            .write_all(b"\n")
            .map_err(|e| AnalyticsError::io(path, e))?;
    }

    writer.flush().map_err(|e| AnalyticsError::io(path, e))?;
    Ok(())
}
