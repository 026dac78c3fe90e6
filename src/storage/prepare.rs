// Raw data preparation
//
// Turns annotation export rows into Document Records: required columns are
// checked first, category descriptions are mapped to short keys, and labels are
// the union of document-level and span-level annotations.

use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::errors::{AnalyticsError, Result};
use crate::storage::{DocumentRecord, EntitySpan};
use crate::taxonomy::Sdg;

/// Export row as read from an annotation tool
pub type ExportRow = Map<String, Value>;

const TEXT_COLUMN: &str = "text";
const CATS_COLUMN: &str = "cats";
const ENTITIES_COLUMN: &str = "entities";

/// Fail with every required column some row lacks
pub fn check_columns(rows: &[ExportRow], required: &[String]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| rows.iter().any(|row| !row.contains_key(column.as_str())))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AnalyticsError::MissingColumns { columns: missing })
    }
}

/// Combine export rows into indexed Document Records
pub fn prepare_raw(rows: Vec<ExportRow>, required: &[String]) -> Result<Vec<DocumentRecord>> {
    check_columns(&rows, required)?;

    rows.into_iter()
        .enumerate()
        .map(|(index, mut row)| {
            let text = match row.remove(TEXT_COLUMN) {
                Some(Value::String(text)) => text,
                other => return Err(malformed(index, format!("text is not a string: {:?}", other))),
            };
            let cats = parse_cats(index, row.remove(CATS_COLUMN))?;
            let entities = parse_entities(index, row.remove(ENTITIES_COLUMN))?;

            let fields: Map<String, Value> = required
                .iter()
                .filter_map(|column| row.remove_entry(column.as_str()))
                .collect();

            Ok(DocumentRecord::new(index, text, cats, entities, fields))
        })
        .collect()
}

fn parse_cats(index: usize, value: Option<Value>) -> Result<Vec<Sdg>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.parse(),
                other => Err(malformed(index, format!("category is not a string: {}", other))),
            })
            .collect(),
        Some(other) => Err(malformed(index, format!("cats is not a list: {}", other))),
    }
}

fn parse_entities(index: usize, value: Option<Value>) -> Result<Vec<EntitySpan>> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(malformed(index, format!("entities is not a list: {}", other)))
        }
    };

    items
        .iter()
        .map(|item| {
            let span = item.as_array().filter(|span| span.len() == 3).ok_or_else(|| {
                malformed(index, format!("entity is not [start, end, category]: {}", item))
            })?;
            let offset = |v: &Value| {
                v.as_u64()
                    .map(|n| n as usize)
                    .ok_or_else(|| malformed(index, format!("entity offset is not an integer: {}", v)))
            };
            let category = span[2]
                .as_str()
                .ok_or_else(|| malformed(index, format!("entity label is not a string: {}", span[2])))?
                .parse()?;
            Ok(EntitySpan(offset(&span[0])?, offset(&span[1])?, category))
        })
        .collect()
}

fn malformed(index: usize, reason: String) -> AnalyticsError {
    AnalyticsError::Malformed {
        path: PathBuf::from(format!("export row {}", index)),
        reason,
    }
}
