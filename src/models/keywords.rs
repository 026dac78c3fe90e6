// Keyword dictionary loading
//
// A dictionary is a table with an `SDG` column and a comma-separated `Keywords`
// column, stored as JSON (array of rows), CSV or a spreadsheet.

use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::{AnalyticsError, Result};
use crate::taxonomy::Sdg;

const SDG_COLUMN: &str = "SDG";
const KEYWORDS_COLUMN: &str = "Keywords";

#[derive(Debug, Deserialize)]
struct KeywordRow {
    #[serde(rename = "SDG")]
    sdg: String,
    #[serde(rename = "Keywords")]
    keywords: String,
}

/// Keyword patterns per category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordDictionary {
    entries: BTreeMap<Sdg, Vec<String>>,
}

impl KeywordDictionary {
    /// Load by file extension: `json`, `csv`, `xlsx`/`xls`/`ods`
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AnalyticsError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let rows = match extension.as_str() {
            "json" => read_json(path)?,
            "csv" => read_csv(path)?,
            "xlsx" | "xlsm" | "xls" | "ods" => read_spreadsheet(path)?,
            other => {
                return Err(AnalyticsError::Config(format!(
                    "unsupported keyword dictionary format '{}': {}",
                    other,
                    path.display()
                )))
            }
        };

        let dictionary = Self::from_rows(rows)?;
        tracing::debug!(
            path = %path.display(),
            categories = dictionary.entries.len(),
            "Loaded keyword dictionary"
        );
        Ok(dictionary)
    }

    fn from_rows(rows: Vec<KeywordRow>) -> Result<Self> {
        let mut entries: BTreeMap<Sdg, Vec<String>> = BTreeMap::new();
        for row in rows {
            let sdg = parse_category(&row.sdg)?;
            let keywords = entries.entry(sdg).or_default();
            keywords.extend(
                row.keywords
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string),
            );
        }
        Ok(Self { entries })
    }

    /// Keywords of one category; empty when the dictionary has none
    pub fn keywords(&self, category: Sdg) -> Vec<String> {
        self.entries.get(&category).cloned().unwrap_or_default()
    }
}

/// "SDG 3", "3 - Good Health and Well-being", or a bare number from a spreadsheet cell
fn parse_category(cell: &str) -> Result<Sdg> {
    let cell = cell.trim();
    if let Ok(number) = cell.parse::<f64>() {
        if number.fract() == 0.0 && (1.0..=16.0).contains(&number) {
            if let Some(sdg) = Sdg::from_number(number as u8) {
                return Ok(sdg);
            }
        }
    }
    cell.parse()
}

fn read_json(path: &Path) -> Result<Vec<KeywordRow>> {
    let json = fs::read_to_string(path).map_err(|e| AnalyticsError::io(path, e))?;
    serde_json::from_str(&json).map_err(|e| AnalyticsError::json(path, e))
}

fn read_csv(path: &Path) -> Result<Vec<KeywordRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn read_spreadsheet(path: &Path) -> Result<Vec<KeywordRow>> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| AnalyticsError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AnalyticsError::Spreadsheet(format!("no worksheet in {}", path.display())))?
        .map_err(|e| AnalyticsError::Spreadsheet(e.to_string()))?;

    let mut cells = range.rows();
    let header: Vec<String> = cells
        .next()
        .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();

    let position = |name: &str| header.iter().position(|h| h == name);
    let (Some(sdg_col), Some(keywords_col)) = (position(SDG_COLUMN), position(KEYWORDS_COLUMN)) else {
        let missing = [SDG_COLUMN, KEYWORDS_COLUMN]
            .into_iter()
            .filter(|name| position(name).is_none())
            .map(str::to_string)
            .collect();
        return Err(AnalyticsError::MissingColumns { columns: missing });
    };

    let rows = cells
        .filter_map(|row| {
            let sdg = row.get(sdg_col)?.to_string();
            let keywords = row.get(keywords_col).map(|c| c.to_string()).unwrap_or_default();
            (!sdg.trim().is_empty()).then_some(KeywordRow { sdg, keywords })
        })
        .collect();
    Ok(rows)
}
