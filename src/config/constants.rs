// Project-wide constants
//
// Centralised here so file names, seeds and column lists have one
// source of truth. Import via `use crate::config::constants::*;`.

/// Seed for every split, fold assignment and under-sampler.
pub const DEFAULT_SEED: u64 = 1;

/// Number of cross-validation folds.
pub const DEFAULT_FOLDS: usize = 5;

/// Organisational field used for stratification.
///
/// Departments stratify graduate and undergraduate courses alike; most graduate
/// courses sit under the graduate school rather than the undergraduate faculties.
pub const DEFAULT_STRATIFY_COLUMN: &str = "DEPARTMENT";

/// Columns every annotation export must carry before it is accepted as raw data.
pub const REQUIRED_COLUMNS: [&str; 16] = [
    "text",
    "STRM",
    "FACULTY DESC",
    "DEPARTMENT",
    "CRSE CAREER",
    "SSR COMPONENT",
    "CRSE_ID",
    "COURSE CODE",
    "CATALOG NBR",
    "CLASS SECTION",
    "CLASS DESCR",
    "ENROLMENT",
    "LAST TERM OFFERED",
    "URL",
    "cats",
    "entities",
];

/// Separator between coordinate fields in artifact file names.
/// Reserved: never allowed inside a project or implementation name.
pub const FIELD_SEPARATOR: &str = "__";

/// Extension of every record collection.
pub const RECORDS_EXTENSION: &str = "jsonl";

/// Extension of persisted model artifacts.
pub const ARTIFACT_EXTENSION: &str = "json";

/// File name of the aggregated evaluation table.
pub const RESULTS_FILE_NAME: &str = "all_eval_results.jsonl";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "sdg-analytics.toml";

/// Environment variable overriding `storage.data_dir`.
pub const DATA_DIR_ENV: &str = "SDG_ANALYTICS_DATA_DIR";
