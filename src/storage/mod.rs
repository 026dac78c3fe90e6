// Dataset storage
//
// Coordinate addressing, JSONL persistence, raw data preparation and splitting

mod address;
mod dataset;
mod jsonl;
mod prepare;
mod records;
pub mod split;

pub use address::{validate_name, AddressResolver, Coordinate, Datatype};
pub use dataset::DatasetStore;
pub(crate) use jsonl::{read_records, write_records};
pub use prepare::{check_columns, prepare_raw, ExportRow};
pub use records::{DocumentRecord, EntitySpan, PredictionRecord};
pub use split::{split, stratified_k_fold, Splits};
