pub mod config;
pub mod record;
pub mod row;

pub use config::{FileMappingConfig, MappingMode, PrecomputeEntry};
pub use record::{CanonicalRecord, OUTPUT_COLUMNS, Side, TransactionType};
pub use row::RawRow;
