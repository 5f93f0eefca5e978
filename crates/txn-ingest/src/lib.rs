//! Export file I/O: discovery, CSV reading and canonical output.

pub mod csv_table;
pub mod discovery;
pub mod preamble;
pub mod writer;

pub use csv_table::{CsvExport, read_export};
pub use discovery::{find_csv_files, source_name};
pub use writer::{output_name, write_records};
