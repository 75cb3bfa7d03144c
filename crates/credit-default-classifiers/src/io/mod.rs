//! File readers and writers for tabular data.
pub mod csv_table;

pub use csv_table::{is_zip, read_csv_table, read_table, read_zipped_csv_table, write_csv_table};
