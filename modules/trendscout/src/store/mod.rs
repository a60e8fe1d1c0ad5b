pub mod csv_store;

pub use csv_store::{run_file_name, CsvRecordStore, RUN_FILE_PREFIX};
