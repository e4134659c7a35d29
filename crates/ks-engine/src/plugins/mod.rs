//! Built-in command interceptors.

pub mod dump_json;
pub mod load_csv;

pub use dump_json::DumpJson;
pub use load_csv::LoadCsv;
