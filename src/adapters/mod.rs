// Adapters layer: concrete implementations of the domain ports (http, storage, csv output).

pub mod csv_sink;
pub mod http;
pub mod storage;

pub use csv_sink::CsvRowSink;
pub use http::BrregClient;
pub use storage::LocalStorage;
