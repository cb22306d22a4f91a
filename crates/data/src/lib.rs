//! Batch sinks: CSV files, JSON files, Telegram documents, and fan-out.

pub mod csv_storage;
pub mod csv_tables;
pub mod fanout;
pub mod json_storage;
pub mod telegram;

pub use csv_storage::CsvSink;
pub use csv_tables::{RenderedTables, TableKind};
pub use fanout::FanoutSink;
pub use json_storage::JsonSink;
pub use telegram::TelegramSink;
