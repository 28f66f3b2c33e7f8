//! QuantLaxmi Carry Store
//!
//! Append-only history of refresh cycles and the subscriber registry.
//!
//! - [`append_all`]: stage every sink, then commit; a failure rolls all back
//! - [`SqliteHistory`]: `futures`, `carry` and `spread` tables, one
//!   transaction per cycle
//! - [`CsvHistory`]: daily CSV files per table
//! - [`SubscriberStore`]: add/remove/list of notification recipients

pub mod csv_export;
pub mod error;
pub mod history;
pub mod sqlite;
pub mod subscribers;
pub mod table;

pub use csv_export::CsvHistory;
pub use error::{StoreError, StoreResult};
pub use history::{append_all, CycleBatch, HistorySink};
pub use sqlite::SqliteHistory;
pub use subscribers::{ChatId, MemorySubscriberStore, SqliteSubscriberStore, SubscriberStore};
pub use table::HistoryRow;
