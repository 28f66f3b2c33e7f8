//! # QuantLaxmi MOEX Connector
//!
//! Moscow Exchange market data through the public ISS REST API.
//!
//! ## Boards
//! - FORTS `RFUD`: futures contracts (last price, expiry, lot volume, asset code)
//! - Stock `TQBR`: main equity board (last price, lot size)
//!
//! ## Isolation
//! Pure retrieval and decoding. No carry arithmetic lives here; decoded rows
//! are converted to `quantlaxmi-carry` quote types at the boundary.

pub mod client;
pub mod error;
pub mod provider;
pub mod snapshot;
pub mod table;

pub use client::{IssClient, DEFAULT_BASE_URL};
pub use error::{IssError, IssResult};
pub use provider::{MarketSnapshot, QuoteProvider};
pub use snapshot::{FuturesSnapshot, FuturesSnapshotRow, SharesSnapshot, SharesSnapshotRow};
pub use table::{IssRow, IssTable};
