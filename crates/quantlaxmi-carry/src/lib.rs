//! QuantLaxmi Carry
//!
//! Futures-vs-underlying carry and calendar-spread carry for a listed
//! derivatives venue. Given one futures snapshot, one underlying snapshot and
//! an explicit as-of timestamp, the engine joins contracts to their
//! deliverables, derives days-to-expiry and carry (absolute and annualized),
//! pairs consecutive expiries into calendar spreads and ranks the results.
//!
//! The crate is synchronous and stateless. Retrieval, persistence and
//! publishing live in the surrounding crates.

pub mod carry;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod ranking;
pub mod spread;
pub mod types;

pub use engine::{CarryBatch, CarryEngine, RankedViews};
pub use error::{CarryError, Dataset};
pub use normalize::AssetCodeMap;
pub use ranking::DEFAULT_TOP_N;
pub use spread::{DegenerateSide, SpreadDiagnostic};
pub use types::{CarryRecord, FuturesQuote, SpreadRecord, UnderlyingQuote};
