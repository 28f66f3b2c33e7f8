//! Quote source seam for the refresh cycle.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use quantlaxmi_carry::{FuturesQuote, UnderlyingQuote};

use crate::error::IssResult;
use crate::snapshot::{FuturesSnapshot, SharesSnapshot};

/// Futures and underlying snapshots taken for one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    pub futures: FuturesSnapshot,
    pub shares: SharesSnapshot,
}

impl MarketSnapshot {
    /// Exchange time of the futures snapshot, if reported.
    pub fn as_of(&self) -> Option<NaiveDateTime> {
        self.futures.as_of
    }

    pub fn futures_quotes(&self) -> Vec<FuturesQuote> {
        self.futures.quotes()
    }

    pub fn underlying_quotes(&self) -> Vec<UnderlyingQuote> {
        self.shares.quotes()
    }
}

/// Anything that can produce a market snapshot for a contract universe.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn snapshot(&self, universe: &[String]) -> IssResult<MarketSnapshot>;
}
