//! ISS HTTP client.
//!
//! Public endpoints, no authentication. Both requests ask only for the
//! `securities` and `marketdata` sections with explicit column lists, so the
//! payload stays small regardless of universe size.

use std::time::Duration;

use async_trait::async_trait;
use quantlaxmi_carry::AssetCodeMap;
use tracing::{debug, info};

use crate::error::{IssError, IssResult};
use crate::provider::{MarketSnapshot, QuoteProvider};
use crate::snapshot::{
    FuturesSnapshot, SharesSnapshot, FUTURES_MARKETDATA_COLUMNS, FUTURES_SECURITY_COLUMNS,
    SHARES_MARKETDATA_COLUMNS, SHARES_SECURITY_COLUMNS,
};

pub const DEFAULT_BASE_URL: &str = "https://iss.moex.com/iss";

const FUTURES_PATH: &str = "engines/futures/markets/forts/boards/rfud/securities.json";
const SHARES_PATH: &str = "engines/stock/markets/shares/boards/TQBR/securities.json";

pub struct IssClient {
    client: reqwest::Client,
    base_url: String,
    assets: AssetCodeMap,
}

impl IssClient {
    pub fn new(base_url: impl Into<String>, assets: AssetCodeMap) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            assets,
        }
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> IssResult<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Futures snapshot for the given contract codes.
    pub async fn fetch_futures(&self, secids: &[String]) -> IssResult<FuturesSnapshot> {
        if secids.is_empty() {
            return Err(IssError::EmptyUniverse);
        }
        let body = self
            .get(
                FUTURES_PATH,
                secids,
                FUTURES_SECURITY_COLUMNS,
                FUTURES_MARKETDATA_COLUMNS,
            )
            .await?;
        let snapshot = FuturesSnapshot::decode(&body, &self.assets)?;

        info!(
            requested = secids.len(),
            rows = snapshot.rows.len(),
            as_of = ?snapshot.as_of,
            "[ISS] Futures snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Shares snapshot for the given instrument codes.
    pub async fn fetch_shares(&self, codes: &[String]) -> IssResult<SharesSnapshot> {
        if codes.is_empty() {
            return Ok(SharesSnapshot::default());
        }
        let body = self
            .get(
                SHARES_PATH,
                codes,
                SHARES_SECURITY_COLUMNS,
                SHARES_MARKETDATA_COLUMNS,
            )
            .await?;
        let snapshot = SharesSnapshot::decode(&body)?;

        info!(
            requested = codes.len(),
            rows = snapshot.rows.len(),
            "[ISS] Shares snapshot loaded"
        );
        Ok(snapshot)
    }

    async fn get(
        &self,
        path: &str,
        securities: &[String],
        security_columns: &[&str],
        marketdata_columns: &[&str],
    ) -> IssResult<String> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("securities", securities.join(",")),
                ("iss.only", "securities,marketdata".to_string()),
                ("iss.meta", "off".to_string()),
                ("securities.columns", security_columns.join(",")),
                ("marketdata.columns", marketdata_columns.join(",")),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, body_len = body.len(), url = %url, "[ISS] Response");

        if !status.is_success() {
            return Err(IssError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl QuoteProvider for IssClient {
    async fn snapshot(&self, universe: &[String]) -> IssResult<MarketSnapshot> {
        let futures = self.fetch_futures(universe).await?;
        let shares = self.fetch_shares(&futures.asset_codes()).await?;
        Ok(MarketSnapshot { futures, shares })
    }
}
