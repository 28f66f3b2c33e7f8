//! Decoding recorded ISS responses.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use quantlaxmi_carry::{AssetCodeMap, CarryEngine};
use quantlaxmi_connectors_moex::{
    FuturesSnapshot, IssError, IssResult, MarketSnapshot, QuoteProvider, SharesSnapshot,
};

const FUTURES: &str = include_str!("fixtures/futures.json");
const SHARES: &str = include_str!("fixtures/shares.json");

#[test]
fn test_futures_snapshot_normalizes_asset_codes() {
    let snapshot = FuturesSnapshot::decode(FUTURES, &AssetCodeMap::default()).unwrap();

    assert_eq!(snapshot.rows.len(), 5);
    assert_eq!(snapshot.asset_codes(), vec!["GAZP", "LKOH", "SBER"]);
    assert_eq!(
        snapshot.as_of,
        NaiveDate::from_ymd_opt(2025, 3, 3).and_then(|d| d.and_hms_opt(11, 34, 6))
    );

    let sr = &snapshot.rows[0];
    assert_eq!(sr.secid, "SRH5");
    assert_eq!(sr.asset_code.as_deref(), Some("SBER"));
    assert_eq!(sr.lot_volume, 100);
    assert_eq!(sr.num_trades, Some(18034));
    assert_eq!(sr.sec_type.as_deref(), Some("SR"));
    assert!((sr.initial_margin.unwrap() - 4915.87).abs() < 1e-9);
    assert_eq!(
        sr.trade_ts(),
        NaiveDate::from_ymd_opt(2025, 3, 3).and_then(|d| d.and_hms_opt(11, 34, 1))
    );

    let lk = &snapshot.rows[4];
    assert_eq!(lk.last, None);
    assert_eq!(lk.time, None);
    assert_eq!(lk.trade_ts(), None);
}

#[test]
fn test_futures_quotes_carry_contract_terms() {
    let snapshot = FuturesSnapshot::decode(FUTURES, &AssetCodeMap::default()).unwrap();
    let quotes = snapshot.quotes();

    let gz = quotes.iter().find(|q| q.code == "GZM5").unwrap();
    assert_eq!(gz.underlying_code.as_deref(), Some("GAZP"));
    assert_eq!(gz.lot_multiplier, 100);
    assert_eq!(gz.expiry, NaiveDate::from_ymd_opt(2025, 6, 19).unwrap());
    assert_eq!(gz.last, Some(14105.0));
}

#[test]
fn test_shares_snapshot_decodes() {
    let snapshot = SharesSnapshot::decode(SHARES).unwrap();
    assert_eq!(snapshot.rows.len(), 3);

    let sber = snapshot.rows.iter().find(|r| r.secid == "SBER").unwrap();
    assert_eq!(sber.lot_size, 10);
    assert_eq!(sber.last, Some(285.31));
    assert_eq!(sber.time, NaiveTime::from_hms_opt(11, 34, 4));

    let quotes = snapshot.quotes();
    assert_eq!(quotes.len(), 3);
    assert_eq!(quotes[0].short_name, "ГАЗПРОМ ао");
}

#[test]
fn test_missing_marketdata_column_is_schema_error() {
    let body = FUTURES.replace("\"OPENPOSITION\"", "\"OPENPOS\"");
    let err = FuturesSnapshot::decode(&body, &AssetCodeMap::default()).unwrap_err();
    match err {
        IssError::MissingColumn { section, column } => {
            assert_eq!(section, "marketdata");
            assert_eq!(column, "OPENPOSITION");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_section_is_schema_error() {
    let err = SharesSnapshot::decode(r#"{"securities": {"columns": ["SECID"], "data": []}}"#)
        .unwrap_err();
    assert!(matches!(err, IssError::MissingSection(ref s) if s == "marketdata"));
}

#[test]
fn test_unparseable_expiry_skips_only_that_row() {
    let body = FUTURES.replace("2025-06-19", "19.06.2025");
    let snapshot = FuturesSnapshot::decode(&body, &AssetCodeMap::default()).unwrap();
    let secids: Vec<&str> = snapshot.rows.iter().map(|r| r.secid.as_str()).collect();
    assert_eq!(secids, vec!["SRH5", "GZH5", "LKH5"]);
}

#[test]
fn test_null_lot_size_skips_only_that_share() {
    let body = SHARES.replace(r#"["LKOH", "ЛУКОЙЛ", 1]"#, r#"["LKOH", "ЛУКОЙЛ", null]"#);
    let snapshot = SharesSnapshot::decode(&body).unwrap();
    let secids: Vec<&str> = snapshot.rows.iter().map(|r| r.secid.as_str()).collect();
    assert_eq!(secids, vec!["GAZP", "SBER"]);
}

#[test]
fn test_not_json_is_rejected() {
    let err = SharesSnapshot::decode("securities\nSECID;SHORTNAME").unwrap_err();
    assert!(matches!(err, IssError::Json(_)));
}

struct RecordedProvider;

#[async_trait]
impl QuoteProvider for RecordedProvider {
    async fn snapshot(&self, universe: &[String]) -> IssResult<MarketSnapshot> {
        if universe.is_empty() {
            return Err(IssError::EmptyUniverse);
        }
        Ok(MarketSnapshot {
            futures: FuturesSnapshot::decode(FUTURES, &AssetCodeMap::default())?,
            shares: SharesSnapshot::decode(SHARES)?,
        })
    }
}

#[tokio::test]
async fn test_recorded_snapshot_feeds_engine() {
    let universe: Vec<String> = ["SRH5", "SRM5", "GZH5", "GZM5", "LKH5"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let market = RecordedProvider.snapshot(&universe).await.unwrap();
    let as_of = market.as_of().unwrap();

    let batch = CarryEngine::default()
        .compute(as_of, &market.futures_quotes(), &market.underlying_quotes())
        .unwrap();

    assert_eq!(batch.carry.len(), 5);
    let sr = batch
        .carry
        .iter()
        .find(|r| r.contract_code == "SRH5")
        .unwrap();
    assert_eq!(sr.days_to_expiry, 18);
    // 28905 vs 285.31 × 100
    assert!((sr.carry_pct.unwrap() - 1.31).abs() < 1e-9);

    // SBER pair kept, GAZP pair skipped on the zero near leg
    assert_eq!(batch.spreads.len(), 1);
    assert_eq!(batch.spreads[0].spread_name, "SBRF-3.25-SBRF-6.25");
    assert_eq!(batch.diagnostics.len(), 1);

    assert!(RecordedProvider.snapshot(&[]).await.is_err());
}
