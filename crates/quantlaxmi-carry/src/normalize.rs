//! Futures asset-code normalization.
//!
//! The derivatives board reports some underlyings under legacy asset codes
//! (`SBRF` for Sberbank, `GAZR` for Gazprom, ...). They must be rewritten to
//! the equity board's instrument code before the carry join.

use std::collections::HashMap;

use crate::types::FuturesQuote;

/// Legacy futures asset code → equity instrument code.
pub const ASSET_CODE_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("BELUGA", "BELU"),
    ("ISKJ", "ABIO"),
    ("GAZR", "GAZP"),
    ("MTSI", "MTSS"),
    ("NOTK", "NVTK"),
    ("SBRF", "SBER"),
    ("SBPR", "SBERP"),
    ("SNGR", "SNGS"),
    ("SNGP", "SNGSP"),
    ("TRNF", "TRNFP"),
    ("TATP", "TATNP"),
];

/// Substitution table applied to futures asset codes.
#[derive(Debug, Clone)]
pub struct AssetCodeMap {
    map: HashMap<String, String>,
}

impl Default for AssetCodeMap {
    fn default() -> Self {
        Self {
            map: ASSET_CODE_SUBSTITUTIONS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl AssetCodeMap {
    /// Built-in table extended (or overridden) by extra pairs.
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::default();
        for (from, to) in overrides {
            table.map.insert(from.into(), to.into());
        }
        table
    }

    /// Map a raw asset code; unknown codes pass through unchanged.
    pub fn normalize<'a>(&'a self, code: &'a str) -> &'a str {
        self.map.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Rewrite `underlying_code` of every quote in place.
    pub fn apply(&self, quotes: &mut [FuturesQuote]) {
        for quote in quotes.iter_mut() {
            if let Some(code) = quote.underlying_code.as_mut() {
                if let Some(mapped) = self.map.get(code.as_str()) {
                    *code = mapped.clone();
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
