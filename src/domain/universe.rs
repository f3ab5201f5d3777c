//! Candidate universe collection.
//!
//! Walks the provider's basket candidates in order, drops ineligible symbols
//! and symbols without usable history, and returns the cap histories the
//! index is built from.

use std::collections::HashMap;
use tracing::{info, warn};

use crate::domain::error::AltdipError;
use crate::domain::market_cap::AssetCapSeries;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Ineligible,
    NoData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct UniverseResult {
    pub histories: HashMap<String, AssetCapSeries>,
    /// Accepted symbols in candidate order.
    pub symbols: Vec<String>,
    pub skipped: Vec<SkippedSymbol>,
}

impl UniverseResult {
    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}

pub fn collect_cap_histories(provider: &dyn MarketDataPort) -> Result<UniverseResult, AltdipError> {
    let candidates = provider.basket_candidates()?;
    let mut histories = HashMap::new();
    let mut symbols = Vec::new();
    let mut skipped = Vec::new();

    for candidate in candidates {
        let symbol = candidate.symbol;
        if histories.contains_key(&symbol) {
            continue;
        }
        if !provider.is_eligible(&symbol) {
            info!(symbol = %symbol, "skipping ineligible asset");
            skipped.push(SkippedSymbol {
                symbol,
                reason: SkipReason::Ineligible,
            });
            continue;
        }

        let series = match provider.cap_history(&symbol) {
            Ok(series) if !series.is_empty() => series,
            Ok(_) => {
                warn!(symbol = %symbol, "skipping asset with empty cap history");
                skipped.push(SkippedSymbol {
                    symbol,
                    reason: SkipReason::NoData,
                });
                continue;
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping asset, cap history unavailable");
                skipped.push(SkippedSymbol {
                    symbol,
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        symbols.push(symbol.clone());
        histories.insert(symbol, series);
    }

    if symbols.is_empty() {
        return Err(AltdipError::NoData {
            reason: format!("all {} candidates were skipped", skipped.len()),
        });
    }

    info!(
        accepted = symbols.len(),
        skipped = skipped.len(),
        "universe collected"
    );

    Ok(UniverseResult {
        histories,
        symbols,
        skipped,
    })
}
