//! Synthetic market-cap-weighted index over a monthly-rebalanced basket.
//!
//! Per-asset histories are outer-joined into one date-ordered table, then
//! folded day by day. The basket is re-selected (top N by market cap) on the
//! first date and on every month-end; between those dates it is carried over
//! unchanged, members without data for a day contributing zero.

use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::market_cap::AssetCapSeries;
use super::portfolio::TargetWeights;

pub const DEFAULT_BASKET_SIZE: usize = 10;
pub const DEFAULT_BASE_VALUE: f64 = 1.0;

/// Market caps observed on each date, keyed by symbol.
pub type DailyCaps = BTreeMap<NaiveDate, HashMap<String, f64>>;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub date: NaiveDate,
    /// Basket members in selection order.
    pub basket: Vec<String>,
    /// Market cap of each basket member on this date (0.0 when missing).
    pub member_caps: Vec<f64>,
    pub total_market_cap: f64,
    pub close: f64,
    /// True when the basket was re-selected on this date.
    pub rebalanced: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexBuilder {
    pub basket_size: usize,
    pub base_value: f64,
}

impl IndexBuilder {
    pub fn new(basket_size: usize, base_value: f64) -> Self {
        Self {
            basket_size,
            base_value,
        }
    }

    /// Builds the daily index over the union of all observed dates.
    ///
    /// Leading dates whose basket has no market cap are dropped, so the
    /// series starts on the first date it can be normalised against. Returns
    /// an empty series when no such date exists.
    pub fn build(
        &self,
        histories: &HashMap<String, AssetCapSeries>,
    ) -> Vec<IndexRecord> {
        let daily = merge_cap_histories(histories);
        let mut records: Vec<IndexRecord> = Vec::with_capacity(daily.len());
        let mut basket: Option<Vec<String>> = None;

        for (date, day) in &daily {
            let (members, rebalanced) = match basket.as_deref() {
                Some(previous) if !is_rebalance_date(*date) => {
                    (self.carry_over(*date, previous, day), false)
                }
                _ => (self.select_top(day), true),
            };

            let member_caps: Vec<f64> = members
                .iter()
                .map(|symbol| day.get(symbol).copied().unwrap_or(0.0))
                .collect();
            let total_market_cap: f64 = member_caps.iter().sum();

            if records.is_empty() && total_market_cap <= 0.0 {
                debug!(%date, "skipping leading date without market cap");
                basket = None;
                continue;
            }
            if rebalanced {
                debug!(%date, basket = ?members, "rebalanced basket");
            }

            records.push(IndexRecord {
                date: *date,
                basket: members.clone(),
                member_caps,
                total_market_cap,
                close: 0.0,
                rebalanced,
            });
            basket = Some(members);
        }

        let Some(base_total) = records.first().map(|r| r.total_market_cap) else {
            return records;
        };
        for record in &mut records {
            record.close = self.base_value * record.total_market_cap / base_total;
        }
        records
    }

    fn select_top(&self, day: &HashMap<String, f64>) -> Vec<String> {
        let mut ranked: Vec<(&String, f64)> = day.iter().map(|(s, &cap)| (s, cap)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(self.basket_size)
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    fn carry_over(
        &self,
        date: NaiveDate,
        previous: &[String],
        day: &HashMap<String, f64>,
    ) -> Vec<String> {
        let mut members: Vec<String> = previous
            .iter()
            .filter(|symbol| day.contains_key(*symbol))
            .cloned()
            .collect();

        if members.len() < self.basket_size {
            let missing: Vec<String> = previous
                .iter()
                .filter(|symbol| !members.contains(symbol))
                .take(self.basket_size - members.len())
                .cloned()
                .collect();
            if !missing.is_empty() {
                debug!(%date, missing = ?missing, "carrying over basket members without data");
            }
            members.extend(missing);
        }
        members
    }
}

/// Outer join of all histories on date. Non-finite or negative caps are
/// treated as missing.
pub fn merge_cap_histories(histories: &HashMap<String, AssetCapSeries>) -> DailyCaps {
    let mut daily = DailyCaps::new();
    for (symbol, series) in histories {
        for point in &series.points {
            if !point.market_cap.is_finite() || point.market_cap < 0.0 {
                debug!(%symbol, date = %point.date, "ignoring unusable market cap");
                continue;
            }
            daily
                .entry(point.date)
                .or_default()
                .insert(symbol.clone(), point.market_cap);
        }
    }
    daily
}

/// Last calendar day of its month.
pub fn is_rebalance_date(date: NaiveDate) -> bool {
    match date.succ_opt() {
        Some(next) => next.month() != date.month(),
        None => true,
    }
}

/// Weights of each member's market cap within the basket on the most recent
/// rebalance record. Members without a cap that day are left out.
pub fn target_weights(records: &[IndexRecord]) -> TargetWeights {
    let Some(record) = records.iter().rev().find(|r| r.rebalanced) else {
        return TargetWeights::default();
    };
    if record.total_market_cap <= 0.0 {
        return TargetWeights::default();
    }
    record
        .basket
        .iter()
        .zip(&record.member_caps)
        .filter(|(_, cap)| **cap > 0.0)
        .map(|(symbol, cap)| (symbol.clone(), cap / record.total_market_cap))
        .collect()
}

pub fn closes(records: &[IndexRecord]) -> Vec<f64> {
    records.iter().map(|r| r.close).collect()
}
