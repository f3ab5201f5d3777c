//! CSV market-cap data adapter.
//!
//! Reads one `<SYMBOL>.csv` file per asset with a `date,market_cap` header
//! from a single directory. Ranking candidates parses every file; those
//! series are held until the matching `cap_history` call takes them, so a
//! refresh reads each file once.

use crate::domain::error::AltdipError;
use crate::domain::market_cap::{AssetCapSeries, Candidate, CapPoint};
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvMarketDataAdapter {
    base_path: PathBuf,
    excluded: HashSet<String>,
    ranked: RefCell<HashMap<String, AssetCapSeries>>,
}

impl CsvMarketDataAdapter {
    pub fn new(base_path: PathBuf, excluded: impl IntoIterator<Item = String>) -> Self {
        Self {
            base_path,
            excluded: excluded.into_iter().map(|s| s.to_uppercase()).collect(),
            ranked: RefCell::new(HashMap::new()),
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn list_symbols(&self) -> Result<Vec<String>, AltdipError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| AltdipError::MarketData {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AltdipError::MarketData {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    fn read_series(&self, symbol: &str) -> Result<AssetCapSeries, AltdipError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| AltdipError::MarketData {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| AltdipError::MarketData {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            points.push(parse_row(&record, i as u64 + 2)?);
        }

        Ok(AssetCapSeries::new(symbol.to_uppercase(), points))
    }
}

fn parse_row(record: &csv::StringRecord, line: u64) -> Result<CapPoint, AltdipError> {
    let date_str = record.get(0).ok_or_else(|| AltdipError::MarketData {
        reason: format!("line {}: missing date column", line),
    })?;
    let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
        AltdipError::MarketData {
            reason: format!("line {}: invalid date format: {}", line, e),
        }
    })?;
    let market_cap: f64 = record
        .get(1)
        .ok_or_else(|| AltdipError::MarketData {
            reason: format!("line {}: missing market_cap column", line),
        })?
        .trim()
        .parse()
        .map_err(|e| AltdipError::MarketData {
            reason: format!("line {}: invalid market_cap value: {}", line, e),
        })?;
    Ok(CapPoint { date, market_cap })
}

impl MarketDataPort for CsvMarketDataAdapter {
    fn basket_candidates(&self) -> Result<Vec<Candidate>, AltdipError> {
        let mut ranked = self.ranked.borrow_mut();
        ranked.clear();
        let mut candidates = Vec::new();
        for symbol in self.list_symbols()? {
            let series = self.read_series(&symbol)?;
            match series.latest().map(|p| p.market_cap) {
                Some(market_cap) => {
                    candidates.push(Candidate {
                        symbol: series.symbol.clone(),
                        market_cap,
                    });
                    ranked.insert(series.symbol.clone(), series);
                }
                None => debug!(symbol = %symbol, "no rows, not a candidate"),
            }
        }
        candidates.sort_by(|a, b| {
            b.market_cap
                .total_cmp(&a.market_cap)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        Ok(candidates)
    }

    fn cap_history(&self, symbol: &str) -> Result<AssetCapSeries, AltdipError> {
        if let Some(series) = self.ranked.borrow_mut().remove(&symbol.to_uppercase()) {
            return Ok(series);
        }
        self.read_series(symbol)
    }

    fn is_eligible(&self, symbol: &str) -> bool {
        !self.excluded.contains(&symbol.to_uppercase())
    }
}
