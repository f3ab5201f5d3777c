#![allow(dead_code)]

use altdip::adapters::file_config_adapter::FileConfigAdapter;
use altdip::adapters::paper_venue::PaperVenue;
use altdip::domain::config::{build_bot_config, BotConfig};
use altdip::domain::error::AltdipError;
use altdip::domain::market_cap::{AssetCapSeries, CapPoint, Candidate};
use altdip::domain::state::BotState;
use altdip::ports::clock_port::ClockPort;
use altdip::ports::market_data_port::MarketDataPort;
use altdip::ports::state_port::StatePort;
use chrono::{Days, NaiveDate};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily caps starting at `start`, multiplied by `factor` each day.
pub fn trending_series(
    symbol: &str,
    start: NaiveDate,
    days: u64,
    first_cap: f64,
    factor: f64,
) -> AssetCapSeries {
    let points = (0..days)
        .map(|i| CapPoint {
            date: start + Days::new(i),
            market_cap: first_cap * factor.powi(i as i32),
        })
        .collect();
    AssetCapSeries::new(symbol, points)
}

pub struct MockMarketData {
    pub series: HashMap<String, AssetCapSeries>,
    pub excluded: HashSet<String>,
    pub failing: Cell<bool>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            excluded: HashSet::new(),
            failing: Cell::new(false),
        }
    }

    pub fn with_series(mut self, series: AssetCapSeries) -> Self {
        self.series.insert(series.symbol.clone(), series);
        self
    }

    pub fn excluding(mut self, symbol: &str) -> Self {
        self.excluded.insert(symbol.to_string());
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }
}

impl MarketDataPort for MockMarketData {
    fn basket_candidates(&self) -> Result<Vec<Candidate>, AltdipError> {
        if self.failing.get() {
            return Err(AltdipError::MarketData {
                reason: "provider unavailable".into(),
            });
        }
        let mut candidates: Vec<Candidate> = self
            .series
            .values()
            .filter_map(|s| {
                s.latest().map(|p| Candidate {
                    symbol: s.symbol.clone(),
                    market_cap: p.market_cap,
                })
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.market_cap
                .total_cmp(&a.market_cap)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        Ok(candidates)
    }

    fn cap_history(&self, symbol: &str) -> Result<AssetCapSeries, AltdipError> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| AltdipError::MarketData {
                reason: format!("no history for {symbol}"),
            })
    }

    fn is_eligible(&self, symbol: &str) -> bool {
        !self.excluded.contains(symbol)
    }
}

/// State store that keeps every saved document in order.
#[derive(Default)]
pub struct InMemoryState {
    pub current: RefCell<Option<BotState>>,
    pub saves: RefCell<Vec<BotState>>,
}

impl InMemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding(state: BotState) -> Self {
        Self {
            current: RefCell::new(Some(state)),
            saves: RefCell::new(Vec::new()),
        }
    }

    pub fn saved(&self) -> Vec<BotState> {
        self.saves.borrow().clone()
    }

    pub fn current(&self) -> Option<BotState> {
        self.current.borrow().clone()
    }
}

impl StatePort for InMemoryState {
    fn load(&self) -> Result<Option<BotState>, AltdipError> {
        Ok(self.current.borrow().clone())
    }

    fn save(&self, state: &BotState) -> Result<(), AltdipError> {
        *self.current.borrow_mut() = Some(state.clone());
        self.saves.borrow_mut().push(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AltdipError> {
        *self.current.borrow_mut() = None;
        Ok(())
    }
}

pub struct FixedClock {
    pub today: Cell<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Cell::new(today),
        }
    }

    pub fn advance(&self, days: u64) {
        self.today.set(self.today.get() + Days::new(days));
    }
}

impl ClockPort for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today.get()
    }
}

/// Three assets whose caps fall 1% a day from 2024-01-01 for `days` days,
/// in a 3:2:1 ratio.
pub fn falling_market(days: u64) -> MockMarketData {
    let start = date(2024, 1, 1);
    MockMarketData::new()
        .with_series(trending_series("SOL", start, days, 3_000.0, 0.99))
        .with_series(trending_series("ADA", start, days, 2_000.0, 0.99))
        .with_series(trending_series("DOT", start, days, 1_000.0, 0.99))
}

/// Venue holding only quote cash, with flat books for the falling market.
pub fn cash_venue(cash: f64) -> PaperVenue {
    PaperVenue::new("USDT", cash)
        .with_book("SOL", 10.0, 10.0)
        .with_book("ADA", 10.0, 10.0)
        .with_book("DOT", 10.0, 10.0)
}

pub fn bot_config(extra: &str) -> BotConfig {
    let content = format!("[state]\npath = /tmp/altdip-unused.json\n{extra}");
    let adapter = FileConfigAdapter::from_string(&content).unwrap();
    build_bot_config(&adapter).unwrap()
}
