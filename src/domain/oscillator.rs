//! Momentum oscillator consumed by the signal engine: an RSI over the index
//! close, smoothed by a trailing average over its most recent valid values.

use crate::domain::index_builder::IndexRecord;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{IndicatorSeries, PricePoint};

pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct OscillatorSeries {
    pub raw: IndicatorSeries,
    pub smoothed: IndicatorSeries,
}

impl OscillatorSeries {
    /// Smoothed value at `index`, `None` while undefined.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.smoothed.value_at(index)
    }

    pub fn latest(&self) -> Option<f64> {
        self.smoothed.latest()
    }

    pub fn len(&self) -> usize {
        self.smoothed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.smoothed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorEngine {
    pub period: usize,
    pub smoothing: usize,
}

impl Default for OscillatorEngine {
    fn default() -> Self {
        OscillatorEngine {
            period: DEFAULT_RSI_PERIOD,
            smoothing: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

impl OscillatorEngine {
    pub fn compute(&self, prices: &[PricePoint]) -> OscillatorSeries {
        let raw = calculate_rsi(prices, self.period);
        let smoothed = calculate_sma(&raw, self.smoothing);
        OscillatorSeries { raw, smoothed }
    }

    pub fn compute_for_index(&self, records: &[IndexRecord]) -> OscillatorSeries {
        let prices: Vec<PricePoint> = records.iter().map(PricePoint::from).collect();
        self.compute(&prices)
    }
}
