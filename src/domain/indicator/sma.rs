//! Trailing simple average over another indicator series.
//!
//! SMA(n)[i] = mean(source[i-n+1..=i]); valid only when all n source points
//! in the window are valid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_sma(source: &IndicatorSeries, window: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(source.values.len());

    for (i, point) in source.values.iter().enumerate() {
        if window == 0 || i + 1 < window {
            values.push(IndicatorPoint::invalid(point.date));
            continue;
        }
        let slice = &source.values[i + 1 - window..=i];
        if slice.iter().all(|p| p.valid) {
            let mean = slice.iter().map(|p| p.value).sum::<f64>() / window as f64;
            values.push(IndicatorPoint {
                date: point.date,
                valid: true,
                value: mean,
            });
        } else {
            values.push(IndicatorPoint::invalid(point.date));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(window),
        values,
    }
}
