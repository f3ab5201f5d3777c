//! RSI (Relative Strength Index) with exponentially smoothed gains/losses.
//!
//! Day-over-day gains and losses are averaged with an exponential moving
//! average whose smoothing constant is alpha = 1/period (Wilder's smoothing),
//! seeded with the first price change:
//! - avg[1] = change[1]
//! - avg[i] = avg[i-1] * (1 - alpha) + change[i] * alpha
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, or undefined when avg_gain is also 0.
//!
//! The first point has no price change and is always invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, PricePoint};

pub fn calculate_rsi(prices: &[PricePoint], period: usize) -> IndicatorSeries {
    if period == 0 || prices.len() < 2 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: prices.iter().map(|p| IndicatorPoint::invalid(p.date)).collect(),
        };
    }

    let alpha = 1.0 / period as f64;
    let mut values = Vec::with_capacity(prices.len());
    values.push(IndicatorPoint::invalid(prices[0].date));

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..prices.len() {
        let change = prices[i].close - prices[i - 1].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i == 1 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = avg_gain * (1.0 - alpha) + gain * alpha;
            avg_loss = avg_loss * (1.0 - alpha) + loss * alpha;
        }

        let point = match rsi_from_averages(avg_gain, avg_loss) {
            Some(rsi) => IndicatorPoint {
                date: prices[i].date,
                valid: true,
                value: rsi,
            },
            None => IndicatorPoint::invalid(prices[i].date),
        };
        values.push(point);
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }
    if avg_loss == 0.0 {
        return (avg_gain > 0.0).then_some(100.0);
    }
    Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_prices(closes: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + chrono::Duration::days(i as i64),
                close,
            })
            .collect()
    }

    #[test]
    fn rsi_empty_prices() {
        let series = calculate_rsi(&[], 14);
        assert!(series.values.is_empty());
    }

    #[test]
    fn rsi_single_price() {
        let series = calculate_rsi(&make_prices(&[100.0]), 14);
        assert_eq!(series.values.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_valid_from_second_point() {
        let series = calculate_rsi(&make_prices(&[100.0, 101.0, 100.5]), 14);
        assert!(!series.values[0].valid);
        assert!(series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn rsi_known_calculation() {
        // gains: 1, 0 ; losses: 0, 1
        // avg_gain = 1 * 13/14, avg_loss = 1/14 -> rs = 13
        let series = calculate_rsi(&make_prices(&[1.0, 2.0, 1.0]), 14);
        assert_relative_eq!(series.values[1].value, 100.0);
        assert_relative_eq!(series.values[2].value, 100.0 - 100.0 / 14.0, epsilon = 1e-12);
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_prices(&closes), 14);
        assert_relative_eq!(series.latest().unwrap(), 100.0);
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_prices(&closes), 14);
        assert_relative_eq!(series.latest().unwrap(), 0.0);
    }

    #[test]
    fn rsi_flat_prices_are_undefined() {
        let series = calculate_rsi(&make_prices(&[5.0, 5.0, 5.0]), 14);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn rsi_in_range() {
        let closes: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&make_prices(&closes), 14);
        for point in series.values.iter().filter(|p| p.valid) {
            assert!(
                (0.0..=100.0).contains(&point.value),
                "RSI {} out of range",
                point.value
            );
        }
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&make_prices(&[100.0, 101.0]), 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
        assert_eq!(series.indicator_type, IndicatorType::Rsi(0));
    }
}
