//! Per-asset daily market-cap history.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapPoint {
    pub date: NaiveDate,
    pub market_cap: f64,
}

/// Date-ordered market caps for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetCapSeries {
    pub symbol: String,
    pub points: Vec<CapPoint>,
}

impl AssetCapSeries {
    /// Builds a series, sorting by date and keeping the last value seen for
    /// a duplicated day.
    pub fn new(symbol: impl Into<String>, mut points: Vec<CapPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<CapPoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }
        Self {
            symbol: symbol.into(),
            points: deduped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&CapPoint> {
        self.points.last()
    }
}

/// An entry of the provider's ranked candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub symbol: String,
    pub market_cap: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(d: u32, cap: f64) -> CapPoint {
        CapPoint {
            date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
            market_cap: cap,
        }
    }

    #[test]
    fn new_sorts_by_date() {
        let series = AssetCapSeries::new("SOL", vec![point(3, 3.0), point(1, 1.0), point(2, 2.0)]);
        let caps: Vec<f64> = series.points.iter().map(|p| p.market_cap).collect();
        assert_eq!(caps, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn new_keeps_last_duplicate() {
        let series = AssetCapSeries::new("SOL", vec![point(1, 1.0), point(1, 5.0), point(2, 2.0)]);
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].market_cap, 5.0);
    }

    #[test]
    fn latest_point() {
        let series = AssetCapSeries::new("ADA", vec![point(1, 1.0), point(9, 9.0)]);
        assert_eq!(series.latest().map(|p| p.market_cap), Some(9.0));
        assert!(AssetCapSeries::new("ADA", vec![]).latest().is_none());
    }
}
