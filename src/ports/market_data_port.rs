//! Market-cap data provider port trait.

use crate::domain::error::AltdipError;
use crate::domain::market_cap::{AssetCapSeries, Candidate};

pub trait MarketDataPort {
    /// Candidate assets ordered by current market cap, largest first.
    fn basket_candidates(&self) -> Result<Vec<Candidate>, AltdipError>;

    fn cap_history(&self, symbol: &str) -> Result<AssetCapSeries, AltdipError>;

    /// False for stablecoins, wrapped majors and symbols the venue does not
    /// trade.
    fn is_eligible(&self, symbol: &str) -> bool;
}
