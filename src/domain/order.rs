//! Venue order types shared by the executor and venue adapters.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// Builds the venue pair symbol for `asset` quoted in `quote`.
pub fn pair_symbol(asset: &str, quote: &str) -> String {
    format!("{asset}{quote}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub id: String,
    pub pair: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
}

/// Best bid and ask of a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookTop {
    pub bid: f64,
    pub ask: f64,
}

impl BookTop {
    pub fn is_valid(&self) -> bool {
        self.bid > 0.0 && self.ask > 0.0 && self.bid.is_finite() && self.ask.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitOrder {
    pub pair: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
}

impl LimitOrder {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    /// Executed quantity and average price. May be less than requested.
    Filled { quantity: f64, price: f64 },
    Rejected { reason: String },
}
