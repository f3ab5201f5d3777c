//! Exchange venue port trait.

use std::collections::BTreeMap;

use crate::domain::error::AltdipError;
use crate::domain::lot::LotConstraints;
use crate::domain::order::{BookTop, LimitOrder, OpenOrder, OrderOutcome};

pub trait VenuePort {
    /// Free balance per asset symbol, quote asset included.
    fn balances(&self) -> Result<BTreeMap<String, f64>, AltdipError>;

    fn open_orders(&self) -> Result<Vec<OpenOrder>, AltdipError>;

    fn cancel_order(&self, order: &OpenOrder) -> Result<(), AltdipError>;

    fn order_book_top(&self, pair: &str) -> Result<BookTop, AltdipError>;

    fn place_limit_order(&self, order: &LimitOrder) -> Result<OrderOutcome, AltdipError>;

    fn lot_constraints(&self, pair: &str) -> Result<LotConstraints, AltdipError>;
}
