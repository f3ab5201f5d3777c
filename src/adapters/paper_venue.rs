//! In-memory paper-trading venue.
//!
//! Limit orders fill immediately at their limit price against the stored
//! balances. A per-order notional cap simulates partial fills and individual
//! assets can be set to reject every order.

use crate::domain::error::AltdipError;
use crate::domain::lot::LotConstraints;
use crate::domain::order::{pair_symbol, BookTop, LimitOrder, OpenOrder, OrderOutcome, Side};
use crate::ports::venue_port::VenuePort;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Default)]
struct Book {
    balances: BTreeMap<String, f64>,
    open_orders: Vec<OpenOrder>,
    placed: Vec<LimitOrder>,
    cancelled: Vec<String>,
}

#[derive(Debug)]
pub struct PaperVenue {
    quote: String,
    books: HashMap<String, BookTop>,
    lots: HashMap<String, LotConstraints>,
    default_lot: LotConstraints,
    fill_cap: Option<f64>,
    rejecting: HashSet<String>,
    book: RefCell<Book>,
}

impl PaperVenue {
    pub fn new(quote: &str, cash: f64) -> Self {
        let mut balances = BTreeMap::new();
        balances.insert(quote.to_string(), cash);
        PaperVenue {
            quote: quote.to_string(),
            books: HashMap::new(),
            lots: HashMap::new(),
            default_lot: LotConstraints {
                step_quantity: 0.0,
                step_price: 0.0,
                min_notional: 0.0,
            },
            fill_cap: None,
            rejecting: HashSet::new(),
            book: RefCell::new(Book {
                balances,
                ..Book::default()
            }),
        }
    }

    pub fn with_balance(self, asset: &str, quantity: f64) -> Self {
        self.book
            .borrow_mut()
            .balances
            .insert(asset.to_string(), quantity);
        self
    }

    pub fn with_book(mut self, asset: &str, bid: f64, ask: f64) -> Self {
        self.books
            .insert(pair_symbol(asset, &self.quote), BookTop { bid, ask });
        self
    }

    pub fn with_lot(mut self, asset: &str, lot: LotConstraints) -> Self {
        self.lots.insert(pair_symbol(asset, &self.quote), lot);
        self
    }

    pub fn with_default_lot(mut self, lot: LotConstraints) -> Self {
        self.default_lot = lot;
        self
    }

    /// Caps the quote notional filled per order.
    pub fn with_fill_cap(mut self, notional: f64) -> Self {
        self.fill_cap = Some(notional);
        self
    }

    pub fn rejecting(mut self, asset: &str) -> Self {
        self.rejecting.insert(pair_symbol(asset, &self.quote));
        self
    }

    pub fn with_open_order(self, order: OpenOrder) -> Self {
        self.book.borrow_mut().open_orders.push(order);
        self
    }

    pub fn set_book(&mut self, asset: &str, bid: f64, ask: f64) {
        self.books
            .insert(pair_symbol(asset, &self.quote), BookTop { bid, ask });
    }

    pub fn balance(&self, asset: &str) -> f64 {
        self.book
            .borrow()
            .balances
            .get(asset)
            .copied()
            .unwrap_or(0.0)
    }

    /// Marks every non-quote balance at its bid and adds the quote balance.
    pub fn total_value(&self) -> f64 {
        self.book
            .borrow()
            .balances
            .iter()
            .map(|(asset, &qty)| {
                if *asset == self.quote {
                    qty
                } else {
                    self.books
                        .get(&pair_symbol(asset, &self.quote))
                        .map_or(0.0, |b| qty * b.bid)
                }
            })
            .sum()
    }

    pub fn placed_orders(&self) -> Vec<LimitOrder> {
        self.book.borrow().placed.clone()
    }

    pub fn cancelled_orders(&self) -> Vec<String> {
        self.book.borrow().cancelled.clone()
    }

    fn asset_of<'p>(&self, pair: &'p str) -> Result<&'p str, AltdipError> {
        pair.strip_suffix(self.quote.as_str())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AltdipError::venue(pair, "unknown pair"))
    }
}

impl VenuePort for PaperVenue {
    fn balances(&self) -> Result<BTreeMap<String, f64>, AltdipError> {
        Ok(self.book.borrow().balances.clone())
    }

    fn open_orders(&self) -> Result<Vec<OpenOrder>, AltdipError> {
        Ok(self.book.borrow().open_orders.clone())
    }

    fn cancel_order(&self, order: &OpenOrder) -> Result<(), AltdipError> {
        let mut book = self.book.borrow_mut();
        book.open_orders.retain(|o| o.id != order.id);
        book.cancelled.push(order.id.clone());
        Ok(())
    }

    fn order_book_top(&self, pair: &str) -> Result<BookTop, AltdipError> {
        self.books
            .get(pair)
            .copied()
            .ok_or_else(|| AltdipError::venue(pair, "no order book"))
    }

    fn place_limit_order(&self, order: &LimitOrder) -> Result<OrderOutcome, AltdipError> {
        let asset = self.asset_of(&order.pair)?;
        let mut book = self.book.borrow_mut();
        book.placed.push(order.clone());

        if self.rejecting.contains(&order.pair) {
            return Ok(OrderOutcome::Rejected {
                reason: "pair is not accepting orders".to_string(),
            });
        }

        let mut quantity = order.quantity;
        if let Some(cap) = self.fill_cap {
            quantity = quantity.min(cap / order.price);
        }

        let quote_balance = book.balances.get(&self.quote).copied().unwrap_or(0.0);
        let asset_balance = book.balances.get(asset).copied().unwrap_or(0.0);
        match order.side {
            Side::Buy => {
                let cost = quantity * order.price;
                if cost > quote_balance + 1e-9 {
                    return Ok(OrderOutcome::Rejected {
                        reason: "insufficient balance".to_string(),
                    });
                }
                book.balances
                    .insert(self.quote.clone(), quote_balance - cost);
                book.balances
                    .insert(asset.to_string(), asset_balance + quantity);
            }
            Side::Sell => {
                quantity = quantity.min(asset_balance);
                book.balances
                    .insert(self.quote.clone(), quote_balance + quantity * order.price);
                book.balances
                    .insert(asset.to_string(), asset_balance - quantity);
            }
        }

        debug!(pair = %order.pair, side = %order.side, quantity, price = order.price, "paper fill");
        Ok(OrderOutcome::Filled {
            quantity,
            price: order.price,
        })
    }

    fn lot_constraints(&self, pair: &str) -> Result<LotConstraints, AltdipError> {
        Ok(self.lots.get(pair).copied().unwrap_or(self.default_lot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn venue() -> PaperVenue {
        PaperVenue::new("USDT", 1000.0)
            .with_balance("SOL", 2.0)
            .with_book("SOL", 100.0, 101.0)
    }

    fn order(side: Side, quantity: f64, price: f64) -> LimitOrder {
        LimitOrder {
            pair: "SOLUSDT".into(),
            side,
            quantity,
            price,
        }
    }

    #[test]
    fn buy_moves_cash_into_asset() {
        let v = venue();
        let outcome = v.place_limit_order(&order(Side::Buy, 3.0, 100.0)).unwrap();
        assert_eq!(
            outcome,
            OrderOutcome::Filled {
                quantity: 3.0,
                price: 100.0
            }
        );
        assert_relative_eq!(v.balance("USDT"), 700.0);
        assert_relative_eq!(v.balance("SOL"), 5.0);
    }

    #[test]
    fn sell_is_capped_by_balance() {
        let v = venue();
        v.place_limit_order(&order(Side::Sell, 5.0, 101.0)).unwrap();
        assert_relative_eq!(v.balance("SOL"), 0.0);
        assert_relative_eq!(v.balance("USDT"), 1202.0);
    }

    #[test]
    fn fill_cap_gives_partial_fill() {
        let v = venue().with_fill_cap(150.0);
        let outcome = v.place_limit_order(&order(Side::Buy, 3.0, 100.0)).unwrap();
        assert_eq!(
            outcome,
            OrderOutcome::Filled {
                quantity: 1.5,
                price: 100.0
            }
        );
    }

    #[test]
    fn insufficient_cash_is_rejected() {
        let v = venue();
        let outcome = v.place_limit_order(&order(Side::Buy, 20.0, 100.0)).unwrap();
        assert!(matches!(outcome, OrderOutcome::Rejected { .. }));
        assert_eq!(v.placed_orders().len(), 1);
    }

    #[test]
    fn rejecting_pair() {
        let v = venue().rejecting("SOL");
        let outcome = v.place_limit_order(&order(Side::Sell, 1.0, 101.0)).unwrap();
        assert!(matches!(outcome, OrderOutcome::Rejected { .. }));
        assert_relative_eq!(v.balance("SOL"), 2.0);
    }

    #[test]
    fn cancel_removes_open_order() {
        let v = venue().with_open_order(OpenOrder {
            id: "42".into(),
            pair: "SOLUSDT".into(),
            side: Side::Buy,
            quantity: 1.0,
            price: 90.0,
        });
        let open = v.open_orders().unwrap();
        v.cancel_order(&open[0]).unwrap();
        assert!(v.open_orders().unwrap().is_empty());
        assert_eq!(v.cancelled_orders(), vec!["42".to_string()]);
    }

    #[test]
    fn unknown_book_is_venue_error() {
        let err = venue().order_book_top("XRPUSDT").unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn total_value_marks_at_bid() {
        assert_relative_eq!(venue().total_value(), 1200.0);
    }
}
