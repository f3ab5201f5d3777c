//! Resumable rebalance executor.
//!
//! Drives the venue portfolio toward the goal balance of the in-flight
//! operation, one pass per scheduler tick. Each pass cancels stale orders,
//! re-reads balances, derives the goal if none is recorded yet, and places
//! limit orders toward the per-asset targets `goal * weight`. The goal is
//! persisted before the first order so a restart resumes toward the same
//! target instead of deriving a new one.
//!
//! Goals are expressed in holdings value (quote-asset value of every
//! non-quote balance, marked at the best bid):
//! - buy: holdings + share * cash
//! - sell: holdings - share * holdings, zero when that lands inside the
//!   precision threshold

use tracing::{debug, info, warn};

use crate::domain::error::AltdipError;
use crate::domain::lot::{size_order, SizedOrder};
use crate::domain::operation::Action;
use crate::domain::order::{pair_symbol, LimitOrder, OrderOutcome, Side};
use crate::domain::portfolio::{Holding, Portfolio, TargetWeights};
use crate::domain::state::BotState;
use crate::ports::state_port::StatePort;
use crate::ports::venue_port::VenuePort;

pub const DEFAULT_PRECISION_THRESHOLD: f64 = 20.0;
pub const DEFAULT_MAX_STALLED_TICKS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    pub quote_asset: String,
    /// Absolute quote-asset tolerance under which a goal counts as reached.
    pub precision_threshold: f64,
    pub max_stalled_ticks: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            quote_asset: "USDT".to_string(),
            precision_threshold: DEFAULT_PRECISION_THRESHOLD,
            max_stalled_ticks: DEFAULT_MAX_STALLED_TICKS,
        }
    }
}

/// Result of one executor pass.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// No operation in flight.
    Idle,
    /// Goal reached; the operation was cleared.
    Reached { goal: f64, value: f64 },
    /// Orders filled this pass; the goal is still open.
    Progress { fills: usize, goal: f64, value: f64 },
    /// Nothing filled this pass.
    Stalled { ticks: u32 },
    /// Too many stalled passes in a row; the operation was cleared.
    Abandoned { goal: f64, value: f64 },
}

/// Goal balance for a freshly started operation.
pub fn goal_for(action: Action, portfolio: &Portfolio, share: f64, threshold: f64) -> f64 {
    let holdings = portfolio.holdings_value();
    match action {
        Action::Buy => holdings + share * portfolio.cash,
        Action::SellTakeProfit | Action::SellStopLoss => {
            let goal = holdings - share * holdings;
            if goal < threshold { 0.0 } else { goal }
        }
        Action::None => holdings,
    }
}

/// True once the holdings value is within `threshold` of `goal` on the side
/// the operation is moving toward.
pub fn goal_reached(action: Action, goal: f64, holdings_value: f64, threshold: f64) -> bool {
    match action {
        Action::Buy => goal - holdings_value <= threshold,
        Action::SellTakeProfit | Action::SellStopLoss => holdings_value - goal <= threshold,
        Action::None => true,
    }
}

pub struct RebalanceExecutor<'a> {
    venue: &'a dyn VenuePort,
    store: &'a dyn StatePort,
    config: ExecutorConfig,
}

impl<'a> RebalanceExecutor<'a> {
    pub fn new(venue: &'a dyn VenuePort, store: &'a dyn StatePort, config: ExecutorConfig) -> Self {
        RebalanceExecutor {
            venue,
            store,
            config,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs one pass of the in-flight operation in `state`, persisting every
    /// change to the operation record before returning.
    pub fn step(
        &self,
        state: &mut BotState,
        weights: &TargetWeights,
        share: f64,
    ) -> Result<StepOutcome, AltdipError> {
        let action = state.operation.operation;
        if action.is_none() {
            return Ok(StepOutcome::Idle);
        }
        let threshold = self.config.precision_threshold;

        self.cancel_open_orders()?;
        let mut portfolio = self.snapshot(weights)?;

        let goal = match state.operation.goal_balance {
            Some(goal) => goal,
            None => {
                let goal = goal_for(action, &portfolio, share, threshold);
                state.operation.goal_balance = Some(goal);
                self.store.save(state)?;
                info!(
                    operation = %action,
                    goal,
                    holdings = portfolio.holdings_value(),
                    cash = portfolio.cash,
                    "goal balance set"
                );
                goal
            }
        };

        if goal_reached(action, goal, portfolio.holdings_value(), threshold) {
            return self.finish(state, goal, portfolio.holdings_value());
        }

        let fills = match action {
            Action::Buy => self.buy_pass(goal, weights, &mut portfolio)?,
            _ => self.sell_pass(goal, weights, &mut portfolio)?,
        };

        let value = self.snapshot(weights)?.holdings_value();
        if goal_reached(action, goal, value, threshold) {
            return self.finish(state, goal, value);
        }

        if fills > 0 {
            state.operation.stalled_ticks = 0;
            self.store.save(state)?;
            debug!(operation = %action, fills, goal, value, "rebalance progressing");
            return Ok(StepOutcome::Progress { fills, goal, value });
        }

        state.operation.stalled_ticks += 1;
        let ticks = state.operation.stalled_ticks;
        if ticks >= self.config.max_stalled_ticks {
            warn!(
                operation = %action,
                goal,
                value,
                ticks,
                "no fills for too long, abandoning operation"
            );
            state.operation.clear();
            self.store.save(state)?;
            return Ok(StepOutcome::Abandoned { goal, value });
        }
        self.store.save(state)?;
        warn!(operation = %action, goal, value, ticks, "rebalance pass placed no fills");
        Ok(StepOutcome::Stalled { ticks })
    }

    fn finish(
        &self,
        state: &mut BotState,
        goal: f64,
        value: f64,
    ) -> Result<StepOutcome, AltdipError> {
        info!(operation = %state.operation.operation, goal, value, "goal reached");
        state.operation.clear();
        self.store.save(state)?;
        Ok(StepOutcome::Reached { goal, value })
    }

    fn cancel_open_orders(&self) -> Result<(), AltdipError> {
        for order in self.venue.open_orders()? {
            debug!(id = %order.id, pair = %order.pair, side = %order.side, "cancelling open order");
            self.venue.cancel_order(&order)?;
        }
        Ok(())
    }

    /// Current cash and holdings. Non-quote balances are marked at the best
    /// bid; empty balances are left out.
    fn snapshot(&self, weights: &TargetWeights) -> Result<Portfolio, AltdipError> {
        let balances = self.venue.balances()?;
        let quote = &self.config.quote_asset;
        let mut portfolio = Portfolio::new(balances.get(quote).copied().unwrap_or(0.0));

        for (asset, &quantity) in &balances {
            if asset == quote || quantity <= 0.0 {
                continue;
            }
            let book = self.venue.order_book_top(&pair_symbol(asset, quote))?;
            if !book.is_valid() {
                warn!(asset = %asset, in_basket = weights.contains(asset), "no usable book, holding left unvalued");
                continue;
            }
            portfolio.add_holding(Holding {
                asset: asset.clone(),
                quantity,
                price: book.bid,
            });
        }
        Ok(portfolio)
    }

    fn buy_pass(
        &self,
        goal: f64,
        weights: &TargetWeights,
        portfolio: &mut Portfolio,
    ) -> Result<usize, AltdipError> {
        let threshold = self.config.precision_threshold;
        let mut fills = 0;

        for (asset, weight) in weights.iter() {
            let target = goal * weight;
            let shortfall = target - portfolio.holding_value(asset);
            if shortfall <= threshold {
                continue;
            }
            let amount = shortfall.min(portfolio.cash);
            if amount < threshold {
                debug!(asset, shortfall, cash = portfolio.cash, "cash exhausted");
                continue;
            }

            let pair = pair_symbol(asset, &self.config.quote_asset);
            let book = self.venue.order_book_top(&pair)?;
            if !book.is_valid() {
                warn!(pair = %pair, "no usable book, skipping buy");
                continue;
            }
            if let Some((quantity, price)) = self.place(&pair, Side::Buy, amount / book.bid, book.bid)? {
                portfolio.apply_buy(asset, quantity, price);
                fills += 1;
            }
        }
        Ok(fills)
    }

    fn sell_pass(
        &self,
        goal: f64,
        weights: &TargetWeights,
        portfolio: &mut Portfolio,
    ) -> Result<usize, AltdipError> {
        let threshold = self.config.precision_threshold;
        let mut fills = 0;
        let held: Vec<Holding> = portfolio.holdings.values().cloned().collect();

        for holding in held {
            let weight = weights.get(&holding.asset);
            let current = holding.value();
            let excess = current - goal * weight;
            // Assets outside the basket are sold whatever their size; the
            // venue minimum decides whether the order goes out.
            if current <= 0.0 || (weight > 0.0 && excess <= threshold) {
                continue;
            }
            let quantity = if weight == 0.0 {
                holding.quantity
            } else {
                holding.quantity * (excess / current)
            };

            let pair = pair_symbol(&holding.asset, &self.config.quote_asset);
            let book = self.venue.order_book_top(&pair)?;
            if !book.is_valid() {
                warn!(pair = %pair, "no usable book, skipping sell");
                continue;
            }
            if let Some((sold, price)) = self.place(&pair, Side::Sell, quantity, book.ask)? {
                portfolio.apply_sell(&holding.asset, sold, price);
                fills += 1;
                let left = portfolio.get_holding(&holding.asset).map_or(0.0, |h| h.quantity);
                if weight == 0.0 && left <= 0.0 {
                    portfolio.remove_holding(&holding.asset);
                    info!(asset = %holding.asset, "left the basket, position closed");
                }
            }
        }
        Ok(fills)
    }

    /// Sizes and places one limit order. Returns the fill, or `None` when
    /// the order is below the venue minimum or was rejected.
    fn place(
        &self,
        pair: &str,
        side: Side,
        quantity: f64,
        price: f64,
    ) -> Result<Option<(f64, f64)>, AltdipError> {
        let constraints = self.venue.lot_constraints(pair)?;
        let (quantity, price) = match size_order(quantity, price, &constraints) {
            SizedOrder::Sized {
                quantity, price, ..
            } => (quantity, price),
            SizedOrder::BelowMinimum {
                notional,
                min_notional,
            } => {
                warn!(pair, %side, notional, min_notional, "order below venue minimum, skipped");
                return Ok(None);
            }
        };

        let order = LimitOrder {
            pair: pair.to_string(),
            side,
            quantity,
            price,
        };
        match self.venue.place_limit_order(&order)? {
            OrderOutcome::Filled { quantity, price } if quantity > 0.0 => {
                info!(pair, %side, quantity, price, "order filled");
                Ok(Some((quantity, price)))
            }
            OrderOutcome::Filled { .. } => {
                debug!(pair, %side, "order left unfilled");
                Ok(None)
            }
            OrderOutcome::Rejected { reason } => {
                warn!(pair, %side, reason = %reason, "order rejected");
                Ok(None)
            }
        }
    }
}
