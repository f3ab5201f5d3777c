//! Single-threaded polling loop.
//!
//! Each tick:
//! 1. loads the persisted state on the first tick only
//! 2. rebuilds index, oscillator and target weights when the calendar day
//!    changed
//! 3. decays cooldowns by the days elapsed and persists
//! 4. when idle, evaluates today's signal; a fired action arms its cooldown
//!    and is persisted as the new operation before any order goes out
//! 5. steps the rebalance executor for the operation in flight

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::config::BotConfig;
use crate::domain::error::AltdipError;
use crate::domain::index_builder::{target_weights, IndexBuilder, IndexRecord};
use crate::domain::operation::{Action, OperationState};
use crate::domain::oscillator::{OscillatorEngine, OscillatorSeries};
use crate::domain::portfolio::TargetWeights;
use crate::domain::rebalance::{RebalanceExecutor, StepOutcome};
use crate::domain::signal::SignalEngine;
use crate::domain::state::{load_or_default, BotState};
use crate::domain::universe::collect_cap_histories;
use crate::ports::clock_port::ClockPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::state_port::StatePort;
use crate::ports::venue_port::VenuePort;

/// Index-derived inputs, rebuilt once per calendar day.
#[derive(Debug, Clone)]
pub struct MarketView {
    pub refreshed_on: NaiveDate,
    pub records: Vec<IndexRecord>,
    pub oscillator: OscillatorSeries,
    pub weights: TargetWeights,
}

impl MarketView {
    pub fn latest_close(&self) -> Option<f64> {
        self.records.last().map(|r| r.close)
    }

    /// The last `window` closes, oldest first.
    pub fn recent_closes(&self, window: usize) -> Vec<f64> {
        let start = self.records.len().saturating_sub(window);
        self.records[start..].iter().map(|r| r.close).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub date: NaiveDate,
    /// Action started on this tick, `Action::None` otherwise.
    pub fired: Action,
    pub outcome: StepOutcome,
}

pub struct Scheduler<'a> {
    market_data: &'a dyn MarketDataPort,
    store: &'a dyn StatePort,
    clock: &'a dyn ClockPort,
    index: IndexBuilder,
    oscillator: OscillatorEngine,
    signals: SignalEngine,
    executor: RebalanceExecutor<'a>,
    tick_interval: Duration,
    state: Option<BotState>,
    market: Option<MarketView>,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        config: &BotConfig,
        market_data: &'a dyn MarketDataPort,
        venue: &'a dyn VenuePort,
        store: &'a dyn StatePort,
        clock: &'a dyn ClockPort,
    ) -> Self {
        Scheduler {
            market_data,
            store,
            clock,
            index: config.index.clone(),
            oscillator: config.oscillator,
            signals: SignalEngine::new(config.signals.clone()),
            executor: RebalanceExecutor::new(venue, store, config.executor.clone()),
            tick_interval: config.tick_interval,
            state: None,
            market: None,
        }
    }

    pub fn state(&self) -> Option<&BotState> {
        self.state.as_ref()
    }

    pub fn market(&self) -> Option<&MarketView> {
        self.market.as_ref()
    }

    pub fn tick(&mut self) -> Result<TickReport, AltdipError> {
        let today = self.clock.today();
        let mut state = match self.state.take() {
            Some(state) => state,
            None => load_or_default(self.store, today),
        };
        let result = self.tick_with(&mut state, today);
        self.state = Some(state);
        result
    }

    /// Ticks until `max_ticks` have run (forever when `None`), sleeping the
    /// configured interval between ticks. Transient errors are logged and
    /// retried on the next tick; any other error stops the loop.
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<u64, AltdipError> {
        let mut ticks = 0;
        loop {
            match self.tick() {
                Ok(report) => debug!(date = %report.date, fired = %report.fired, outcome = ?report.outcome, "tick"),
                Err(e) if e.is_transient() => warn!(error = %e, "tick failed, retrying next tick"),
                Err(e) => return Err(e),
            }
            ticks += 1;
            if max_ticks.is_some_and(|max| ticks >= max) {
                return Ok(ticks);
            }
            thread::sleep(self.tick_interval);
        }
    }

    fn tick_with(&mut self, state: &mut BotState, today: NaiveDate) -> Result<TickReport, AltdipError> {
        self.refresh_market(today)?;

        if today < state.cooldown.last_update_date {
            warn!(
                today = %today,
                last_update = %state.cooldown.last_update_date,
                "clock is behind the persisted state, cooldowns left unchanged"
            );
        }
        let elapsed = state.cooldown.decay_to(today);
        if elapsed > 0 {
            self.store.save(state)?;
            debug!(days = elapsed, "cooldowns decayed");
        }

        let Some(market) = self.market.as_ref() else {
            return Err(AltdipError::NoData {
                reason: "no index available".to_string(),
            });
        };

        let mut fired = Action::None;
        if state.operation.is_idle() {
            if let Some(close) = market.latest_close() {
                let window = market.recent_closes(self.signals.config.stop_loss.win_sl);
                let action = self.signals.evaluate(
                    market.oscillator.latest(),
                    close,
                    &window,
                    &state.cooldown,
                );
                if !action.is_none() {
                    self.signals.fire(action, close, &mut state.cooldown);
                    state.operation = OperationState::start(action);
                    self.store.save(state)?;
                    info!(
                        action = %action,
                        close,
                        oscillator = market.oscillator.latest(),
                        "signal fired"
                    );
                    fired = action;
                }
            }
        }

        let share = self.signals.config.share_for(state.operation.operation);
        let outcome = self.executor.step(state, &market.weights, share)?;

        Ok(TickReport {
            date: today,
            fired,
            outcome,
        })
    }

    /// Rebuilds the market view when the day changed. A failed refresh keeps
    /// yesterday's view if there is one.
    fn refresh_market(&mut self, today: NaiveDate) -> Result<(), AltdipError> {
        if self.market.as_ref().is_some_and(|m| m.refreshed_on == today) {
            return Ok(());
        }
        match self.build_market(today) {
            Ok(view) => {
                info!(
                    date = %today,
                    days = view.records.len(),
                    members = view.weights.len(),
                    close = view.latest_close(),
                    oscillator = view.oscillator.latest(),
                    "market view refreshed"
                );
                self.market = Some(view);
                Ok(())
            }
            Err(e) if self.market.is_some() && e.is_transient() => {
                warn!(error = %e, "market refresh failed, keeping previous view");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn build_market(&self, today: NaiveDate) -> Result<MarketView, AltdipError> {
        let universe = collect_cap_histories(self.market_data)?;
        let records = self.index.build(&universe.histories);
        let oscillator = self.oscillator.compute_for_index(&records);
        let weights = target_weights(&records);
        Ok(MarketView {
            refreshed_on: today,
            records,
            oscillator,
            weights,
        })
    }
}
