//! Signal engine: turns the smoothed oscillator and the index close into at
//! most one trade action per day.
//!
//! Three raw conditions are evaluated each day:
//! - buy-dip: oscillator in `[rsi_min_thresh, rsi_max_thresh]`
//! - stop-loss: oscillator >= `rsi_min_thresh` and close below
//!   `(1 - tresh) * max(close over the trailing win_sl days)`
//! - take-profit: oscillator > `rsi_min_thresh`
//!
//! A raw condition becomes final only when the cooldowns that gate it are
//! clear. Precedence is stop-loss > take-profit > buy-dip, and a final
//! stop-loss always suppresses a same-day buy-dip. A stop-loss is surfaced
//! only once the close has recovered to the last dip-buy price.
//!
//! [`SignalEngine::evaluate`] is the live path, gated by the persisted
//! remaining-day counters. [`derive_signals`] replays a whole history with
//! rolling-window cooldown masks for inspection.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::cooldown::CooldownState;
use crate::domain::index_builder::IndexRecord;
use crate::domain::operation::Action;
use crate::domain::oscillator::OscillatorSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct BuyDipConfig {
    pub enable: bool,
    pub rsi_min_thresh: f64,
    pub rsi_max_thresh: f64,
    pub cool: u32,
    pub dip_share: f64,
}

impl Default for BuyDipConfig {
    fn default() -> Self {
        BuyDipConfig {
            enable: true,
            rsi_min_thresh: 0.0,
            rsi_max_thresh: 30.0,
            cool: 5,
            dip_share: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TakeProfitConfig {
    pub enable: bool,
    pub rsi_min_thresh: f64,
    pub cool: u32,
    pub tp_share: f64,
}

impl Default for TakeProfitConfig {
    fn default() -> Self {
        TakeProfitConfig {
            enable: true,
            rsi_min_thresh: 80.0,
            cool: 7,
            tp_share: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopLossConfig {
    pub enable: bool,
    pub rsi_min_thresh: f64,
    pub cool: u32,
    pub sl_share: f64,
    /// Trailing window (days, including today) for the close maximum.
    pub win_sl: usize,
    /// Fractional drop from the trailing maximum that arms the stop-loss.
    pub tresh: f64,
}

impl Default for StopLossConfig {
    fn default() -> Self {
        StopLossConfig {
            enable: true,
            rsi_min_thresh: 0.0,
            cool: 7,
            sl_share: 1.0,
            win_sl: 5,
            tresh: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalConfig {
    pub buy_dip: BuyDipConfig,
    pub take_profit: TakeProfitConfig,
    pub stop_loss: StopLossConfig,
}

impl SignalConfig {
    /// Cooldown length armed when `action` fires.
    pub fn cool_for(&self, action: Action) -> u32 {
        match action {
            Action::Buy => self.buy_dip.cool,
            Action::SellTakeProfit => self.take_profit.cool,
            Action::SellStopLoss => self.stop_loss.cool,
            Action::None => 0,
        }
    }

    /// Fraction of cash (buy) or of holdings value (sells) an action moves.
    pub fn share_for(&self, action: Action) -> f64 {
        match action {
            Action::Buy => self.buy_dip.dip_share,
            Action::SellTakeProfit => self.take_profit.tp_share,
            Action::SellStopLoss => self.stop_loss.sl_share,
            Action::None => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RawSignals {
    pub buy_dip: bool,
    pub stop_loss: bool,
    pub take_profit: bool,
}

/// Gates derived from cooldown state: `true` means the action type is
/// currently suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoolingDown {
    pub buy_dip: bool,
    pub stop_loss: bool,
    pub take_profit: bool,
}

impl From<&CooldownState> for CoolingDown {
    fn from(state: &CooldownState) -> Self {
        CoolingDown {
            buy_dip: !state.is_clear(Action::Buy),
            stop_loss: !state.is_clear(Action::SellStopLoss),
            take_profit: !state.is_clear(Action::SellTakeProfit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FinalSignals {
    pub buy_dip: bool,
    pub stop_loss: bool,
    pub take_profit: bool,
}

impl FinalSignals {
    /// Applies cooldown gating and same-day exclusivity to raw conditions.
    pub fn gate(raw: RawSignals, cooling: CoolingDown) -> Self {
        let stop_loss = raw.stop_loss && !cooling.stop_loss && !cooling.buy_dip;
        let take_profit = raw.take_profit && !cooling.take_profit && !cooling.stop_loss;
        let buy_dip = raw.buy_dip
            && !cooling.buy_dip
            && !cooling.stop_loss
            && !cooling.take_profit
            && !stop_loss;
        FinalSignals {
            buy_dip,
            stop_loss,
            take_profit,
        }
    }

    /// Picks the single action to act on. The stop-loss is skipped unless
    /// `close` has recovered to `last_buy_price`.
    pub fn surface(&self, close: f64, last_buy_price: f64) -> Action {
        if self.stop_loss && close >= last_buy_price {
            Action::SellStopLoss
        } else if self.take_profit {
            Action::SellTakeProfit
        } else if self.buy_dip {
            Action::Buy
        } else {
            Action::None
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalEngine {
    pub config: SignalConfig,
}

impl SignalEngine {
    pub fn new(config: SignalConfig) -> Self {
        SignalEngine { config }
    }

    /// Raw conditions for one day. `window_max` is the highest close over the
    /// trailing stop-loss window. An undefined oscillator fires nothing.
    pub fn raw_signals(&self, oscillator: Option<f64>, close: f64, window_max: f64) -> RawSignals {
        let Some(osc) = oscillator.filter(|v| v.is_finite()) else {
            return RawSignals::default();
        };
        let bd = &self.config.buy_dip;
        let tp = &self.config.take_profit;
        let sl = &self.config.stop_loss;

        RawSignals {
            buy_dip: bd.enable && osc >= bd.rsi_min_thresh && osc <= bd.rsi_max_thresh,
            stop_loss: sl.enable
                && osc >= sl.rsi_min_thresh
                && close < (1.0 - sl.tresh) * window_max,
            take_profit: tp.enable && osc > tp.rsi_min_thresh,
        }
    }

    /// Live evaluation for today. `recent_closes` holds the trailing
    /// stop-loss window ending with today's close.
    pub fn evaluate(
        &self,
        oscillator: Option<f64>,
        close: f64,
        recent_closes: &[f64],
        cooldown: &CooldownState,
    ) -> Action {
        let window_max = trailing_max(recent_closes, self.config.stop_loss.win_sl).max(close);
        let raw = self.raw_signals(oscillator, close, window_max);
        FinalSignals::gate(raw, CoolingDown::from(cooldown)).surface(close, cooldown.last_buy_price)
    }

    /// Records that `action` fired at `close`: arms its cooldown and moves
    /// the position reference.
    pub fn fire(&self, action: Action, close: f64, cooldown: &mut CooldownState) {
        cooldown.arm(action, self.config.cool_for(action));
        match action {
            Action::Buy => cooldown.last_buy_price = close,
            Action::SellStopLoss => cooldown.last_buy_price = f64::INFINITY,
            Action::SellTakeProfit | Action::None => {}
        }
    }
}

fn trailing_max(closes: &[f64], window: usize) -> f64 {
    let start = closes.len().saturating_sub(window.max(1));
    closes[start..]
        .iter()
        .copied()
        .filter(|c| c.is_finite())
        .fold(f64::NEG_INFINITY, f64::max)
}

/// One day of a replayed signal history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub close: f64,
    pub oscillator: Option<f64>,
    pub raw: RawSignals,
    #[serde(rename = "final")]
    pub final_signals: FinalSignals,
    pub action: Action,
}

/// Replays the signal rules over a full index history.
///
/// A type is cooling down on day T if its raw condition held on any of the
/// `cool` days ending at T-1. The position reference starts empty, is set to
/// the close on every surfaced buy and cleared on every surfaced stop-loss.
pub fn derive_signals(
    engine: &SignalEngine,
    records: &[IndexRecord],
    oscillator: &OscillatorSeries,
) -> Vec<SignalRow> {
    let config = &engine.config;
    let closes: Vec<f64> = records.iter().map(|r| r.close).collect();

    let raws: Vec<RawSignals> = records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let window_max = trailing_max(&closes[..=i], config.stop_loss.win_sl);
            engine.raw_signals(oscillator.value_at(i), record.close, window_max)
        })
        .collect();

    let bd_mask = cooldown_mask(&raws, config.buy_dip.cool, |r| r.buy_dip);
    let sl_mask = cooldown_mask(&raws, config.stop_loss.cool, |r| r.stop_loss);
    let tp_mask = cooldown_mask(&raws, config.take_profit.cool, |r| r.take_profit);

    let mut last_buy_price = f64::INFINITY;
    let mut rows = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let cooling = CoolingDown {
            buy_dip: bd_mask[i],
            stop_loss: sl_mask[i],
            take_profit: tp_mask[i],
        };
        let final_signals = FinalSignals::gate(raws[i], cooling);
        let action = final_signals.surface(record.close, last_buy_price);
        match action {
            Action::Buy => last_buy_price = record.close,
            Action::SellStopLoss => last_buy_price = f64::INFINITY,
            _ => {}
        }
        rows.push(SignalRow {
            date: record.date,
            close: record.close,
            oscillator: oscillator.value_at(i),
            raw: raws[i],
            final_signals,
            action,
        });
    }

    rows
}

fn cooldown_mask(raws: &[RawSignals], cool: u32, pick: impl Fn(&RawSignals) -> bool) -> Vec<bool> {
    let cool = cool as usize;
    (0..raws.len())
        .map(|i| {
            let start = i.saturating_sub(cool);
            cool > 0 && raws[start..i].iter().any(&pick)
        })
        .collect()
}
