//! Trade actions and the in-flight operation record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A trade decision surfaced by the signal engine. Also names the operation
/// the rebalance executor is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    None,
    Buy,
    SellTakeProfit,
    SellStopLoss,
}

impl Action {
    pub fn is_none(&self) -> bool {
        matches!(self, Action::None)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, Action::SellTakeProfit | Action::SellStopLoss)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::None => "none",
            Action::Buy => "buy",
            Action::SellTakeProfit => "sell_take_profit",
            Action::SellStopLoss => "sell_stop_loss",
        };
        f.write_str(name)
    }
}

/// The single operation allowed in flight. `operation == Action::None` means
/// idle; a goal balance exists only while an operation runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationState {
    pub operation: Action,
    pub goal_balance: Option<f64>,
    /// Consecutive executor passes that placed no order without reaching the goal.
    #[serde(default)]
    pub stalled_ticks: u32,
}

impl OperationState {
    pub fn start(action: Action) -> Self {
        OperationState {
            operation: action,
            goal_balance: None,
            stalled_ticks: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.operation.is_none()
    }

    pub fn clear(&mut self) {
        *self = OperationState::default();
    }
}
