//! The persisted bot document: cooldown counters plus the in-flight
//! operation, stored flat.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::cooldown::CooldownState;
use crate::domain::operation::OperationState;
use crate::ports::state_port::StatePort;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotState {
    #[serde(flatten)]
    pub cooldown: CooldownState,
    #[serde(flatten)]
    pub operation: OperationState,
}

impl BotState {
    pub fn new(today: NaiveDate) -> Self {
        BotState {
            cooldown: CooldownState::new(today),
            operation: OperationState::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Loads the persisted state, starting fresh when none exists or when the
/// stored document cannot be read.
pub fn load_or_default(store: &dyn StatePort, today: NaiveDate) -> BotState {
    match store.load() {
        Ok(Some(state)) => state,
        Ok(None) => BotState::new(today),
        Err(e) => {
            warn!(error = %e, "persisted state unreadable, starting from defaults");
            BotState::new(today)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::AltdipError;
    use crate::domain::operation::Action;
    use std::cell::RefCell;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    struct Stub(RefCell<Option<Result<Option<BotState>, AltdipError>>>);

    impl StatePort for Stub {
        fn load(&self) -> Result<Option<BotState>, AltdipError> {
            self.0.borrow_mut().take().unwrap_or(Ok(None))
        }
        fn save(&self, _state: &BotState) -> Result<(), AltdipError> {
            Ok(())
        }
        fn clear(&self) -> Result<(), AltdipError> {
            Ok(())
        }
    }

    #[test]
    fn document_is_flat() {
        let mut state = BotState::new(date(2));
        state.operation.operation = Action::Buy;
        state.operation.goal_balance = Some(1250.5);
        let value: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();

        assert_eq!(value["operation"], "buy");
        assert_eq!(value["goal_balance"], 1250.5);
        assert_eq!(value["buy_dip_remaining_days"], 0);
        assert_eq!(value["last_update_date"], "2024-05-02");
        assert!(value["last_buy_price"].is_null());
    }

    #[test]
    fn document_round_trips() {
        let mut state = BotState::new(date(9));
        state.cooldown.stop_loss_remaining_days = 4;
        state.cooldown.last_buy_price = 0.873_456_123_9;
        state.operation.operation = Action::SellStopLoss;
        state.operation.goal_balance = Some(0.0);
        state.operation.stalled_ticks = 1;

        let back = BotState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn idle_document_has_null_goal() {
        let state = BotState::new(date(1));
        let json = state.to_json().unwrap();
        assert!(json.contains("\"goal_balance\": null"));
        assert_eq!(BotState::from_json(&json).unwrap(), state);
    }

    #[test]
    fn load_or_default_falls_back_on_error() {
        let store = Stub(RefCell::new(Some(Err(AltdipError::StateCorrupt {
            reason: "truncated".into(),
        }))));
        assert_eq!(load_or_default(&store, date(3)), BotState::new(date(3)));
    }

    #[test]
    fn load_or_default_keeps_stored_state() {
        let mut stored = BotState::new(date(1));
        stored.cooldown.buy_dip_remaining_days = 2;
        let store = Stub(RefCell::new(Some(Ok(Some(stored.clone())))));
        assert_eq!(load_or_default(&store, date(3)), stored);
    }

    #[test]
    fn load_or_default_without_document() {
        let store = Stub(RefCell::new(None));
        assert_eq!(load_or_default(&store, date(7)), BotState::new(date(7)));
    }
}
