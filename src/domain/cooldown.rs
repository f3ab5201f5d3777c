//! Per-action cooldown counters with calendar-day decay.
//!
//! Counters hold the number of days an action type stays suppressed. They are
//! armed to the configured length when the action fires and decay by the
//! number of calendar days elapsed since `last_update_date`, so a process that
//! was offline for several days catches up in a single step.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::operation::Action;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownState {
    pub buy_dip_remaining_days: u32,
    pub stop_loss_remaining_days: u32,
    pub take_profit_remaining_days: u32,
    /// Index close of the last dip buy; +inf when there is no reference.
    #[serde(with = "infinite_as_null")]
    pub last_buy_price: f64,
    pub last_update_date: NaiveDate,
}

impl CooldownState {
    pub fn new(today: NaiveDate) -> Self {
        CooldownState {
            buy_dip_remaining_days: 0,
            stop_loss_remaining_days: 0,
            take_profit_remaining_days: 0,
            last_buy_price: f64::INFINITY,
            last_update_date: today,
        }
    }

    pub fn has_position_reference(&self) -> bool {
        self.last_buy_price.is_finite()
    }

    /// Decrements every counter by the days elapsed since the last update,
    /// floored at zero. Returns the number of days applied; a date at or
    /// before `last_update_date` changes nothing.
    pub fn decay_to(&mut self, today: NaiveDate) -> u32 {
        let elapsed = (today - self.last_update_date).num_days();
        if elapsed <= 0 {
            return 0;
        }
        let days = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.buy_dip_remaining_days = self.buy_dip_remaining_days.saturating_sub(days);
        self.stop_loss_remaining_days = self.stop_loss_remaining_days.saturating_sub(days);
        self.take_profit_remaining_days = self.take_profit_remaining_days.saturating_sub(days);
        self.last_update_date = today;
        days
    }

    pub fn remaining(&self, action: Action) -> u32 {
        match action {
            Action::Buy => self.buy_dip_remaining_days,
            Action::SellStopLoss => self.stop_loss_remaining_days,
            Action::SellTakeProfit => self.take_profit_remaining_days,
            Action::None => 0,
        }
    }

    pub fn is_clear(&self, action: Action) -> bool {
        self.remaining(action) == 0
    }

    /// Sets the counter of `action` to `days`.
    pub fn arm(&mut self, action: Action, days: u32) {
        match action {
            Action::Buy => self.buy_dip_remaining_days = days,
            Action::SellStopLoss => self.stop_loss_remaining_days = days,
            Action::SellTakeProfit => self.take_profit_remaining_days = days,
            Action::None => {}
        }
    }
}

/// Serialises non-finite prices as `null` so the document stays valid JSON
/// and restores `null` as +inf.
mod infinite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn armed(today: NaiveDate) -> CooldownState {
        CooldownState {
            buy_dip_remaining_days: 5,
            stop_loss_remaining_days: 2,
            take_profit_remaining_days: 0,
            last_buy_price: 1.2,
            last_update_date: today,
        }
    }

    #[test]
    fn new_state_has_no_reference() {
        let state = CooldownState::new(date(2024, 1, 1));
        assert!(!state.has_position_reference());
        assert!(state.is_clear(Action::Buy));
        assert!(state.is_clear(Action::SellStopLoss));
        assert!(state.is_clear(Action::SellTakeProfit));
    }

    #[test]
    fn decay_one_day() {
        let mut state = armed(date(2024, 1, 1));
        assert_eq!(state.decay_to(date(2024, 1, 2)), 1);
        assert_eq!(state.buy_dip_remaining_days, 4);
        assert_eq!(state.stop_loss_remaining_days, 1);
        assert_eq!(state.take_profit_remaining_days, 0);
        assert_eq!(state.last_update_date, date(2024, 1, 2));
    }

    #[test]
    fn decay_catches_up_after_downtime() {
        let mut state = armed(date(2024, 1, 1));
        assert_eq!(state.decay_to(date(2024, 1, 4)), 3);
        assert_eq!(state.buy_dip_remaining_days, 2);
        assert_eq!(state.stop_loss_remaining_days, 0);
    }

    #[test]
    fn decay_same_day_or_backwards_is_noop() {
        let mut state = armed(date(2024, 1, 10));
        assert_eq!(state.decay_to(date(2024, 1, 10)), 0);
        assert_eq!(state.decay_to(date(2024, 1, 3)), 0);
        assert_eq!(state, armed(date(2024, 1, 10)));
    }

    #[test]
    fn arm_sets_exact_length() {
        let mut state = CooldownState::new(date(2024, 1, 1));
        state.arm(Action::SellTakeProfit, 7);
        state.arm(Action::None, 9);
        assert_eq!(state.remaining(Action::SellTakeProfit), 7);
        assert_eq!(state.remaining(Action::Buy), 0);
    }

    #[test]
    fn infinite_reference_round_trips_as_null() {
        let state = CooldownState::new(date(2024, 2, 29));
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"last_buy_price\":null"));
        assert!(json.contains("\"last_update_date\":\"2024-02-29\""));
        let back: CooldownState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn finite_reference_round_trips_exactly() {
        let mut state = armed(date(2024, 1, 1));
        state.last_buy_price = 0.1 + 0.2;
        let json = serde_json::to_string(&state).unwrap();
        let back: CooldownState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.last_buy_price.to_bits(), state.last_buy_price.to_bits());
    }

    #[derive(Debug, Clone)]
    enum Step {
        /// Move the clock by this many days; negative moves it back.
        Decay(i64),
        Arm(Action, u32),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (-3i64..12).prop_map(Step::Decay),
            (
                prop_oneof![
                    Just(Action::Buy),
                    Just(Action::SellStopLoss),
                    Just(Action::SellTakeProfit),
                ],
                1u32..15
            )
                .prop_map(|(action, cool)| Step::Arm(action, cool)),
        ]
    }

    const ACTIONS: [Action; 3] = [Action::Buy, Action::SellStopLoss, Action::SellTakeProfit];

    proptest! {
        #[test]
        fn counters_only_grow_when_armed(steps in prop::collection::vec(step(), 1..60)) {
            let mut today = date(2024, 1, 1);
            let mut state = CooldownState::new(today);

            for step in steps {
                let before = state.clone();
                match step {
                    Step::Decay(offset) => {
                        today = if offset >= 0 {
                            today + Days::new(offset as u64)
                        } else {
                            today - Days::new(offset.unsigned_abs())
                        };
                        let applied = state.decay_to(today);
                        for action in ACTIONS {
                            prop_assert_eq!(
                                state.remaining(action),
                                before.remaining(action).saturating_sub(applied)
                            );
                        }
                        prop_assert!(state.last_update_date >= before.last_update_date);
                    }
                    Step::Arm(armed, cool) => {
                        state.arm(armed, cool);
                        prop_assert_eq!(state.remaining(armed), cool);
                        for action in ACTIONS.into_iter().filter(|a| *a != armed) {
                            prop_assert_eq!(state.remaining(action), before.remaining(action));
                        }
                    }
                }
            }
        }
    }
}
