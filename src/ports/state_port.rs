//! Durable bot state port trait.

use crate::domain::error::AltdipError;
use crate::domain::state::BotState;

pub trait StatePort {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<BotState>, AltdipError>;

    fn save(&self, state: &BotState) -> Result<(), AltdipError>;

    fn clear(&self) -> Result<(), AltdipError>;
}
