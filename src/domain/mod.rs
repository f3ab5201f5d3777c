//! Core domain types and logic.

pub mod config;
pub mod config_validation;
pub mod cooldown;
pub mod error;
pub mod index_builder;
pub mod indicator;
pub mod lot;
pub mod market_cap;
pub mod operation;
pub mod order;
pub mod oscillator;
pub mod portfolio;
pub mod rebalance;
pub mod scheduler;
pub mod signal;
pub mod state;
pub mod universe;
