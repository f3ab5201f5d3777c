//! Port traits for every external collaborator.

pub mod clock_port;
pub mod config_port;
pub mod market_data_port;
pub mod state_port;
pub mod venue_port;
