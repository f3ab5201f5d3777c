//! Configuration validation.
//!
//! Every setting is checked before the bot starts; a bad value is fatal at
//! startup and never surfaces at runtime.

use crate::domain::error::AltdipError;
use crate::domain::index_builder::DEFAULT_BASE_VALUE;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub fn validate_bot_config(config: &dyn ConfigPort) -> Result<(), AltdipError> {
    validate_index(config)?;
    validate_oscillator(config)?;
    validate_buy_dip(config)?;
    validate_take_profit(config)?;
    validate_stop_loss(config)?;
    validate_executor(config)?;
    validate_state(config)?;
    Ok(())
}

fn validate_index(config: &dyn ConfigPort) -> Result<(), AltdipError> {
    at_least_one(config, "index", "basket_size", 10)?;
    let base = number(config, "index", "base_value", DEFAULT_BASE_VALUE)?;
    if base <= 0.0 || !base.is_finite() {
        return Err(AltdipError::invalid(
            "index",
            "base_value",
            "base_value must be positive",
        ));
    }
    Ok(())
}

fn validate_oscillator(config: &dyn ConfigPort) -> Result<(), AltdipError> {
    at_least_one(config, "oscillator", "period", 14)?;
    at_least_one(config, "oscillator", "smoothing", 5)?;
    Ok(())
}

fn validate_buy_dip(config: &dyn ConfigPort) -> Result<(), AltdipError> {
    flag(config, "buy_dip", "enable")?;
    let min = oscillator_threshold(config, "buy_dip", "rsi_min_thresh", 0.0)?;
    let max = oscillator_threshold(config, "buy_dip", "rsi_max_thresh", 30.0)?;
    if min > max {
        return Err(AltdipError::invalid(
            "buy_dip",
            "rsi_min_thresh",
            "rsi_min_thresh must not exceed rsi_max_thresh",
        ));
    }
    at_least_one(config, "buy_dip", "cool", 5)?;
    share(config, "buy_dip", "dip_share", 0.25)?;
    Ok(())
}

fn validate_take_profit(config: &dyn ConfigPort) -> Result<(), AltdipError> {
    flag(config, "sell_tp", "enable")?;
    oscillator_threshold(config, "sell_tp", "rsi_min_thresh", 80.0)?;
    at_least_one(config, "sell_tp", "cool", 7)?;
    share(config, "sell_tp", "tp_share", 0.2)?;
    Ok(())
}

fn validate_stop_loss(config: &dyn ConfigPort) -> Result<(), AltdipError> {
    flag(config, "sell_sl", "enable")?;
    oscillator_threshold(config, "sell_sl", "rsi_min_thresh", 0.0)?;
    at_least_one(config, "sell_sl", "cool", 7)?;
    share(config, "sell_sl", "sl_share", 1.0)?;
    at_least_one(config, "sell_sl", "win_sl", 5)?;
    let tresh = number(config, "sell_sl", "tresh", 0.2)?;
    if tresh <= 0.0 || tresh >= 1.0 {
        return Err(AltdipError::invalid(
            "sell_sl",
            "tresh",
            "tresh must be between 0 and 1 (exclusive)",
        ));
    }
    Ok(())
}

fn validate_executor(config: &dyn ConfigPort) -> Result<(), AltdipError> {
    if let Some(quote) = config.get_string("executor", "quote_asset") {
        if quote.trim().is_empty() {
            return Err(AltdipError::invalid(
                "executor",
                "quote_asset",
                "quote_asset must not be empty",
            ));
        }
    }
    let threshold = number(config, "executor", "precision_threshold", 20.0)?;
    if threshold <= 0.0 {
        return Err(AltdipError::invalid(
            "executor",
            "precision_threshold",
            "precision_threshold must be positive",
        ));
    }
    at_least_one(config, "executor", "max_stalled_ticks", 3)?;
    at_least_one(config, "executor", "tick_interval_secs", 5)?;
    Ok(())
}

fn validate_state(config: &dyn ConfigPort) -> Result<(), AltdipError> {
    let backend = config
        .get_string("state", "backend")
        .unwrap_or_else(|| "json".to_string());
    if !matches!(backend.trim().to_lowercase().as_str(), "json" | "sqlite") {
        return Err(AltdipError::invalid(
            "state",
            "backend",
            format!("unknown state backend '{backend}' (expected json or sqlite)"),
        ));
    }
    match config.get_string("state", "path") {
        Some(path) if !path.trim().is_empty() => Ok(()),
        _ => Err(AltdipError::ConfigMissing {
            section: "state".to_string(),
            key: "path".to_string(),
        }),
    }
}

/// Reads a numeric key from its raw text. A present value that does not
/// parse is rejected rather than replaced by `default`.
fn number<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, AltdipError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            AltdipError::invalid(section, key, format!("'{}' is not a number", raw.trim()))
        }),
        _ => Ok(default),
    }
}

fn flag(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), AltdipError> {
    match config.get_string(section, key) {
        Some(raw)
            if !raw.trim().is_empty()
                && !matches!(
                    raw.trim().to_lowercase().as_str(),
                    "true" | "yes" | "on" | "1" | "false" | "no" | "off" | "0"
                ) =>
        {
            Err(AltdipError::invalid(
                section,
                key,
                format!("'{}' is not a boolean", raw.trim()),
            ))
        }
        _ => Ok(()),
    }
}

fn at_least_one(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, AltdipError> {
    let value: i64 = number(config, section, key, default)?;
    if value < 1 {
        return Err(AltdipError::invalid(
            section,
            key,
            format!("{key} must be at least 1"),
        ));
    }
    Ok(value)
}

fn oscillator_threshold(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, AltdipError> {
    let value: f64 = number(config, section, key, default)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(AltdipError::invalid(
            section,
            key,
            format!("{key} must be between 0 and 100"),
        ));
    }
    Ok(value)
}

fn share(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, AltdipError> {
    let value: f64 = number(config, section, key, default)?;
    if value <= 0.0 || value > 1.0 {
        return Err(AltdipError::invalid(
            section,
            key,
            format!("{key} must be in (0, 1]"),
        ));
    }
    Ok(value)
}
