//! Typed bot configuration built from the INI file.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::config_validation::validate_bot_config;
use crate::domain::error::AltdipError;
use crate::domain::index_builder::{IndexBuilder, DEFAULT_BASE_VALUE, DEFAULT_BASKET_SIZE};
use crate::domain::oscillator::{OscillatorEngine, DEFAULT_RSI_PERIOD, DEFAULT_SMOOTHING_WINDOW};
use crate::domain::rebalance::{
    ExecutorConfig, DEFAULT_MAX_STALLED_TICKS, DEFAULT_PRECISION_THRESHOLD,
};
use crate::domain::signal::{BuyDipConfig, SignalConfig, StopLossConfig, TakeProfitConfig};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateConfig {
    pub backend: StateBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataConfig {
    pub dir: Option<PathBuf>,
    /// Upper-cased symbols never admitted to the basket.
    pub excluded: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub index: IndexBuilder,
    pub oscillator: OscillatorEngine,
    pub signals: SignalConfig,
    pub executor: ExecutorConfig,
    pub tick_interval: Duration,
    pub data: DataConfig,
    pub state: StateConfig,
}

/// Validates the whole file, then reads every section with its defaults.
pub fn build_bot_config(adapter: &dyn ConfigPort) -> Result<BotConfig, AltdipError> {
    validate_bot_config(adapter)?;

    let index = IndexBuilder::new(
        adapter.get_int("index", "basket_size", DEFAULT_BASKET_SIZE as i64) as usize,
        adapter.get_double("index", "base_value", DEFAULT_BASE_VALUE),
    );
    let oscillator = OscillatorEngine {
        period: adapter.get_int("oscillator", "period", DEFAULT_RSI_PERIOD as i64) as usize,
        smoothing: adapter.get_int("oscillator", "smoothing", DEFAULT_SMOOTHING_WINDOW as i64)
            as usize,
    };

    let bd = BuyDipConfig::default();
    let tp = TakeProfitConfig::default();
    let sl = StopLossConfig::default();
    let signals = SignalConfig {
        buy_dip: BuyDipConfig {
            enable: adapter.get_bool("buy_dip", "enable", bd.enable),
            rsi_min_thresh: adapter.get_double("buy_dip", "rsi_min_thresh", bd.rsi_min_thresh),
            rsi_max_thresh: adapter.get_double("buy_dip", "rsi_max_thresh", bd.rsi_max_thresh),
            cool: adapter.get_int("buy_dip", "cool", bd.cool as i64) as u32,
            dip_share: adapter.get_double("buy_dip", "dip_share", bd.dip_share),
        },
        take_profit: TakeProfitConfig {
            enable: adapter.get_bool("sell_tp", "enable", tp.enable),
            rsi_min_thresh: adapter.get_double("sell_tp", "rsi_min_thresh", tp.rsi_min_thresh),
            cool: adapter.get_int("sell_tp", "cool", tp.cool as i64) as u32,
            tp_share: adapter.get_double("sell_tp", "tp_share", tp.tp_share),
        },
        stop_loss: StopLossConfig {
            enable: adapter.get_bool("sell_sl", "enable", sl.enable),
            rsi_min_thresh: adapter.get_double("sell_sl", "rsi_min_thresh", sl.rsi_min_thresh),
            cool: adapter.get_int("sell_sl", "cool", sl.cool as i64) as u32,
            sl_share: adapter.get_double("sell_sl", "sl_share", sl.sl_share),
            win_sl: adapter.get_int("sell_sl", "win_sl", sl.win_sl as i64) as usize,
            tresh: adapter.get_double("sell_sl", "tresh", sl.tresh),
        },
    };

    let executor = ExecutorConfig {
        quote_asset: adapter
            .get_string("executor", "quote_asset")
            .map(|q| q.trim().to_uppercase())
            .unwrap_or_else(|| "USDT".to_string()),
        precision_threshold: adapter.get_double(
            "executor",
            "precision_threshold",
            DEFAULT_PRECISION_THRESHOLD,
        ),
        max_stalled_ticks: adapter.get_int(
            "executor",
            "max_stalled_ticks",
            DEFAULT_MAX_STALLED_TICKS as i64,
        ) as u32,
    };
    let tick_interval = Duration::from_secs(adapter.get_int(
        "executor",
        "tick_interval_secs",
        DEFAULT_TICK_INTERVAL_SECS as i64,
    ) as u64);

    let data = DataConfig {
        dir: adapter
            .get_string("data", "dir")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from),
        excluded: adapter
            .get_string("data", "excluded")
            .map(|list| parse_symbol_list(&list))
            .unwrap_or_default(),
    };

    let backend = match adapter
        .get_string("state", "backend")
        .map(|b| b.trim().to_lowercase())
        .as_deref()
    {
        Some("sqlite") => StateBackend::Sqlite,
        _ => StateBackend::Json,
    };
    let path = adapter
        .get_string("state", "path")
        .map(PathBuf::from)
        .ok_or_else(|| AltdipError::ConfigMissing {
            section: "state".into(),
            key: "path".into(),
        })?;

    Ok(BotConfig {
        index,
        oscillator,
        signals,
        executor,
        tick_interval,
        data,
        state: StateConfig { backend, path },
    })
}

/// Splits a comma-separated symbol list, upper-casing and skipping blanks.
pub fn parse_symbol_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn defaults_apply() {
        let adapter = FileConfigAdapter::from_string("[state]\npath = state.json\n").unwrap();
        let config = build_bot_config(&adapter).unwrap();

        assert_eq!(config.index, IndexBuilder::new(10, 1.0));
        assert_eq!(config.oscillator, OscillatorEngine::default());
        assert_eq!(config.signals, SignalConfig::default());
        assert_eq!(config.executor, ExecutorConfig::default());
        assert_eq!(config.tick_interval, Duration::from_secs(5));
        assert_eq!(config.data, DataConfig::default());
        assert_eq!(config.state.backend, StateBackend::Json);
        assert_eq!(config.state.path, PathBuf::from("state.json"));
    }

    #[test]
    fn overrides_are_read() {
        let adapter = FileConfigAdapter::from_string(
            r#"
[index]
basket_size = 3

[buy_dip]
enable = false
cool = 2

[sell_sl]
win_sl = 10
tresh = 0.15

[executor]
quote_asset = usdc
tick_interval_secs = 30

[data]
dir = /data/caps
excluded = usdt, wbtc ,,steth

[state]
backend = SQLite
path = bot.db
"#,
        )
        .unwrap();
        let config = build_bot_config(&adapter).unwrap();

        assert_eq!(config.index.basket_size, 3);
        assert!(!config.signals.buy_dip.enable);
        assert_eq!(config.signals.buy_dip.cool, 2);
        assert_eq!(config.signals.stop_loss.win_sl, 10);
        assert_eq!(config.signals.stop_loss.tresh, 0.15);
        assert_eq!(config.executor.quote_asset, "USDC");
        assert_eq!(config.tick_interval, Duration::from_secs(30));
        assert_eq!(config.data.dir, Some(PathBuf::from("/data/caps")));
        assert_eq!(config.data.excluded, vec!["USDT", "WBTC", "STETH"]);
        assert_eq!(config.state.backend, StateBackend::Sqlite);
    }

    #[test]
    fn invalid_value_is_rejected() {
        let adapter =
            FileConfigAdapter::from_string("[sell_tp]\ntp_share = 2\n[state]\npath = s.json\n")
                .unwrap();
        assert!(matches!(
            build_bot_config(&adapter),
            Err(AltdipError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn unparsable_numbers_are_not_replaced_by_defaults() {
        for content in [
            "[sell_tp]\ntp_share = 0,5\n[state]\npath = s.json\n",
            "[sell_tp]\ncool = seven\n[state]\npath = s.json\n",
        ] {
            let adapter = FileConfigAdapter::from_string(content).unwrap();
            assert!(matches!(
                build_bot_config(&adapter),
                Err(AltdipError::ConfigInvalid { ref section, .. }) if section == "sell_tp"
            ));
        }
    }

    #[test]
    fn symbol_list_parsing() {
        assert_eq!(parse_symbol_list(" a,B ,, c "), vec!["A", "B", "C"]);
        assert!(parse_symbol_list("").is_empty());
    }
}
