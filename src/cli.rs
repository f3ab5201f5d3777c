//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvMarketDataAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_state_adapter::JsonFileStateAdapter;
use crate::adapters::paper_venue::PaperVenue;
use crate::adapters::system_clock::SystemClock;
use crate::domain::config::{build_bot_config, BotConfig, StateBackend, StateConfig};
use crate::domain::error::AltdipError;
use crate::domain::index_builder::{target_weights, IndexRecord};
use crate::domain::scheduler::Scheduler;
use crate::domain::signal::{derive_signals, SignalEngine, SignalRow};
use crate::domain::universe::collect_cap_histories;
use crate::ports::state_port::StatePort;

#[derive(Parser, Debug)]
#[command(name = "altdip", about = "Alt-index dip accumulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Build the market-cap index and write it as CSV
    Index {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replay the signal rules over the index history and write them as CSV
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the persisted bot state as JSON
    State {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Abandon the in-flight operation, keeping cooldowns
    ResetState {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run the bot against an in-memory paper venue
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Stop after this many ticks; runs until interrupted when omitted
        #[arg(long)]
        ticks: Option<u64>,
        /// Starting quote balance of the paper venue
        #[arg(long, default_value_t = 1000.0)]
        cash: f64,
    },
}

/// Every paper pair is quoted at one quote unit on both sides.
const PAPER_PRICE: f64 = 1.0;

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Validate { config } => run_validate(&config),
        Command::Index { config, output } => run_index(&config, output.as_deref()),
        Command::Signals { config, output } => run_signals(&config, output.as_deref()),
        Command::State { config } => run_state(&config),
        Command::ResetState { config } => run_reset_state(&config),
        Command::Run {
            config,
            ticks,
            cash,
        } => run_paper(&config, ticks, cash),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<BotConfig, AltdipError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    build_bot_config(&adapter)
}

pub fn open_state_store(config: &StateConfig) -> Result<Box<dyn StatePort>, AltdipError> {
    match config.backend {
        StateBackend::Json => Ok(Box::new(JsonFileStateAdapter::new(config.path.clone()))),
        #[cfg(feature = "sqlite")]
        StateBackend::Sqlite => Ok(Box::new(
            crate::adapters::sqlite_adapter::SqliteStateAdapter::open(&config.path)?,
        )),
        #[cfg(not(feature = "sqlite"))]
        StateBackend::Sqlite => Err(AltdipError::invalid(
            "state",
            "backend",
            "built without sqlite support",
        )),
    }
}

fn market_data(config: &BotConfig) -> Result<CsvMarketDataAdapter, AltdipError> {
    let dir = config
        .data
        .dir
        .clone()
        .ok_or_else(|| AltdipError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })?;
    let mut excluded = config.data.excluded.clone();
    excluded.push(config.executor.quote_asset.clone());
    Ok(CsvMarketDataAdapter::new(dir, excluded))
}

fn build_index(config: &BotConfig) -> Result<Vec<IndexRecord>, AltdipError> {
    let provider = market_data(config)?;
    let universe = collect_cap_histories(&provider)?;
    eprintln!(
        "Universe: {} assets ({} skipped)",
        universe.count(),
        universe.skipped.len()
    );
    let records = config.index.build(&universe.histories);
    if records.is_empty() {
        return Err(AltdipError::NoData {
            reason: "index has no dates".to_string(),
        });
    }
    Ok(records)
}

fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>, AltdipError> {
    Ok(match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    })
}

fn run_validate(config_path: &Path) -> Result<(), AltdipError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;

    eprintln!(
        "  index:      top {} assets, base {}",
        config.index.basket_size, config.index.base_value
    );
    eprintln!(
        "  oscillator: RSI({}) smoothed over {}",
        config.oscillator.period, config.oscillator.smoothing
    );
    eprintln!(
        "  executor:   quote {}, precision {}",
        config.executor.quote_asset, config.executor.precision_threshold
    );
    eprintln!(
        "  state:      {:?} at {}",
        config.state.backend,
        config.state.path.display()
    );
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_index(config_path: &Path, output: Option<&Path>) -> Result<(), AltdipError> {
    let config = load_config(config_path)?;
    let records = build_index(&config)?;

    let mut wtr = csv::Writer::from_writer(output_writer(output)?);
    wtr.write_record(["date", "basket", "total_market_cap", "close", "rebalanced"])
        .map_err(io::Error::from)?;
    for r in &records {
        wtr.write_record([
            r.date.format("%Y-%m-%d").to_string(),
            r.basket.join(";"),
            r.total_market_cap.to_string(),
            r.close.to_string(),
            r.rebalanced.to_string(),
        ])
        .map_err(io::Error::from)?;
    }
    wtr.flush()?;

    let weights = target_weights(&records);
    for (asset, weight) in weights.iter() {
        eprintln!("  {asset:<8} {:>6.2}%", weight * 100.0);
    }
    info!(days = records.len(), members = weights.len(), "index written");
    Ok(())
}

fn signal_record(row: &SignalRow) -> [String; 10] {
    [
        row.date.format("%Y-%m-%d").to_string(),
        row.close.to_string(),
        row.oscillator.map(|v| format!("{v:.4}")).unwrap_or_default(),
        row.raw.buy_dip.to_string(),
        row.raw.stop_loss.to_string(),
        row.raw.take_profit.to_string(),
        row.final_signals.buy_dip.to_string(),
        row.final_signals.stop_loss.to_string(),
        row.final_signals.take_profit.to_string(),
        row.action.to_string(),
    ]
}

fn run_signals(config_path: &Path, output: Option<&Path>) -> Result<(), AltdipError> {
    let config = load_config(config_path)?;
    let records = build_index(&config)?;
    let oscillator = config.oscillator.compute_for_index(&records);
    let engine = SignalEngine::new(config.signals.clone());
    let rows = derive_signals(&engine, &records, &oscillator);

    let mut wtr = csv::Writer::from_writer(output_writer(output)?);
    wtr.write_record([
        "date",
        "close",
        "oscillator",
        "raw_buy_dip",
        "raw_stop_loss",
        "raw_take_profit",
        "buy_dip",
        "stop_loss",
        "take_profit",
        "action",
    ])
    .map_err(io::Error::from)?;
    for row in &rows {
        wtr.write_record(signal_record(row))
            .map_err(io::Error::from)?;
    }
    wtr.flush()?;

    let actions = rows.iter().filter(|r| !r.action.is_none()).count();
    eprintln!("{} days, {} actions", rows.len(), actions);
    Ok(())
}

fn run_state(config_path: &Path) -> Result<(), AltdipError> {
    let config = load_config(config_path)?;
    let store = open_state_store(&config.state)?;
    match store.load()? {
        Some(state) => println!("{}", state.to_json()?),
        None => eprintln!("No persisted state at {}", config.state.path.display()),
    }
    Ok(())
}

fn run_reset_state(config_path: &Path) -> Result<(), AltdipError> {
    let config = load_config(config_path)?;
    let store = open_state_store(&config.state)?;
    let Some(mut state) = store.load()? else {
        eprintln!("No persisted state at {}", config.state.path.display());
        return Ok(());
    };
    if state.operation.is_idle() {
        eprintln!("No operation in flight.");
        return Ok(());
    }
    let abandoned = state.operation.operation;
    state.operation.clear();
    store.save(&state)?;
    eprintln!("Abandoned {abandoned} operation; cooldowns kept.");
    Ok(())
}

fn run_paper(config_path: &Path, ticks: Option<u64>, cash: f64) -> Result<(), AltdipError> {
    let config = load_config(config_path)?;
    let provider = market_data(&config)?;
    let store = open_state_store(&config.state)?;
    let quote = config.executor.quote_asset.as_str();

    let universe = collect_cap_histories(&provider)?;
    let venue = universe
        .symbols
        .iter()
        .fold(PaperVenue::new(quote, cash), |venue, symbol| {
            venue.with_book(symbol, PAPER_PRICE, PAPER_PRICE)
        });
    info!(assets = universe.count(), cash, "paper venue ready");

    let clock = SystemClock;
    let mut scheduler = Scheduler::new(&config, &provider, &venue, store.as_ref(), &clock);
    let done = scheduler.run(ticks)?;

    eprintln!(
        "{done} ticks, paper value {:.2} {quote} ({:.2} cash)",
        venue.total_value(),
        venue.balance(quote)
    );
    Ok(())
}
