//! `trading-agent` CLI (spec §6): `run` starts the scheduler loop, `status`
//! prints MarketClock state and collaborator reachability, `backfill`
//! rebuilds the universe cache, `replay` offline-reparses a day's decisions.
//!
//! Collaborator wiring: `Model` is the one concrete transport this spec pins
//! (a generic local HTTP endpoint, via `HttpModelClient`); `Broker` and
//! `NewsProvider` are explicitly out of scope as "raw HTTP/SDK wrappers for
//! the brokerage" (spec §1 Non-goals), so this binary wires
//! `core_prompting::test_support`'s realistic fakes in their place —
//! swapping in a real brokerage adapter is a drop-in `Arc<dyn Broker>`
//! change, not a rewrite. `AlertSink` defaults to `LoggingAlertSink`.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use core_models::AccountState;
use rust_decimal::Decimal;
use core_prompting::test_support::{FakeBroker, FakeNewsProvider};
use core_prompting::{Broker, HttpModelClient, Model, NewsProvider};
use core_store::Store;
use tracing_subscriber::EnvFilter;
use trading_core::config;

#[derive(Parser, Debug)]
#[command(name = "trading-agent", about = "Algorithmic paper-trading decision core")]
struct Cli {
    #[arg(short, long, default_value = "config/trading-agent.toml")]
    config: String,

    #[arg(long, default_value = "data")]
    data_dir: String,

    #[arg(long, default_value = "data/trading-agent.sqlite3")]
    sqlite_path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the scheduler loop; runs until SIGINT/SIGTERM.
    Run,
    /// Print the current MarketClock state and collaborator reachability.
    Status,
    /// Rebuild the universe cache.
    Backfill,
    /// Offline-reparse a day's recorded decisions.
    Replay {
        #[arg(long)]
        date: NaiveDate,
    },
}

/// Exit codes per spec §6: 0 clean shutdown, 2 config error, 3 broker-probe
/// or non-paper-account failure, 1 otherwise.
const EXIT_CONFIG_ERROR: i32 = 2;
const EXIT_BROKER_FAILURE: i32 = 3;
const EXIT_OTHER_ERROR: i32 = 1;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let placeholder_account = AccountState {
        equity: Decimal::new(100_000, 0),
        cash: Decimal::new(100_000, 0),
        buying_power: Decimal::new(100_000, 0),
        daytime_trades_used: 0,
        positions: Vec::new(),
        timestamp: chrono::Utc::now(),
    };
    let broker: Arc<dyn Broker> = Arc::new(FakeBroker::new(placeholder_account, true));
    let model: Arc<dyn Model> = Arc::new(HttpModelClient::new(
        config.model.endpoint.clone(),
        config.model.name.clone(),
        config.model.temperature,
        config.model.timeout_seconds,
    ));
    let news_provider: Arc<dyn NewsProvider> = Arc::new(FakeNewsProvider::new());

    match broker.is_paper_account().await {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("broker does not advertise paper mode, refusing to initialize");
            std::process::exit(EXIT_BROKER_FAILURE);
        }
        Err(e) => {
            eprintln!("broker startup probe failed: {e}");
            std::process::exit(EXIT_BROKER_FAILURE);
        }
    }

    let store = match Store::open(&cli.sqlite_path, &cli.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("failed to open store: {e}");
            std::process::exit(EXIT_OTHER_ERROR);
        }
    };

    let result = match cli.command {
        Command::Run => run(&config, broker, model, news_provider, store).await,
        Command::Status => status(&config, broker, model).await,
        Command::Backfill => backfill(&config, broker, store).await,
        Command::Replay { date } => replay(store, date).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:?}");
        std::process::exit(EXIT_OTHER_ERROR);
    }
}

async fn run(
    config: &core_models::Config,
    broker: Arc<dyn Broker>,
    model: Arc<dyn Model>,
    news_provider: Arc<dyn NewsProvider>,
    store: Arc<Store>,
) -> Result<()> {
    let system = trading_core::build_system(config, broker, model, news_provider, None, store)
        .context("failed to build system")?;

    let cancel = system.scheduler.cancel_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel.cancel();
    });

    system
        .scheduler
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("scheduler exited with error: {e}"))
}

async fn status(config: &core_models::Config, broker: Arc<dyn Broker>, model: Arc<dyn Model>) -> Result<()> {
    let timezone: chrono_tz::Tz = config
        .market
        .timezone
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid market timezone {}", config.market.timezone))?;
    let clock = core_scheduler::MarketClock::new(timezone, Some(Arc::clone(&broker)));
    let state = clock.now_state(chrono::Utc::now()).await;
    println!("market_state: {state:?}");

    match broker.get_market_status().await {
        Ok(status) => println!("broker: reachable (is_open={})", status.is_open),
        Err(e) => println!("broker: unreachable ({e})"),
    }
    println!("model: {}", model.name());
    Ok(())
}

async fn backfill(config: &core_models::Config, broker: Arc<dyn Broker>, store: Arc<Store>) -> Result<()> {
    let account = broker.get_account().await.context("failed to refresh account for backfill")?;
    let holdings: Vec<String> = account.positions.iter().map(|p| p.symbol.clone()).collect();
    let manager = core_scheduler::UniverseManager::new(&store, config.universe.size);
    let entries = manager
        .build(&holdings, &config.trading.symbols, &[])
        .context("failed to rebuild universe cache")?;
    println!("universe cache rebuilt: {} symbols", entries.len());
    Ok(())
}

async fn replay(store: Arc<Store>, date: NaiveDate) -> Result<()> {
    let decisions = store.read_all_decisions().context("failed to read decisions")?;
    let on_date: Vec<_> = decisions
        .into_iter()
        .filter(|d| d.timestamp.date_naive() == date)
        .collect();
    println!("{}", serde_json::to_string_pretty(&on_date)?);
    Ok(())
}
