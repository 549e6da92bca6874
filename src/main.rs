use chrono::Utc;
use clap::Parser;
use ipo_trader::broker::KiteClient;
use ipo_trader::calendar::{kite_token_expiry, today_ist};
use ipo_trader::cli::output::{print_items, DecisionRow, IpoRow, OutputMode, RunLogRow};
use ipo_trader::cli::{Cli, Commands};
use ipo_trader::config::AppConfig;
use ipo_trader::domain::{Ipo, RunOutcome};
use ipo_trader::error::{Result, TraderError};
use ipo_trader::persistence::{
    DecisionLedger, IpoStore, MemoryStore, PostgresStore, RunLogStore, SessionTokenStore,
    TraderStore,
};
use std::sync::Arc;
use tracing::{error, info};

mod main_runtime;

use main_runtime::{build_orchestrator, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config).unwrap_or_else(|e| {
        eprintln!("Failed to load config from {}: {}", cli.config, e);
        std::process::exit(2);
    });
    init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("Config: {}", e);
        }
        return Err(TraderError::Validation(errors.join("; ")));
    }

    let ok = if cli.memory {
        info!("Using in-memory store");
        dispatch(&cli, &config, Arc::new(MemoryStore::new())).await?
    } else {
        let store =
            PostgresStore::new(&config.database.url, config.database.max_connections).await?;
        store.migrate().await?;
        dispatch(&cli, &config, Arc::new(store)).await?
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one command; `Ok(false)` when a pass ended FAILED
async fn dispatch<S>(cli: &Cli, config: &AppConfig, store: Arc<S>) -> Result<bool>
where
    S: TraderStore + 'static,
{
    let date = cli.command.date().unwrap_or_else(today_ist);
    let mode = OutputMode::from_json_flag(cli.json);

    match &cli.command {
        Commands::Run { .. } => {
            let orchestrator = build_orchestrator(store, config)?;
            Ok(report(&[orchestrator.run_daily(date).await]))
        }
        Commands::Scrape { .. } => {
            let orchestrator = build_orchestrator(store, config)?;
            let (ipos, subs) = orchestrator.run_scrape(date).await;
            Ok(report(&[ipos, subs]))
        }
        Commands::Evaluate { .. } => {
            let orchestrator = build_orchestrator(store, config)?;
            Ok(report(&[orchestrator.run_evaluation(date).await]))
        }
        Commands::Trade { .. } => {
            let orchestrator = build_orchestrator(store, config)?;
            Ok(report(&[orchestrator.run_trading(date).await]))
        }
        Commands::Ipos { .. } => {
            let ipos = store.ipos_for_date(date).await?;
            let rows: Vec<IpoRow> = ipos.iter().map(|ipo| IpoRow::on_date(ipo, date)).collect();
            print_items(&rows, mode)?;
            Ok(true)
        }
        Commands::Decisions { .. } => {
            let decisions = store.decisions_for_date(date).await?;
            let rows: Vec<DecisionRow> = decisions.iter().map(DecisionRow::from).collect();
            print_items(&rows, mode)?;
            Ok(true)
        }
        Commands::Logs { .. } => {
            let logs = store.logs_for_date(date).await?;
            let rows: Vec<RunLogRow> = logs.iter().map(RunLogRow::from).collect();
            print_items(&rows, mode)?;
            Ok(true)
        }
        Commands::Listing {
            company,
            listing_date,
            issue_price,
            symbol,
        } => {
            let mut ipo = store
                .get_ipo(company)
                .await?
                .unwrap_or_else(|| Ipo::new(company.as_str()));
            ipo.listing_date = Some(*listing_date);
            if issue_price.is_some() {
                ipo.issue_price = *issue_price;
            }
            if let Some(symbol) = symbol {
                ipo.symbol = Some(symbol.trim().to_uppercase());
            }
            store.upsert_ipo(&ipo).await?;

            println!(
                "{} lists on {} at {}",
                ipo.company,
                listing_date,
                ipo.issue_price
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "unknown price".to_string())
            );
            Ok(true)
        }
        Commands::Token {
            access_token,
            request_token,
        } => {
            let now = Utc::now();
            let token = match (access_token, request_token) {
                (Some(token), _) => token.clone(),
                (None, Some(request_token)) => {
                    let api_key = config.broker.api_key.clone().ok_or_else(|| {
                        TraderError::Auth("broker.api_key is not configured".to_string())
                    })?;
                    let api_secret = config.broker.api_secret.clone().ok_or_else(|| {
                        TraderError::Auth("broker.api_secret is not configured".to_string())
                    })?;
                    KiteClient::new(&config.broker, api_key)?
                        .generate_session(request_token, &api_secret)
                        .await?
                }
                (None, None) => {
                    let valid = store.valid_access_token(now).await?.is_some();
                    println!(
                        "Stored access token: {}",
                        if valid { "valid" } else { "missing or expired" }
                    );
                    return Ok(valid);
                }
            };

            let expires_at = kite_token_expiry(now);
            store.save_access_token(&token, expires_at).await?;
            println!("Access token stored, valid until {}", expires_at);
            Ok(true)
        }
    }
}

fn report(outcomes: &[RunOutcome]) -> bool {
    for outcome in outcomes {
        println!(
            "{} {} {}: {}",
            outcome.run_date, outcome.kind, outcome.status, outcome.details
        );
    }
    outcomes.iter().all(RunOutcome::is_success)
}
