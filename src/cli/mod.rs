//! ipo-trader CLI
//!
//! Commands:
//! - `ipo-trader run` - daily job (scrape, evaluate, trade)
//! - `ipo-trader scrape` / `evaluate` / `trade` - a single pass
//! - `ipo-trader ipos` / `decisions` / `logs` - read-only reports for a date
//! - `ipo-trader listing` - record a listing date and issue price by hand
//! - `ipo-trader token` - store a Kite access token

pub mod output;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// Rule-based IPO listing-day trader
#[derive(Parser, Debug)]
#[command(name = "ipo-trader")]
#[command(author, version, about = "Rule-based IPO subscription and listing-day trader")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml plus environment overlays)
    #[arg(short, long, default_value = "config", global = true)]
    pub config: String,

    /// Use an in-memory store instead of PostgreSQL
    #[arg(long, global = true)]
    pub memory: bool,

    /// Print reports as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full daily job: scrape, evaluate, trade
    Run {
        /// Run date (YYYY-MM-DD, default: today in IST)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Refresh IPOs and subscription snapshots
    Scrape {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Decide BUY/SKIP for IPOs closing on the date
    Evaluate {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Execute pending BUYs for IPOs listing on the date
    Trade {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show IPOs opening, closing or listing on a date
    Ipos {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show decisions recorded for a date
    Decisions {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show run logs for a date
    Logs {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Set the listing date and issue price of a tracked IPO
    Listing {
        /// Company name exactly as tracked
        company: String,
        /// Listing date (YYYY-MM-DD)
        #[arg(long)]
        listing_date: NaiveDate,
        /// Final issue price per share
        #[arg(long)]
        issue_price: Option<Decimal>,
        /// Exchange trading symbol
        #[arg(long)]
        symbol: Option<String>,
    },

    /// Store a Kite access token for today's session
    Token {
        /// Access token obtained from the Kite login flow
        #[arg(long, conflicts_with = "request_token")]
        access_token: Option<String>,
        /// Request token to exchange for an access token
        #[arg(long)]
        request_token: Option<String>,
    },
}

impl Commands {
    /// The `--date` argument, if the command takes one
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Commands::Run { date }
            | Commands::Scrape { date }
            | Commands::Evaluate { date }
            | Commands::Trade { date }
            | Commands::Ipos { date }
            | Commands::Decisions { date }
            | Commands::Logs { date } => *date,
            Commands::Listing { .. } | Commands::Token { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_date_and_global_flags() {
        let cli = Cli::try_parse_from(["ipo-trader", "evaluate", "--date", "2026-02-04", "--memory"])
            .unwrap();
        assert!(cli.memory);
        assert_eq!(cli.command.date(), NaiveDate::from_ymd_opt(2026, 2, 4));
    }

    #[test]
    fn token_accepts_one_source() {
        assert!(Cli::try_parse_from(["ipo-trader", "token", "--access-token", "abc"]).is_ok());
        assert!(Cli::try_parse_from([
            "ipo-trader",
            "token",
            "--access-token",
            "abc",
            "--request-token",
            "def"
        ])
        .is_err());
    }

    #[test]
    fn listing_parses_price() {
        let cli = Cli::try_parse_from([
            "ipo-trader",
            "listing",
            "Alpha Co",
            "--listing-date",
            "2026-02-09",
            "--issue-price",
            "100",
        ])
        .unwrap();

        match cli.command {
            Commands::Listing { company, issue_price, .. } => {
                assert_eq!(company, "Alpha Co");
                assert_eq!(issue_price, Some(Decimal::from(100)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
