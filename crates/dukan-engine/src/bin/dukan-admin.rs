//! # Dukan Admin
//!
//! Back-office maintenance of daily figures.
//!
//! ## Usage
//! ```bash
//! # Rebuild a day from the ledger
//! cargo run -p dukan-engine --bin dukan-admin -- recalculate 2026-10-19
//!
//! # Close / reopen a day
//! cargo run -p dukan-engine --bin dukan-admin -- close 2026-10-19 --user manager
//! cargo run -p dukan-engine --bin dukan-admin -- reopen 2026-10-19 --user manager
//!
//! # Catch up days flagged for reconciliation
//! cargo run -p dukan-engine --bin dukan-admin -- replay
//!
//! # Exports
//! cargo run -p dukan-engine --bin dukan-admin -- summary 2026-10-19 --detailed
//! cargo run -p dukan-engine --bin dukan-admin -- annual 2026
//! ```
//!
//! Output is JSON on stdout. Failures print an `ApiError` on stderr and
//! exit with status 1.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use dukan_core::ValidationError;
use dukan_engine::{telemetry, ApiError, Engine, EngineConfig, EngineResult};
use serde::Serialize;

enum Command {
    Recalculate(NaiveDate),
    Close(NaiveDate),
    Reopen(NaiveDate),
    Pending,
    Replay,
    Summary { date: NaiveDate, detailed: bool },
    Annual(i32),
}

struct Invocation {
    command: Command,
    user: String,
    db_path: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    let invocation = match parse(&args) {
        Ok(invocation) => invocation,
        Err(e) => return fail(ApiError::from(dukan_engine::EngineError::from(e))),
    };

    match run(invocation).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e.into()),
    }
}

async fn run(invocation: Invocation) -> EngineResult<()> {
    let mut config = EngineConfig::from_env();
    if let Some(path) = invocation.db_path {
        config.database_path = PathBuf::from(path);
    }

    let engine = Engine::open(config).await?;
    let daily = engine.daily();
    let user = invocation.user.as_str();

    match invocation.command {
        Command::Recalculate(date) => print(&daily.recalculate(date).await?),
        Command::Close(date) => print(&daily.close(date, user).await?),
        Command::Reopen(date) => print(&daily.reopen(date, user).await?),
        Command::Pending => print(&engine.reconciliation().pending_days().await?),
        Command::Replay => print(&engine.reconciliation().replay_pending().await?),
        Command::Summary { date, detailed: true } => print(&daily.export_detailed_rows(date).await?),
        Command::Summary { date, detailed: false } => print(&daily.export_rows(date).await?),
        Command::Annual(year) => print(&daily.annual_summary(year).await?),
    }
}

fn parse(args: &[String]) -> Result<Invocation, ValidationError> {
    let mut positional = Vec::new();
    let mut user = String::from("admin");
    let mut db_path = None;
    let mut detailed = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--user" | "-u" => {
                user = value_after(args, i, "user")?;
                i += 1;
            }
            "--db" | "-d" => {
                db_path = Some(value_after(args, i, "db")?);
                i += 1;
            }
            "--detailed" => detailed = true,
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let name = positional.next().unwrap_or_default();
    let operand = positional.next();

    let command = match name.as_str() {
        "recalculate" => Command::Recalculate(parse_date(operand)?),
        "close" => Command::Close(parse_date(operand)?),
        "reopen" => Command::Reopen(parse_date(operand)?),
        "pending" => Command::Pending,
        "replay" => Command::Replay,
        "summary" => Command::Summary {
            date: parse_date(operand)?,
            detailed,
        },
        "annual" => {
            let raw = operand.ok_or_else(|| ValidationError::Required {
                field: "year".to_string(),
            })?;
            let year = raw.parse().map_err(|_| ValidationError::InvalidFormat {
                field: "year".to_string(),
                reason: format!("'{}' is not a year", raw),
            })?;
            Command::Annual(year)
        }
        other => {
            return Err(ValidationError::InvalidFormat {
                field: "command".to_string(),
                reason: format!("unknown command '{}'", other),
            })
        }
    };

    Ok(Invocation {
        command,
        user,
        db_path,
    })
}

fn value_after(args: &[String], i: usize, field: &str) -> Result<String, ValidationError> {
    args.get(i + 1).cloned().ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })
}

fn parse_date(raw: Option<String>) -> Result<NaiveDate, ValidationError> {
    let raw = raw.ok_or_else(|| ValidationError::Required {
        field: "date".to_string(),
    })?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| ValidationError::InvalidFormat {
        field: "date".to_string(),
        reason: format!("'{}' is not YYYY-MM-DD", raw),
    })
}

fn print<T: Serialize>(value: &T) -> EngineResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    println!("{}", json);
    Ok(())
}

fn fail(err: ApiError) -> ExitCode {
    match serde_json::to_string_pretty(&err) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", err),
    }
    ExitCode::FAILURE
}

fn print_help() {
    println!("Dukan POS Admin");
    println!();
    println!("Usage: dukan-admin <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  recalculate <DATE>        Rebuild a day from the ledger");
    println!("  close <DATE>              Close a day (recalculates first)");
    println!("  reopen <DATE>             Reopen a closed day");
    println!("  pending                   List days flagged for reconciliation");
    println!("  replay                    Rebuild every flagged day");
    println!("  summary <DATE>            Day totals with product and customer rows");
    println!("  annual <YEAR>             Per-month totals for a year");
    println!();
    println!("Options:");
    println!("  -u, --user <NAME>         Recorded as closer/reopener (default: admin)");
    println!("  -d, --db <PATH>           Database file (default: DUKAN_DB_PATH or data dir)");
    println!("      --detailed            Include transaction rows in summary");
    println!("  -h, --help                Show this help message");
}
