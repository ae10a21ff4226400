//! Command-line probe for the planner engine.
//!
//! # Responsibility
//! - Inspect and edit a local snapshot cache without the app shell.
//! - Preview recurrence expansion.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use plansync_core::schedule::recurrence::{expand_str, parse_cadence, parse_start_date};
use plansync_core::{Bucket, EngineConfig, ItemDraft, PlannerEngine};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "plansync", about = "Local-first planner engine tools", version)]
struct Cli {
    /// Optional JSON engine config
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// SQLite cache file (overrides the config)
    #[arg(long, value_name = "PATH", global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print collection counts and one day's bucket
    Summary {
        /// Day to list (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Print the dates a recurring series would cover
    Expand {
        #[arg(long)]
        start: String,
        /// none | weekly | monthly
        #[arg(long, default_value = "weekly")]
        cadence: String,
    },
    /// Add an item, optionally as a recurring series
    Add {
        #[arg(long)]
        title: String,
        /// Scheduled day (YYYY-MM-DD); unscheduled when omitted
        #[arg(long)]
        date: Option<String>,
        /// Repeat from `date` (weekly | monthly)
        #[arg(long)]
        repeat: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let Cli { config, cache, cmd } = cli;
    match cmd {
        Cmd::Expand { start, cadence } => {
            let cadence = parse_cadence(&cadence)?;
            for date in expand_str(&start, cadence)? {
                println!("{date}");
            }
        }
        Cmd::Summary { date } => {
            let day = parse_day(date.as_deref())?;
            let engine = open_engine(config, cache)?;
            let service = engine.service();
            let snapshot = service.snapshot();
            println!(
                "items={} habits={} goals={} reflections={} messages={}",
                snapshot.items.len(),
                snapshot.habits.len(),
                snapshot.goals.len(),
                snapshot.reflections.len(),
                snapshot.messages.len()
            );
            for (label, bucket) in [("unscheduled", Bucket::Unscheduled), ("today", Bucket::Day(day))] {
                println!("[{label}]");
                for item in service.items_in_bucket(bucket) {
                    let mark = if item.is_completed() { "x" } else { " " };
                    println!("  {:>3} [{mark}] {}", item.order_index, item.title);
                }
            }
            for line in service.habit_lines(day) {
                let mark = if line.done { "x" } else { " " };
                println!("  habit [{mark}] {}", line.name);
            }
        }
        Cmd::Add {
            title,
            date,
            repeat,
        } => {
            let mut engine = open_engine(config, cache)?;
            let service = engine.service_mut();
            match (date, repeat) {
                (Some(date), Some(repeat)) => {
                    let ids = service.create_recurring_item(ItemDraft::new(title), &date, &repeat)?;
                    println!("created {} items", ids.len());
                }
                (Some(date), None) => {
                    let day = parse_start_date(&date)?;
                    let id = service.create_item(ItemDraft::new(title).scheduled_on(day))?;
                    println!("created {id}");
                }
                (None, Some(_)) => return Err("--repeat requires --date".into()),
                (None, None) => {
                    let id = service.create_item(ItemDraft::new(title))?;
                    println!("created {id}");
                }
            }
        }
    }
    Ok(())
}

/// Opens a local engine from the optional config file and cache override.
fn open_engine(
    config: Option<PathBuf>,
    cache: Option<PathBuf>,
) -> Result<PlannerEngine, Box<dyn Error>> {
    let mut config = match config {
        Some(path) => EngineConfig::from_json_file(&path)?,
        None => EngineConfig::default(),
    };
    if cache.is_some() {
        config.cache_path = cache;
    }
    Ok(PlannerEngine::open_local(&config)?)
}

fn parse_day(value: Option<&str>) -> Result<NaiveDate, Box<dyn Error>> {
    match value {
        Some(raw) => Ok(parse_start_date(raw)?),
        None => Ok(Local::now().date_naive()),
    }
}
