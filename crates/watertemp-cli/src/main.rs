//! `watertemp`: record and chart water temperature readings.
//!
//! # Usage
//!
//! ```text
//! watertemp add --temperature 21.5 --at 2024-01-01
//! watertemp list
//! watertemp update 3 --clear-date
//! watertemp delete 3
//! watertemp chart --json
//! ```

mod input;
mod settings;

use std::{
  io::{self, BufRead, Write},
  path::PathBuf,
};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use watertemp_core::{Measurement, MeasurementRepository};
use watertemp_store_sqlite::SqliteStore;
use watertemp_sync::{
  ChartEntry, ChartProjection, ChartSummary, EditOutcome, Entry, EntryKey, FieldEdit,
  StateSnapshot, SyncController, SyncHandle,
};

use crate::settings::AppConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "watertemp", version, about = "Record and chart water temperature readings")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "watertemp.toml")]
  config: PathBuf,

  /// SQLite file to use instead of the configured `store_path`.
  #[arg(long, value_name = "PATH", env = "WATERTEMP_STORE")]
  store: Option<PathBuf>,

  /// Print machine-readable JSON instead of text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show every measurement, newest first.
  List,

  /// Record a new measurement.
  Add {
    /// Temperature in °C.
    #[arg(short, long, value_parser = input::parse_celsius, allow_hyphen_values = true)]
    temperature: Option<f64>,

    /// When it was taken: YYYY-MM-DD or an RFC 3339 timestamp.
    #[arg(short = 'a', long = "at", value_parser = input::parse_when)]
    taken_at: Option<DateTime<Utc>>,
  },

  /// Change fields of a stored measurement.
  Update {
    id: i64,

    #[arg(short, long, value_parser = input::parse_celsius, allow_hyphen_values = true)]
    temperature: Option<f64>,

    #[arg(short = 'a', long = "at", value_parser = input::parse_when)]
    taken_at: Option<DateTime<Utc>>,

    /// Clear the temperature. The stored row is kept but hidden from the chart.
    #[arg(long, conflicts_with = "temperature")]
    clear_temperature: bool,

    /// Clear the date. The stored row is kept but hidden from the chart.
    #[arg(long, conflicts_with = "taken_at")]
    clear_date: bool,
  },

  /// Delete a stored measurement.
  Delete {
    id: i64,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    yes: bool,
  },

  /// Show the chart series and summary statistics.
  Chart,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr so that command output stays parseable.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let mut cfg = AppConfig::load(&cli.config)?;
  if let Some(store) = &cli.store {
    cfg.store_path = settings::expand_tilde(store);
  }

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let controller = SyncController::new(MeasurementRepository::new(store)).with_observer(
    |entries: &[Entry], chart: &ChartProjection| {
      debug!(rows = entries.len(), points = chart.len(), "state changed");
    },
  );
  let (handle, _task) = SyncHandle::spawn(controller);

  handle.load().await.context("failed to load measurements")?;

  match cli.command {
    Command::List => list(&handle, cli.json).await,
    Command::Add { temperature, taken_at } => {
      add(&handle, temperature, taken_at, cli.json).await
    }
    Command::Update {
      id,
      temperature,
      taken_at,
      clear_temperature,
      clear_date,
    } => {
      let mut edits = Vec::new();
      if let Some(t) = temperature {
        edits.push(FieldEdit::Temperature(Some(t)));
      }
      if clear_temperature {
        edits.push(FieldEdit::Temperature(None));
      }
      if let Some(at) = taken_at {
        edits.push(FieldEdit::TakenAt(Some(at)));
      }
      if clear_date {
        edits.push(FieldEdit::TakenAt(None));
      }
      update(&handle, id, edits, cli.json).await
    }
    Command::Delete { id, yes } => delete(&handle, id, yes).await,
    Command::Chart => chart(&handle, &cfg, cli.json).await,
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn list(handle: &SyncHandle, json: bool) -> Result<()> {
  let snapshot = handle.snapshot().await?;
  if json {
    return print_json(&snapshot.measurements);
  }

  if snapshot.measurements.is_empty() {
    println!("No measurements yet.");
    return Ok(());
  }
  println!("{:>6}  {:<20}  {:>8}", "ID", "DATE", "TEMP");
  for entry in &snapshot.measurements {
    println!("{}", format_row(entry));
  }
  Ok(())
}

async fn add(
  handle: &SyncHandle,
  temperature: Option<f64>,
  taken_at: Option<DateTime<Utc>>,
  json: bool,
) -> Result<()> {
  let draft = handle.add_draft().await?;
  let edits = vec![FieldEdit::Temperature(temperature), FieldEdit::TakenAt(taken_at)];

  match handle.edit(draft, edits).await? {
    EditOutcome::Saved(key) => report_saved(handle, key, json).await,
    EditOutcome::Held(missing) => bail!("not saved: missing {missing}"),
  }
}

async fn update(handle: &SyncHandle, id: i64, edits: Vec<FieldEdit>, json: bool) -> Result<()> {
  if edits.is_empty() {
    bail!("nothing to change; pass --temperature, --at, --clear-temperature or --clear-date");
  }
  let key = stored_key(handle, id).await?;

  match handle.edit(key, edits).await? {
    EditOutcome::Saved(key) => report_saved(handle, key, json).await,
    EditOutcome::Held(missing) => {
      // The session ends here, so the stored row simply stays as it was.
      println!("#{id} is now missing {missing}; stored row kept unchanged and hidden from the chart");
      Ok(())
    }
  }
}

async fn delete(handle: &SyncHandle, id: i64, yes: bool) -> Result<()> {
  let key = stored_key(handle, id).await?;
  let snapshot = handle.snapshot().await?;
  let entry = find(&snapshot, key)?;

  if !yes && !confirm(&format!("Delete {}?", describe(&entry.measurement)))? {
    println!("Cancelled.");
    return Ok(());
  }

  handle.delete(key).await?;
  println!("Deleted #{id}.");
  Ok(())
}

#[derive(Serialize)]
struct ChartOutput {
  entries: Vec<ChartEntry>,
  summary: Option<ChartSummary>,
}

async fn chart(handle: &SyncHandle, cfg: &AppConfig, json: bool) -> Result<()> {
  let snapshot = handle.snapshot().await?;
  let output = ChartOutput {
    entries: snapshot.chart.entries(&cfg.chart),
    summary: snapshot.chart.summary(),
  };
  if json {
    return print_json(&output);
  }

  for entry in &output.entries {
    println!("{:<20}  {:>8}", entry.label, entry.value_label);
  }
  if let Some(s) = output.summary {
    println!();
    println!(
      "{} points  min {:.1}°C  max {:.1}°C  mean {:.1}°C  latest {:.1}°C on {}",
      s.count,
      s.min,
      s.max,
      s.mean,
      s.latest.temperature,
      cfg.chart.label(s.latest.taken_at),
    );
  }
  Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn stored_key(handle: &SyncHandle, id: i64) -> Result<EntryKey> {
  let key = EntryKey::Stored(id);
  let snapshot = handle.snapshot().await?;
  find(&snapshot, key)?;
  Ok(key)
}

fn find(snapshot: &StateSnapshot, key: EntryKey) -> Result<&Entry> {
  snapshot
    .measurements
    .iter()
    .find(|e| e.key == key)
    .ok_or_else(|| anyhow!("no measurement {key}"))
}

async fn report_saved(handle: &SyncHandle, key: EntryKey, json: bool) -> Result<()> {
  let snapshot = handle.snapshot().await?;
  let entry = find(&snapshot, key)?;
  if json {
    return print_json(entry);
  }
  println!("Saved {}.", describe(&entry.measurement));
  Ok(())
}

fn describe(m: &Measurement) -> String {
  let temp = m
    .temperature
    .map(|t| format!("{t:.1}°C"))
    .unwrap_or_else(|| "no temperature".into());
  let date = m
    .taken_at
    .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
    .unwrap_or_else(|| "no date".into());
  format!("#{} ({temp} on {date})", m.id)
}

fn format_row(entry: &Entry) -> String {
  let m = &entry.measurement;
  let id = match entry.key {
    EntryKey::Stored(id) => id.to_string(),
    EntryKey::Draft(_) => "-".into(),
  };
  let date = m
    .taken_at
    .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
    .unwrap_or_default();
  let temp = m.temperature.map(|t| format!("{t:.1}°C")).unwrap_or_default();
  format!("{id:>6}  {date:<20}  {temp:>8}")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  let out = serde_json::to_string_pretty(value).context("serialising output")?;
  println!("{out}");
  Ok(())
}

/// Ask a yes/no question on stderr and read the answer from stdin.
fn confirm(question: &str) -> Result<bool> {
  eprint!("{question} [y/N] ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
