use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod export;
mod ingest;
mod label;
mod models;
mod report;
mod summary;
mod threshold;
mod window;

use config::{AnalysisConfig, SeriesSource};
use models::{LabeledReading, Reading};
use threshold::{ThresholdTable, DEFAULT_DANGER_PERCENTILE, DEFAULT_WARNING_PERCENTILE};

#[derive(Parser)]
#[command(name = "power-anomaly")]
#[command(about = "Hourly building power consumption anomaly labeler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AnalysisArgs {
    /// Hourly series CSV produced by the resampler; Postgres is used when omitted
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Thresholds use readings dated strictly before this day (defaults to today)
    #[arg(long, env = "POWER_ANOMALY_AS_OF")]
    as_of: Option<NaiveDate>,
    #[arg(long, env = "POWER_ANOMALY_LOOKBACK_DAYS", default_value_t = 30)]
    lookback_days: i64,
    #[arg(long, env = "POWER_ANOMALY_WARNING_PERCENTILE", default_value_t = DEFAULT_WARNING_PERCENTILE)]
    warning_percentile: f64,
    #[arg(long, env = "POWER_ANOMALY_DANGER_PERCENTILE", default_value_t = DEFAULT_DANGER_PERCENTILE)]
    danger_percentile: f64,
}

impl AnalysisArgs {
    fn into_config(self) -> anyhow::Result<AnalysisConfig> {
        let as_of = self
            .as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let cfg = AnalysisConfig::new(
            self.csv,
            as_of,
            self.lookback_days,
            self.warning_percentile,
            self.danger_percentile,
        )?;
        Ok(cfg)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a synthetic demo series ending on the given day
    Seed {
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value_t = 90)]
        days: i64,
    },
    /// Import an hourly series from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the per-bucket warning and danger thresholds
    Thresholds {
        #[command(flatten)]
        analysis: AnalysisArgs,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write the labeled series for the lookback window
    Label {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "labeled.csv")]
        out: PathBuf,
    },
    /// Write the daily and hourly anomaly summaries
    Export {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "daily_power_consumption_data.csv")]
        daily: PathBuf,
        #[arg(long, default_value = "daily_hourly_power_consumption_data.csv")]
        hourly: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set when no --csv series is given")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_series(cfg: &AnalysisConfig) -> anyhow::Result<Vec<Reading>> {
    match &cfg.source {
        SeriesSource::Csv(path) => ingest::load_csv(path)
            .with_context(|| format!("failed to load series from {}", path.display())),
        SeriesSource::Postgres => {
            let pool = connect().await?;
            Ok(db::fetch_readings(&pool).await?)
        }
    }
}

/// Labels the full series, then narrows it to the configured window.
async fn analyze(cfg: &AnalysisConfig) -> anyhow::Result<Vec<LabeledReading>> {
    let readings = load_series(cfg).await?;
    let (_, labeled) = label::label_series(&readings, cfg.as_of, cfg.levels);
    let windowed = window::select_window(&labeled, cfg.as_of, cfg.lookback_days)?;
    info!(
        rows = windowed.len(),
        lookback_days = cfg.lookback_days,
        as_of = %cfg.as_of,
        "selected window"
    );
    Ok(windowed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { end, days } => {
            if days < 1 {
                anyhow::bail!("--days must be at least 1");
            }
            let pool = connect().await?;
            let end = end.unwrap_or_else(|| chrono::Local::now().date_naive());
            let inserted = db::seed(&pool, end, days).await?;
            println!("Seeded {inserted} hourly readings ending {end}.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} readings from {}.", csv.display());
        }
        Commands::Thresholds { analysis, json } => {
            let cfg = analysis.into_config()?;
            let readings = load_series(&cfg).await?;
            let table = ThresholdTable::build(&readings, cfg.as_of, cfg.levels);

            if json {
                let entries: Vec<serde_json::Value> = table
                    .iter()
                    .map(|(key, t)| {
                        serde_json::json!({
                            "workingday": key.day_class.is_working(),
                            "hour": key.hour,
                            "warning_threshold": t.warning,
                            "danger_threshold": t.danger,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if table.is_empty() {
                println!("No history before {}; no thresholds.", cfg.as_of);
            } else {
                println!("Thresholds from history before {}:", cfg.as_of);
                for (key, t) in table.iter() {
                    let class = if key.day_class.is_working() {
                        "working"
                    } else {
                        "weekend"
                    };
                    println!(
                        "- {class} {:02}:00 warning {:.2} danger {:.2}",
                        key.hour, t.warning, t.danger
                    );
                }
            }
        }
        Commands::Label { analysis, out } => {
            let cfg = analysis.into_config()?;
            let rows = analyze(&cfg).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            export::write_labeled(file, &rows)?;
            println!("Labeled {} readings into {}.", rows.len(), out.display());
        }
        Commands::Export {
            analysis,
            daily,
            hourly,
        } => {
            let cfg = analysis.into_config()?;
            let rows = analyze(&cfg).await?;
            export::write_file(&daily, &summary::daily_totals(&rows))?;
            export::write_file(&hourly, &summary::hourly_totals(&rows))?;
            println!(
                "Summaries written to {} and {}.",
                daily.display(),
                hourly.display()
            );
        }
        Commands::Report { analysis, out } => {
            let cfg = analysis.into_config()?;
            let rows = analyze(&cfg).await?;
            let start = window::window_start(cfg.as_of, cfg.lookback_days)?;
            let report = report::build_report(cfg.as_of, start, cfg.levels, &rows);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
