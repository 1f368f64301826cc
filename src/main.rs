//! LoopTrial command-line driver.
//!
//! Wires the course config, database, and upstream client together and
//! exposes the engine operations for operators: resolve a rider's season
//! attempt, import a rider's history, print leaderboards.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use looptrial::attempts::selector::ResolveError;
use looptrial::attempts::Attempt;
use looptrial::leaderboards::format_ms;
use looptrial::seasons::SeasonKey;
use looptrial::upstream::AthleteToken;
use looptrial::{
    config, BestAttemptSelector, Database, HistoricalImporter, LeaderboardAggregator, SourceClient,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to course.toml (defaults to the platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (defaults to the platform data dir)
    #[arg(long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a rider's best attempt for one season
    Resolve {
        /// Upstream athlete id
        #[arg(long)]
        athlete: i64,

        /// Bearer access token for the rider
        #[arg(long)]
        token: String,

        /// Season key, e.g. 2025-fall
        #[arg(long)]
        season: SeasonKey,

        /// Summarize this activity instead of enumerating candidates
        /// (requires allow_forced_activity in the course config)
        #[arg(long)]
        activity: Option<i64>,
    },

    /// Import a rider's full effort history
    Import {
        /// Upstream athlete id
        #[arg(long)]
        athlete: i64,

        /// Bearer access token for the rider
        #[arg(long)]
        token: String,
    },

    /// Print a leaderboard for a race year
    Board {
        /// Race year, e.g. 2025 covers fall/winter 2024 + spring/summer 2025
        #[arg(long)]
        year: i32,

        #[arg(long, value_enum, default_value = "overall")]
        view: ViewKind,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewKind {
    Overall,
    Climbing,
    Descending,
    Legacy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::get_config_path);
    let course = config::load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let db_path = cli.database.unwrap_or_else(config::get_database_path);
    let db = Arc::new(Database::open(&db_path)?);

    match cli.command {
        Commands::Resolve {
            athlete,
            token,
            season,
            activity,
        } => {
            let client = SourceClient::new(course.base_url.clone());
            let selector = BestAttemptSelector::new(client, db, course);
            let token = AthleteToken::new(athlete, token);

            let result = match activity {
                Some(activity_id) => selector.resolve_forced(&token, season, activity_id).await,
                None => selector.resolve(&token, season).await,
            };

            match result {
                Ok(attempt) => println!(
                    "{}: activity {} in {}{}",
                    season,
                    attempt.activity_id,
                    format_ms(attempt.main_ms.into()),
                    bonus_note(&attempt)
                ),
                // Admission outcomes are answers, not faults.
                Err(e @ (ResolveError::NoSeasonWindow(_) | ResolveError::NoQualifyingEffort(_))) => {
                    println!("{}", e)
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Import { athlete, token } => {
            let client = SourceClient::new(course.base_url.clone());
            let importer = HistoricalImporter::new(client, db, course);
            let summary = importer
                .import_all(&AthleteToken::new(athlete, token))
                .await?;

            println!(
                "imported {} efforts ({} skipped)",
                summary.imported, summary.skipped
            );
            for (year, rollup) in &summary.race_years {
                let seasons: Vec<String> = rollup
                    .best_ms
                    .iter()
                    .map(|(key, ms)| format!("{} {}", key, format_ms(u64::from(*ms))))
                    .collect();
                println!("  {}: {}", year, seasons.join(", "));
            }
        }

        Commands::Board { year, view, json } => {
            let aggregator = LeaderboardAggregator::new(db, course);
            match view {
                ViewKind::Overall => {
                    let rows = aggregator.overall(year)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                    } else {
                        for (i, row) in rows.iter().enumerate() {
                            println!(
                                "{:>3}. {:<24} {:>9}  (best season {})",
                                i + 1,
                                row.display_name,
                                format_ms(row.total_ms),
                                format_ms(u64::from(row.best_season_ms))
                            );
                        }
                    }
                }
                ViewKind::Climbing | ViewKind::Descending => {
                    let rows = match view {
                        ViewKind::Climbing => aggregator.climbing(year)?,
                        _ => aggregator.descending(year)?,
                    };
                    if json {
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                    } else {
                        for (i, row) in rows.iter().enumerate() {
                            println!(
                                "{:>3}. {:<24} {:>9}  ({} seasons)",
                                i + 1,
                                row.display_name,
                                format_ms(row.total_ms),
                                row.seasons.len()
                            );
                        }
                    }
                }
                ViewKind::Legacy => {
                    let rows = aggregator.legacy(year)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                    } else {
                        for (i, row) in rows.iter().enumerate() {
                            let score = match row.final_ms {
                                Some(ms) => format_ms(ms),
                                None => "DNF".to_string(),
                            };
                            println!("{:>3}. {:<24} {:>9}", i + 1, row.display_name, score);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Render recorded bonus sums for the resolve output.
fn bonus_note(attempt: &Attempt) -> String {
    let mut note = String::new();
    if let Some(climb) = attempt.climb_sum_ms {
        note.push_str(&format!(", climb {}", format_ms(u64::from(climb))));
    }
    if let Some(desc) = attempt.desc_sum_ms {
        note.push_str(&format!(", descent {}", format_ms(u64::from(desc))));
    }
    note
}
