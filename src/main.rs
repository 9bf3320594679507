// src/main.rs - mdm-dedupe command line
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use dedupe_lib::matching::zone_report::DEFAULT_REPORT_THRESHOLD;
use dedupe_lib::merge::MostCompleteSurvives;
use dedupe_lib::models::{Dimension, MergeOutcomeStatus, OpenCandidateFilter, Recommendation};
use dedupe_lib::store::PgStore;
use dedupe_lib::utils::db_connect::{connect, get_pool_status, DatabaseConfig};
use dedupe_lib::utils::env::load_env;
use dedupe_lib::{EngineConfig, ResolutionEngine};

#[derive(Parser)]
#[command(author, version, about = "Master-data duplicate detection and merge resolution", long_about = None)]
struct Cli {
    /// Dimension to resolve (vendor or zone)
    #[arg(long, global = true, default_value = "vendor")]
    dimension: String,

    /// TOML match rules; falls back to MATCH_RULES
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Keep the larger-populated record instead of the smaller id
    #[arg(long, global = true)]
    most_complete_survives: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score candidate pairs and enqueue review entries
    Generate {
        /// Score and classify without writing to the queue
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply OPEN AUTO_MERGE entries at or above the auto-merge threshold
    ApplyMerges,
    /// Steward review of queued candidates
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Give every entity without a lifecycle record an ACTIVE one
    SeedLifecycle,
    /// Lifecycle state distribution
    Profile,
    /// Write an exact + fuzzy duplicate report as JSON
    ZoneReport {
        #[arg(long, default_value_t = DEFAULT_REPORT_THRESHOLD)]
        threshold: f64,
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Create lifecycle, review queue and audit tables for the dimension
    InitSchema,
}

#[derive(Subcommand)]
enum ReviewAction {
    /// OPEN entries, highest confidence first
    List {
        /// AUTO_MERGE, STEWARD_REVIEW or MANUAL
        #[arg(long)]
        recommendation: Option<String>,
        #[arg(long)]
        min_confidence: Option<f64>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Merge the pair with the steward as approver
    Approve {
        review_id: i64,
        #[arg(long)]
        reviewer: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Close the entry without merging
    Reject {
        review_id: i64,
        #[arg(long)]
        reviewer: String,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let cli = Cli::parse();
    let start = Instant::now();

    let dimension = Dimension::from_name(&cli.dimension)
        .ok_or_else(|| anyhow!("unknown dimension '{}' (expected vendor or zone)", cli.dimension))?;
    let config = EngineConfig::resolve(cli.rules.as_deref())
        .context("Failed to load match configuration")?;
    config
        .validate_for(&dimension)
        .context("Invalid match configuration")?;
    info!(
        "Dimension '{}': auto_merge >= {}, steward_review >= {}",
        dimension.name, config.thresholds.auto_merge, config.thresholds.steward_review
    );

    let db_config = DatabaseConfig::from_env();
    let pool = connect(&db_config)
        .await
        .context("Failed to connect to database")?;
    let store = PgStore::new(pool.clone(), dimension).context("Invalid dimension definition")?;

    if let Command::InitSchema = cli.command {
        store
            .ensure_schema()
            .await
            .context("Failed to create resolution tables")?;
        return Ok(());
    }

    let show_pool_stats = config.progress.should_show_db_connection_stats();
    let mut engine = ResolutionEngine::new(config, Arc::new(store))
        .context("Failed to construct resolution engine")?;
    if cli.most_complete_survives {
        engine = engine.with_survivor_policy(Box::new(MostCompleteSurvives));
    }

    let mut failed = false;
    match cli.command {
        Command::Generate { dry_run } => {
            let report = engine
                .generate(dry_run)
                .await
                .context("Candidate generation failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::ApplyMerges => {
            let report = engine
                .apply_auto_merges()
                .await
                .context("Merge run failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            failed = report.has_failures();
        }
        Command::Review { action } => match action {
            ReviewAction::List {
                recommendation,
                min_confidence,
                limit,
            } => {
                let recommendation = match recommendation {
                    Some(raw) => Some(
                        Recommendation::parse(&raw.to_uppercase())
                            .ok_or_else(|| anyhow!("unknown recommendation '{}'", raw))?,
                    ),
                    None => None,
                };
                let entries = engine
                    .list_open(&OpenCandidateFilter {
                        recommendation,
                        min_confidence,
                        limit: Some(limit),
                    })
                    .await
                    .context("Failed to list review queue")?;
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
            ReviewAction::Approve {
                review_id,
                reviewer,
                notes,
            } => {
                let outcome = engine
                    .approve(review_id, &reviewer, notes)
                    .await
                    .with_context(|| format!("Failed to approve review {}", review_id))?;
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                failed = !matches!(outcome.status, MergeOutcomeStatus::Merged { .. });
            }
            ReviewAction::Reject {
                review_id,
                reviewer,
                notes,
            } => {
                let entry = engine
                    .reject(review_id, &reviewer, notes)
                    .await
                    .with_context(|| format!("Failed to reject review {}", review_id))?;
                println!("{}", serde_json::to_string_pretty(&entry)?);
            }
        },
        Command::SeedLifecycle => {
            let seeded = engine
                .seed_lifecycle()
                .await
                .context("Failed to seed lifecycle records")?;
            info!("Seeded {} ACTIVE lifecycle records", seeded);
        }
        Command::Profile => {
            let profile = engine.profile().await.context("Failed to profile dimension")?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::ZoneReport { threshold, out } => {
            let report = engine
                .duplicate_report(threshold)
                .await
                .context("Failed to build duplicate report")?;
            let body = serde_json::to_string_pretty(&report)?;
            match out {
                Some(path) => {
                    fs::write(&path, body)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(
                        "Wrote {} exact groups and {} fuzzy pairs to {}",
                        report.counts.exact_groups,
                        report.counts.fuzzy_pairs,
                        path.display()
                    );
                }
                None => println!("{}", body),
            }
        }
        Command::InitSchema => {}
    }

    if show_pool_stats {
        let (size, idle, in_use) = get_pool_status(&pool);
        info!("DB pool: {} connections ({} idle, {} in use)", size, idle, in_use);
    }
    info!("Finished in {:.2?}", start.elapsed());

    if failed {
        warn!("Run completed with failures");
        std::process::exit(1);
    }
    Ok(())
}
