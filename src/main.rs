// Ruby AI Server - Main Entry Point
//
// This binary provides:
// - The HTTP API (waitlist, accounts, entitlements, dashboard)
// - Offline entitlement policy evaluation for support and debugging

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use ruby_ai::config::Config;
use ruby_ai::entitlements::{
    can_use_feature, can_use_feature_named, consume_quota, Feature, Tier, TierLimits,
    UsageSnapshot,
};
use ruby_ai::server::{self, AppState};
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

/// Ruby AI: real-estate investment analysis backend
#[derive(Parser, Debug)]
#[command(name = "ruby-ai")]
#[command(author = "Ruby AI Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Usage entitlements and API server for Ruby AI", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Usage counters for offline evaluation
#[derive(ClapArgs, Debug)]
struct SnapshotArgs {
    /// Reports generated this period
    #[arg(long, default_value_t = 0)]
    reports_used: u32,

    /// AI questions asked this period
    #[arg(long, default_value_t = 0)]
    ai_questions_used: u32,

    /// Saved properties counted this period
    #[arg(long, default_value_t = 0)]
    saved_properties: u32,

    /// Period reset date (YYYY-MM-DD); defaults to the start of next month
    #[arg(long)]
    resets_on: Option<NaiveDate>,
}

impl SnapshotArgs {
    fn snapshot(&self, today: NaiveDate) -> UsageSnapshot {
        let mut snapshot = match self.resets_on {
            Some(date) => UsageSnapshot::new(date),
            None => UsageSnapshot::starting(today),
        };
        snapshot.reports_used = self.reports_used;
        snapshot.ai_questions_used = self.ai_questions_used;
        snapshot.saved_properties = self.saved_properties;
        snapshot
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API server
    Serve,
    /// Evaluate a feature gate for a tier and usage snapshot
    Check {
        /// Account tier (free, pro)
        #[arg(long, default_value = "free")]
        tier: Tier,

        /// Feature identifier (report, ai_question, save_property, export_pdf)
        #[arg(long)]
        feature: String,

        /// Reject unknown feature identifiers instead of denying them
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        usage: SnapshotArgs,
    },
    /// Spend one unit of a metered feature and print the new snapshot
    Consume {
        #[arg(long, default_value = "free")]
        tier: Tier,

        #[arg(long)]
        feature: Feature,

        #[command(flatten)]
        usage: SnapshotArgs,
    },
    /// Apply the period rollover to a snapshot
    Rollover {
        /// Date to roll over to (YYYY-MM-DD); defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,

        #[command(flatten)]
        usage: SnapshotArgs,
    },
    /// Print the quota table
    Limits,
}

fn init_tracing(verbose: bool, config: &Config) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.log_level()?
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format.to_lowercase().as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    init_tracing(args.verbose, &config)?;
    debug!("Ruby AI v0.1.0 starting with {:?}", config);

    let today = Utc::now().date_naive();

    match args.command {
        Some(Commands::Serve) => {
            info!("Starting API server...");
            server::serve(&config, AppState::in_memory(&config)).await?;
        }
        Some(Commands::Check {
            tier,
            feature,
            strict,
            usage,
        }) => {
            let snapshot = usage.snapshot(today);
            let allowed = if strict {
                let feature: Feature = feature.parse()?;
                can_use_feature(&snapshot, tier, feature)
            } else {
                can_use_feature_named(&snapshot, tier, &feature)
            };
            println!(
                "{}",
                json!({ "feature": feature, "tier": tier, "allowed": allowed })
            );
        }
        Some(Commands::Consume {
            tier,
            feature,
            usage,
        }) => {
            let snapshot = usage.snapshot(today);
            let next = consume_quota(&snapshot, tier, feature)
                .with_context(|| format!("Cannot consume {} on the {} tier", feature, tier))?;
            println!("{}", serde_json::to_string(&next)?);
        }
        Some(Commands::Rollover { today: at, usage }) => {
            let at = at.unwrap_or(today);
            let rolled = usage.snapshot(at).rollover_if_due(at);
            println!("{}", serde_json::to_string(&rolled)?);
        }
        Some(Commands::Limits) => {
            println!("{}", serde_json::to_string_pretty(&TierLimits::table())?);
        }
        None => {
            info!("No command specified. Use \"ruby-ai --help\" for usage.");
        }
    }

    Ok(())
}
