//! EcoTrack - Eco-Activity Scoring & Progression Engine
//!
//! Command-line entry point. Every command prints its result as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use ecotrack::carbon::types::{DailyAnswers, LifestyleProfile};
use ecotrack::personalized::GenerativeClient;
use ecotrack::storage::config::{load_config, load_config_from};
use ecotrack::{EcoEngine, SqliteStore};

#[derive(Parser)]
#[command(name = "ecotrack", version)]
#[command(about = "Daily carbon footprint tracking with streaks, points and challenges")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// User id
    #[arg(short, long, global = true)]
    user: Option<Uuid>,

    /// Config file (defaults to config.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a day's answers
    Submit {
        /// Answers as inline JSON or a path to a JSON file
        #[arg(short, long)]
        answers: String,

        /// Date being logged (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Show personalized challenges
    Challenges {
        /// Regenerate instead of using the cache
        #[arg(long)]
        refresh: bool,
    },
    /// List the built-in challenge catalog
    Catalog,
    /// Join a challenge
    Join {
        /// Challenge id
        challenge_id: String,
    },
    /// Leave a challenge
    Leave {
        /// Challenge id
        challenge_id: String,
    },
    /// Show enrollments still in progress
    Active,
    /// Show points, level, badges and streak
    Profile,
    /// Set the onboarding lifestyle profile
    SetProfile {
        /// Profile as inline JSON or a path to a JSON file
        #[arg(short, long)]
        profile: String,
    },
    /// Recompute streak and credits from logged activity
    Reconcile,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    tracing::debug!("Starting EcoTrack v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(
        SqliteStore::open(&config.database_path())
            .with_context(|| format!("opening {}", config.database_path().display()))?,
    );
    let generator = Arc::new(GenerativeClient::new(&config.generator)?);
    let engine = EcoEngine::new(store, generator, &config);
    engine.seed_catalog().await?;

    if let Commands::Catalog = cli.command {
        let catalog = ecotrack::challenges::default_challenges();
        return print_json(&catalog);
    }

    let Some(user) = cli.user else {
        bail!("--user <UUID> is required for this command");
    };

    match cli.command {
        Commands::Submit { answers, date } => {
            let answers: DailyAnswers = read_json(&answers).context("parsing answers")?;
            let date = date.unwrap_or_else(EcoEngine::<SqliteStore, GenerativeClient>::today);
            let result = engine.submit_daily_activity(user, date, answers).await?;
            print_json(&result)
        }
        Commands::Challenges { refresh } => {
            let challenges = if refresh {
                engine.refresh_challenges(user).await
            } else {
                engine.get_personalized_challenges(user).await
            };
            print_json(&challenges)
        }
        Commands::Join { challenge_id } => {
            let enrollment = engine.join_challenge(user, &challenge_id).await?;
            print_json(&enrollment)
        }
        Commands::Leave { challenge_id } => {
            engine.leave_challenge(user, &challenge_id).await?;
            print_json(&serde_json::json!({ "left": challenge_id }))
        }
        Commands::Active => print_json(&engine.active_enrollments(user).await?),
        Commands::Profile => print_json(&engine.gamification_profile(user).await?),
        Commands::SetProfile { profile } => {
            let profile: LifestyleProfile = read_json(&profile).context("parsing profile")?;
            engine.set_lifestyle_profile(user, &profile).await?;
            print_json(&profile)
        }
        Commands::Reconcile => print_json(&engine.reconcile_user(user).await?),
        Commands::Catalog => Ok(()),
    }
}

/// Parse inline JSON, or read it from a file when the argument is a path.
fn read_json<T: serde::de::DeserializeOwned>(arg: &str) -> Result<T> {
    let trimmed = arg.trim_start();
    let content = if trimmed.starts_with('{') {
        arg.to_string()
    } else {
        std::fs::read_to_string(arg).with_context(|| format!("reading {}", arg))?
    };
    Ok(serde_json::from_str(&content)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
