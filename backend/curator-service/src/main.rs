//! Curator Service - command-line entry point
//!
//! Reads a JSON array of digests, ranks them for the reader profile and
//! prints the ranked list as JSON on stdout. Logs go to stderr.
//!
//! # Usage
//! ```text
//! curator-service --digests digests.json [--profile profile.json] [--keep 25]
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use curator_service::{Config, CuratorAgent, DigestCandidate, RankedDigestList, ReaderProfile};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "curator-service", version, about = "Rank news digests for a reader profile")]
struct Args {
    /// JSON file holding an array of digests
    #[arg(long)]
    digests: PathBuf,

    /// JSON file holding the reader profile (built-in profile when omitted)
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Override the pre-rank shortlist size
    #[arg(long)]
    keep: Option<usize>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "curator_service=info,info".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file {}", what, path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {} file {}", what, path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(keep) = args.keep {
        config.pre_rank_keep = keep;
    }

    let profile = match &args.profile {
        Some(path) => read_json::<ReaderProfile>(path, "profile")?,
        None => ReaderProfile::default(),
    };
    let digests: Vec<DigestCandidate> = read_json(&args.digests, "digests")?;

    info!(
        digests = digests.len(),
        reader = %profile.name,
        provider = %config.llm_provider,
        "Starting curator run"
    );

    let agent = CuratorAgent::from_config(&config, profile)
        .context("Failed to initialize curator agent")?;
    let articles = agent
        .rank_digests(&digests)
        .await
        .context("Ranking failed")?;

    let output = serde_json::to_string_pretty(&RankedDigestList::from(articles))?;
    println!("{}", output);

    Ok(())
}
