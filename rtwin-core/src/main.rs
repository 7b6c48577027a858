//! rtwin - ResearchTwin command-line front-end
//!
//! **Usage:**
//! ```bash
//! rtwin score <bundle.json>
//! rtwin profile --name "Martin Frasch" --orcid 0000-0003-3159-6321 [--github mfrasch]
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rtwin_common::{Cache, FileCache, MemoryCache, RateLimiter, TomlConfig};
use rtwin_core::sources::figshare::{self, FigshareClient};
use rtwin_core::sources::github::GithubClient;
use rtwin_core::sources::nominatim::NominatimGeocoder;
use rtwin_core::sources::openalex::OpenAlexClient;
use rtwin_core::sources::orcid::OrcidClient;
use rtwin_core::sources::semantic_scholar::SemanticScholarClient;
use rtwin_core::sources::snapshot::SnapshotBibliometrics;
use rtwin_core::sources::{AffiliationSource, BibliometricSource, HttpJsonClient};
use rtwin_core::{
    score_bundle, AffiliationMerger, PersonIdentity, PipelineSettings, ProfilePipeline,
    ProfileSources, ScoreBundle, SourceName,
};
use tracing::info;

/// Decimal places in printed scores
const OUTPUT_PLACES: u32 = 2;

#[derive(Parser, Debug)]
#[command(name = "rtwin")]
#[command(about = "Resolve, merge and score a researcher's scholarly footprint")]
#[command(version)]
struct Args {
    /// Config file (overrides RTWIN_CONFIG and the default location)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score an already-fetched bundle offline
    Score {
        /// JSON bundle with artifacts, repositories and bibliometrics
        bundle: PathBuf,
    },
    /// Fetch, merge and score a live profile
    Profile {
        /// Display name
        #[arg(long)]
        name: String,

        #[arg(long)]
        orcid: Option<String>,

        /// Semantic Scholar author id (resolved from the ORCID when absent)
        #[arg(long)]
        s2: Option<String>,

        /// GitHub username
        #[arg(long)]
        github: Option<String>,

        /// Figshare search name (defaults to the display name)
        #[arg(long)]
        figshare: Option<String>,

        /// Pre-fetched scholar-profile record (JSON)
        #[arg(long, value_name = "FILE")]
        scholar: Option<PathBuf>,
    },
}

fn init_tracing(config: &TomlConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn open_cache(config: &TomlConfig) -> Result<Arc<dyn Cache>> {
    match &config.cache.dir {
        Some(dir) => {
            let cache = FileCache::open(dir)
                .with_context(|| format!("Failed to open cache directory {}", dir.display()))?;
            info!("Cache: {}", cache.dir().display());
            Ok(Arc::new(cache))
        }
        None => {
            info!("Cache: in-memory");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_score(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bundle {}", path.display()))?;
    let bundle: ScoreBundle = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse bundle {}", path.display()))?;

    info!(
        artifacts = bundle.artifacts.len(),
        repositories = bundle.repositories.len(),
        "Scoring bundle"
    );
    let score = score_bundle(&bundle, &PipelineSettings::from_config(config));
    print_json(&score.rounded(OUTPUT_PLACES))
}

fn build_sources(config: &TomlConfig, scholar: Option<&Path>) -> Result<ProfileSources> {
    let cache = open_cache(config)?;
    let s2_limiter = Arc::new(RateLimiter::from_millis(
        config.rate_limits.semantic_scholar_interval_ms,
    ));
    let nominatim_limiter = Arc::new(RateLimiter::from_millis(config.rate_limits.nominatim_interval_ms));
    let merger = AffiliationMerger::new(config.merge.similarity_threshold);

    let orcid = Arc::new(OrcidClient::new(
        HttpJsonClient::new(SourceName::Orcid, &config.http, None)?,
        Arc::clone(&cache),
        config.cache.affiliation_ttl(),
        merger,
    ));
    let s2 = Arc::new(SemanticScholarClient::new(
        HttpJsonClient::new(SourceName::SemanticScholar, &config.http, Some(s2_limiter))?,
        Arc::clone(&cache),
        config.cache.default_ttl(),
        config.cache.affiliation_ttl(),
    ));
    let openalex = Arc::new(OpenAlexClient::new(
        HttpJsonClient::new(SourceName::OpenAlex, &config.http, None)?,
        Arc::clone(&cache),
        config.cache.affiliation_ttl(),
    ));
    let figshare = Arc::new(FigshareClient::new(
        HttpJsonClient::new(SourceName::Figshare, &config.http, None)?,
        Arc::clone(&cache),
        config.cache.default_ttl(),
        config.http.source_deadline().mul_f64(figshare::SEARCH_BUDGET_SHARE),
    ));
    let github = Arc::new(GithubClient::new(
        HttpJsonClient::new(SourceName::Github, &config.http, None)?,
        Arc::clone(&cache),
        config.cache.default_ttl(),
        config.github.token.clone(),
    ));
    let geocoder = Arc::new(NominatimGeocoder::new(
        HttpJsonClient::new(SourceName::Nominatim, &config.http, Some(nominatim_limiter))?,
        Arc::clone(&cache),
        config.cache.geocode_ttl(),
    ));

    let scholar = match scholar {
        Some(path) => {
            let snapshot = SnapshotBibliometrics::from_file(SourceName::GoogleScholar, path)
                .with_context(|| format!("Failed to load scholar record {}", path.display()))?;
            Some(Arc::new(snapshot) as Arc<dyn BibliometricSource>)
        }
        None => None,
    };
    // Richest source first
    let affiliations = vec![
        orcid.clone() as Arc<dyn AffiliationSource>,
        openalex as Arc<dyn AffiliationSource>,
        s2.clone() as Arc<dyn AffiliationSource>,
    ];

    Ok(ProfileSources {
        works: Some(orcid),
        author_index: Some(s2.clone()),
        bibliometrics: Some(s2),
        scholar,
        artifacts: Some(figshare),
        repositories: Some(github),
        affiliations,
        geocoder: Some(geocoder),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::resolve_and_load(args.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config);
    info!(
        "rtwin {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("RTWIN_GIT_COMMIT"),
        env!("RTWIN_BUILD_DATE")
    );

    match args.command {
        Command::Score { bundle } => run_score(&config, &bundle),
        Command::Profile {
            name,
            orcid,
            s2,
            github,
            figshare,
            scholar,
        } => {
            let mut person = PersonIdentity::new(name.trim());
            for (source, id) in [
                (SourceName::Orcid, orcid),
                (SourceName::SemanticScholar, s2),
                (SourceName::Github, github),
                (SourceName::Figshare, figshare),
            ] {
                if let Some(id) = id {
                    person = person.with_identifier(source, id);
                }
            }

            let sources = build_sources(&config, scholar.as_deref())?;
            let pipeline = ProfilePipeline::new(sources, PipelineSettings::from_config(&config));
            let mut profile = pipeline.build_profile(&person).await;
            profile.score = profile.score.rounded(OUTPUT_PLACES);
            print_json(&profile)
        }
    }
}
