mod template;

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use pitchfork_client::config::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use pitchfork_client::{NewsIndex, ReqwestFetcher, ReviewExtractor, ReviewIndex, ReviewQuery, SiteConfig};
use pitchfork_core::aggregate::DEFAULT_CHANNEL_CAPACITY;
use pitchfork_core::{Aggregator, AggregatorConfig, Review};

use crate::template::{DEFAULT_REVIEW_TEMPLATE, NEWS_TEMPLATE, Template, TemplateError};

#[derive(Parser)]
#[command(
    name = "pitchfork",
    version,
    about = "A Pitchfork.com reader in your shell",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(flatten)]
    site: SiteArgs,

    #[command(flatten)]
    reviews: ReviewArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show recent album reviews (the default)
    Reviews(ReviewArgs),

    /// Search album reviews
    Search {
        /// Free-text search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the latest news headlines
    News {
        /// Number of news articles to return (max of 10)
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
}

#[derive(Args, Clone)]
struct SiteArgs {
    /// Base URL of the review site
    #[arg(long, env = "PITCHFORK_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Per-request timeout in seconds
    #[arg(
        long,
        env = "PITCHFORK_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    timeout: u64,

    /// Buffer size of the channel review results are collected through
    #[arg(
        long,
        env = "PITCHFORK_CHANNEL_CAPACITY",
        default_value_t = DEFAULT_CHANNEL_CAPACITY as u64,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    channel_capacity: u64,

    /// User-Agent header sent with every request
    #[arg(long, env = "PITCHFORK_USER_AGENT", default_value = DEFAULT_USER_AGENT, global = true)]
    user_agent: String,
}

#[derive(Args, Clone)]
struct ReviewArgs {
    /// Days since the last set of reviews to return (0-4)
    #[arg(short, long, default_value_t = 0)]
    days: u32,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Minimum score for reviews to return (0-10)
    #[arg(short = 's', long = "min-score", default_value_t = 0.0, value_parser = parse_min_score)]
    min_score: f64,

    /// A template for how you want the reviews displayed (fields as {{.Field}})
    #[arg(short, long, default_value = DEFAULT_REVIEW_TEMPLATE)]
    template: String,
}

fn parse_min_score(raw: &str) -> Result<f64, String> {
    let score: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a valid score"))?;
    if !(0.0..=10.0).contains(&score) {
        return Err(format!("score must be between 0 and 10, got {score}"));
    }
    Ok(score)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pitchfork=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let site = SiteConfig::new(&cli.site.base_url)?
        .with_timeout(Duration::from_secs(cli.site.timeout))
        .with_user_agent(cli.site.user_agent.as_str());
    let fetcher = ReqwestFetcher::new(site).context("Failed to create HTTP client")?;
    let config = AggregatorConfig::new(cli.site.channel_capacity as usize);

    match cli.command.unwrap_or(Commands::Reviews(cli.reviews)) {
        Commands::Reviews(args) => {
            let query = ReviewQuery::days_ago(args.days)?;
            cmd_reviews(fetcher, config, query, &args.output).await?;
        }
        Commands::Search { query, output } => {
            let query = ReviewQuery::search(&query.join(" "))?;
            cmd_reviews(fetcher, config, query, &output).await?;
        }
        Commands::News { count } => {
            cmd_news(fetcher, count).await?;
        }
    }

    Ok(())
}

async fn cmd_reviews(
    fetcher: ReqwestFetcher,
    config: AggregatorConfig,
    query: ReviewQuery,
    output: &OutputArgs,
) -> Result<()> {
    let source = ReviewIndex::new(fetcher.clone(), query);
    let extractor = ReviewExtractor::new()?;
    let aggregator = Aggregator::with_config(fetcher, extractor, config);

    let outcome = aggregator.aggregate(&source).await;

    let template = Template::parse(&format!("{}\n", output.template));
    let shown: Vec<&Review> = filter_by_score(&outcome.records, output.min_score);
    let stdout = std::io::stdout();
    let failed = render_all(&mut stdout.lock(), &template, &shown)?;
    if failed > 0 {
        tracing::warn!(%failed, "Some reviews could not be rendered");
    }

    match outcome.error {
        Some(e) if e.is_fatal() => Err(e).context("Could not load reviews"),
        Some(e) => Err(e).context(format!(
            "Batch incomplete: showing {} of the reviews found",
            outcome.records.len()
        )),
        None => Ok(()),
    }
}

async fn cmd_news(fetcher: ReqwestFetcher, count: usize) -> Result<()> {
    let articles = NewsIndex::new(fetcher)
        .latest(count)
        .await
        .context("Could not load news")?;

    let template = Template::parse(&format!("{NEWS_TEMPLATE}\n"));
    let stdout = std::io::stdout();
    render_all(&mut stdout.lock(), &template, &articles)?;

    Ok(())
}

fn filter_by_score(reviews: &[Review], min_score: f64) -> Vec<&Review> {
    reviews.iter().filter(|r| r.score >= min_score).collect()
}

/// Render each item, reporting template failures per item on stderr.
///
/// Returns how many items failed to render.
fn render_all<W: Write, T: Serialize>(
    out: &mut W,
    template: &Result<Template, TemplateError>,
    items: &[T],
) -> std::io::Result<usize> {
    let mut failed = 0;

    for item in items {
        let rendered = template
            .as_ref()
            .map_err(|e| e.to_string())
            .and_then(|t| t.render(item).map_err(|e| e.to_string()));
        match rendered {
            Ok(text) => out.write_all(text.as_bytes())?,
            Err(e) => {
                failed += 1;
                eprintln!("There was an error with the template you passed: {e}");
            }
        }
    }

    out.flush()?;
    Ok(failed)
}
