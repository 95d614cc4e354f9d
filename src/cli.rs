//! Command-line interface: argument parsing and the command runners.

use crate::config::{load_config, AppConfig};
use crate::draft::{Draft, FeatureDocument, STORY_FEATURE_FILE, URL_FEATURE_FILE};
use crate::extract::Category;
use crate::fetch::ChromeFetcher;
use crate::generate::{backend, generate_from_story, GenerativeBackend};
use crate::pipeline::{GenerationReport, Pipeline};
use crate::server::{self, AppState};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "gherkin-studio",
    version,
    about = "Generate Gherkin scenarios from a web page or a user story"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: gherkin-studio.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a page and generate scenarios for its UI elements
    Url {
        /// Page to analyze
        #[arg(long)]
        url: String,

        /// Comma-separated categories (default: from config)
        #[arg(long, value_delimiter = ',')]
        categories: Option<Vec<Category>>,

        /// Maximum elements extracted per category
        #[arg(long)]
        max_elements: Option<usize>,

        /// Where to write the feature file
        #[arg(short, long, default_value = URL_FEATURE_FILE)]
        output: PathBuf,
    },

    /// Generate scenarios from a free-text user story
    Story {
        /// The user story text
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,

        /// Read the user story from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Where to write the feature file
        #[arg(short, long, default_value = STORY_FEATURE_FILE)]
        output: PathBuf,
    },

    /// Serve the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 9670)]
        port: u16,
    },
}

/// Log filter implied by `-v` flags when `RUST_LOG` is unset.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Url {
            url,
            categories,
            max_elements,
            output,
        } => {
            if let Some(max) = max_elements {
                config.scenario_generation.max_elements_per_type = max;
            }
            run_url(&config, &url, categories, &output).await
        }
        Commands::Story { text, file, output } => {
            let story = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("Provide --text or --file"),
            };
            run_story(&config, &story, &output).await
        }
        Commands::Serve { port } => serve(&config, port).await,
    }
}

fn build_pipeline(config: &AppConfig) -> crate::Result<(Pipeline, Arc<dyn GenerativeBackend>)> {
    let backend = backend::from_config(&config.generation)?;
    let fetcher = Arc::new(ChromeFetcher::from_config(&config.fetch));
    Ok((Pipeline::new(config, fetcher, backend.clone()), backend))
}

/// Run the pipeline once for `url`.
async fn url_report(
    config: &AppConfig,
    url: &str,
    categories: Option<Vec<Category>>,
) -> crate::Result<GenerationReport> {
    let (pipeline, _) = build_pipeline(config)?;
    let enabled: BTreeSet<Category> = match categories {
        Some(list) => list.into_iter().collect(),
        None => pipeline.default_categories(),
    };
    Ok(pipeline.run(url, &enabled).await?)
}

/// Generate a feature document from a user story.
async fn story_document(config: &AppConfig, story: &str) -> crate::Result<FeatureDocument> {
    let backend = backend::from_config(&config.generation)?;
    let text = generate_from_story(backend.as_ref(), story, config.generation.timeout()).await?;
    Ok(Draft::from_story(story, text).export())
}

async fn run_url(
    config: &AppConfig,
    url: &str,
    categories: Option<Vec<Category>>,
    output: &Path,
) -> Result<()> {
    let report = url_report(config, url, categories).await?;
    print_report(&report);

    if !report.has_scenarios() {
        anyhow::bail!("No scenario snippets were generated");
    }

    Draft::from_report(&report)
        .export()
        .write_to_path(output)
        .await?;
    println!("Wrote {}", output.display());
    Ok(())
}

async fn run_story(config: &AppConfig, story: &str, output: &Path) -> Result<()> {
    story_document(config, story)
        .await?
        .write_to_path(output)
        .await?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn print_report(report: &GenerationReport) {
    println!("Scenarios for {}", report.url);
    for (category, count) in &report.stats {
        let scenarios = report.scenario_counts.get(category).copied().unwrap_or(0);
        println!(
            "  {:<18} {:>4} elements {:>4} scenarios",
            category.display_name(),
            count,
            scenarios
        );
    }
    println!("  Total scenarios: {}", report.total_scenarios());
    for failure in &report.errors {
        println!("  ✗ {}: {}", failure.category.display_name(), failure.reason);
    }
}

async fn serve(config: &AppConfig, port: u16) -> Result<()> {
    let (pipeline, backend) = build_pipeline(config)?;
    let state = Arc::new(AppState::new(
        pipeline,
        backend,
        config.generation.timeout(),
    ));
    let routes = server::routes(state);

    // Bind manually to report "port in use" clearly
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Port {} is already in use or unavailable", port))?;

    log::info!("Listening on http://{}", addr);
    warp::serve(routes)
        .run_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
        .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_command_parses_categories() {
        let cli = Cli::try_parse_from([
            "gherkin-studio",
            "url",
            "--url",
            "https://example.com",
            "--categories",
            "headings,links,images-and-logos",
            "--max-elements",
            "20",
        ])
        .unwrap();

        match cli.command {
            Commands::Url {
                categories,
                max_elements,
                output,
                ..
            } => {
                assert_eq!(
                    categories.unwrap(),
                    vec![Category::Headings, Category::Links, Category::ImagesAndLogos]
                );
                assert_eq!(max_elements, Some(20));
                assert_eq!(output, PathBuf::from(URL_FEATURE_FILE));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result = Cli::try_parse_from([
            "gherkin-studio",
            "url",
            "--url",
            "https://example.com",
            "--categories",
            "headings,widgets",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_story_requires_input() {
        assert!(Cli::try_parse_from(["gherkin-studio", "story"]).is_err());
        let cli = Cli::try_parse_from(["gherkin-studio", "-v", "story", "--text", "As a user"])
            .unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Commands::Story { .. }));
    }

    #[test]
    fn test_serve_default_port() {
        let cli = Cli::try_parse_from(["gherkin-studio", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { port: 9670 }));
    }

    #[tokio::test]
    async fn test_invalid_url_surfaces_as_fetch_error() {
        let err = url_report(&AppConfig::default(), "example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Fetch(crate::FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_story_surfaces_as_generation_error() {
        let err = story_document(&AppConfig::default(), "  ").await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Generation(crate::GenerationError::Malformed(_))
        ));
        assert_eq!(err.to_string(), "malformed response: empty user story");
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), "info");
        assert_eq!(log_level(2), "trace");
    }
}
