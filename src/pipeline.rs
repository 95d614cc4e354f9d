//! The URL-to-scenario pipeline.
//!
//! `Fetching → Extracting → Generating → Aggregating → Done`. Only the fetch
//! stage can fail the run; every later problem is attributed to a category
//! and reported next to whatever succeeded.

use crate::config::{AppConfig, ScenarioGenerationConfig};
use crate::error::FetchError;
use crate::extract::{self, CategorizedInventory, Category};
use crate::fetch::{validate_url, PageFetcher};
use crate::generate::{CategoryGenerator, CategoryResult, CategoryStatus, GenerativeBackend};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Extracting,
    Generating,
    Aggregating,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Extracting => "extracting",
            Stage::Generating => "generating",
            Stage::Aggregating => "aggregating",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A category whose generation failed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFailure {
    pub category: Category,
    pub reason: String,
}

/// The final artifact of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub url: String,

    /// Feature document built from the successful categories, in category
    /// order. Empty when no category succeeded.
    pub combined_scenario_text: String,

    /// Extracted element count per category (non-zero, enabled only)
    pub stats: BTreeMap<Category, usize>,

    /// Generated scenario count per successful category
    pub scenario_counts: BTreeMap<Category, usize>,

    pub errors: Vec<CategoryFailure>,

    /// SHA-256 of the fetched HTML
    pub page_hash: String,

    pub generated_at: DateTime<Utc>,
}

impl GenerationReport {
    pub fn total_scenarios(&self) -> usize {
        self.scenario_counts.values().sum()
    }

    pub fn has_scenarios(&self) -> bool {
        !self.combined_scenario_text.is_empty()
    }
}

pub struct Pipeline {
    config: ScenarioGenerationConfig,
    fetcher: Arc<dyn PageFetcher>,
    generator: CategoryGenerator,
}

impl Pipeline {
    pub fn new(
        config: &AppConfig,
        fetcher: Arc<dyn PageFetcher>,
        backend: Arc<dyn GenerativeBackend>,
    ) -> Self {
        Self {
            config: config.scenario_generation.clone(),
            fetcher,
            generator: CategoryGenerator::new(backend, config.generation.timeout()),
        }
    }

    /// Categories used when the caller does not pick any.
    pub fn default_categories(&self) -> BTreeSet<Category> {
        self.config.enabled_categories()
    }

    /// Run with the configured default category selection.
    pub async fn run_default(&self, url: &str) -> Result<GenerationReport, FetchError> {
        let enabled = self.default_categories();
        self.run(url, &enabled).await
    }

    pub async fn run(
        &self,
        url: &str,
        enabled: &BTreeSet<Category>,
    ) -> Result<GenerationReport, FetchError> {
        log::info!("[{}] {}", Stage::Fetching, url);
        let url = validate_url(url)?;
        let html = self.fetcher.fetch(&url).await.map_err(|e| {
            log::error!("❌ Fetch failed for {}: {}", url, e);
            e
        })?;

        log::info!("[{}] {} ({} KB)", Stage::Extracting, url, html.len() / 1024);
        let inventory = extract::extract_with_base(
            &html,
            self.config.max_elements_per_type,
            Some(&url),
        );

        log::info!(
            "[{}] {} ({} categories enabled)",
            Stage::Generating,
            url,
            enabled.len()
        );
        let results = self.generate_all(&inventory, enabled, url.as_str()).await;

        log::info!("[{}] {}", Stage::Aggregating, url);
        let report = aggregate(url.as_str(), &html, &results);

        log::info!(
            "[{}] {}: {} scenarios, {} failed categories",
            Stage::Done,
            url,
            report.total_scenarios(),
            report.errors.len()
        );
        Ok(report)
    }

    async fn generate_all(
        &self,
        inventory: &CategorizedInventory,
        enabled: &BTreeSet<Category>,
        url: &str,
    ) -> Vec<CategoryResult> {
        let selected: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| enabled.contains(c))
            .collect();

        let mut results: Vec<CategoryResult> = stream::iter(selected)
            .map(|category| {
                self.generator
                    .generate(category, inventory.get(category), enabled, url)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        results.sort_by_key(|r| r.category);
        results
    }
}

/// Merge per-category results into a report. `results` must already be in
/// category order.
fn aggregate(url: &str, html: &str, results: &[CategoryResult]) -> GenerationReport {
    let stats = results
        .iter()
        .filter(|r| r.element_count > 0)
        .map(|r| (r.category, r.element_count))
        .collect();

    let scenario_counts = results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| (r.category, r.scenario_count))
        .collect();

    let errors = results
        .iter()
        .filter(|r| r.status == CategoryStatus::GenerationFailed)
        .map(|r| CategoryFailure {
            category: r.category,
            reason: r.error.clone().unwrap_or_default(),
        })
        .collect();

    GenerationReport {
        url: url.to_string(),
        combined_scenario_text: assemble_feature(url, results),
        stats,
        scenario_counts,
        errors,
        page_hash: compute_string_hash(html),
        generated_at: Utc::now(),
    }
}

/// Build the feature document from the successful categories.
pub fn assemble_feature(url: &str, results: &[CategoryResult]) -> String {
    let blocks: Vec<String> = results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| format!("# --- Scenarios for {} ---\n{}", r.category, r.scenario_text))
        .collect();

    if blocks.is_empty() {
        return String::new();
    }

    format!(
        "Feature: Verification of Elements on {url}\n\n  Background:\n    Given the user navigates to \"{url}\"\n\n{}",
        blocks.join("\n\n"),
        url = url
    )
}

fn compute_string_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(category: Category, status: CategoryStatus, text: &str, count: usize) -> CategoryResult {
        CategoryResult {
            category,
            scenario_text: text.to_string(),
            element_count: count,
            scenario_count: if status == CategoryStatus::Success { 1 } else { 0 },
            status,
            error: (status == CategoryStatus::GenerationFailed).then(|| "boom".to_string()),
        }
    }

    #[test]
    fn test_assemble_feature_layout() {
        let results = vec![
            result(Category::Headings, CategoryStatus::Success, "Scenario: h", 1),
            result(Category::Links, CategoryStatus::GenerationFailed, "", 2),
            result(Category::Forms, CategoryStatus::Success, "Scenario: f", 1),
        ];
        let text = assemble_feature("https://x.test/login", &results);
        assert_eq!(
            text,
            "Feature: Verification of Elements on https://x.test/login\n\n  Background:\n    Given the user navigates to \"https://x.test/login\"\n\n# --- Scenarios for headings ---\nScenario: h\n\n# --- Scenarios for forms ---\nScenario: f"
        );
    }

    #[test]
    fn test_assemble_feature_empty_when_nothing_succeeded() {
        let results = vec![result(Category::Links, CategoryStatus::GenerationFailed, "", 2)];
        assert_eq!(assemble_feature("https://x.test", &results), "");
    }

    #[test]
    fn test_aggregate_stats_follow_extraction() {
        let results = vec![
            result(Category::Headings, CategoryStatus::Success, "Scenario: h", 1),
            result(Category::Paragraphs, CategoryStatus::EmptyInputSkipped, "", 0),
            result(Category::Links, CategoryStatus::GenerationFailed, "", 2),
        ];
        let report = aggregate("https://x.test", "<html></html>", &results);

        assert_eq!(report.stats.len(), 2);
        assert_eq!(report.stats[&Category::Links], 2);
        assert_eq!(report.scenario_counts.len(), 1);
        assert_eq!(report.total_scenarios(), 1);
        assert_eq!(
            report.errors,
            vec![CategoryFailure {
                category: Category::Links,
                reason: "boom".into()
            }]
        );
        assert_eq!(report.page_hash.len(), 64);
    }

    #[test]
    fn test_report_serializes_categories_as_names() {
        let results = vec![result(
            Category::ImagesAndLogos,
            CategoryStatus::Success,
            "Scenario: i",
            3,
        )];
        let report = aggregate("https://x.test", "", &results);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["images_and_logos"], 3);
        assert_eq!(json["scenario_counts"]["images_and_logos"], 1);
    }
}
