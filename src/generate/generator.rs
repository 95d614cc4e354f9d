//! Per-category scenario generation with failure isolation.

use super::backend::GenerativeBackend;
use super::prompts::build_category_prompt;
use crate::error::GenerationError;
use crate::extract::{Category, UiElement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Success,
    EmptyInputSkipped,
    GenerationFailed,
}

/// Outcome of generating scenarios for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category: Category,
    /// Cleaned Gherkin text; empty unless `status` is `Success`
    pub scenario_text: String,
    /// Number of elements that fed the prompt
    pub element_count: usize,
    pub scenario_count: usize,
    pub status: CategoryStatus,
    /// Failure reason when `status` is `GenerationFailed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryResult {
    fn skipped(category: Category, element_count: usize) -> Self {
        Self {
            category,
            scenario_text: String::new(),
            element_count,
            scenario_count: 0,
            status: CategoryStatus::EmptyInputSkipped,
            error: None,
        }
    }

    fn failed(category: Category, element_count: usize, error: &GenerationError) -> Self {
        Self {
            category,
            scenario_text: String::new(),
            element_count,
            scenario_count: 0,
            status: CategoryStatus::GenerationFailed,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CategoryStatus::Success
    }
}

/// Turns one category's elements into Gherkin via a generative backend.
pub struct CategoryGenerator {
    backend: Arc<dyn GenerativeBackend>,
    timeout: Duration,
}

impl CategoryGenerator {
    pub fn new(backend: Arc<dyn GenerativeBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Generate scenarios for `category`.
    ///
    /// Disabled categories and empty element lists return `EmptyInputSkipped`
    /// without touching the backend. Backend failures are captured in the
    /// result rather than returned.
    pub async fn generate(
        &self,
        category: Category,
        elements: &[UiElement],
        enabled: &BTreeSet<Category>,
        url: &str,
    ) -> CategoryResult {
        if !enabled.contains(&category) || elements.is_empty() {
            log::debug!("Skipping {} ({} elements)", category, elements.len());
            return CategoryResult::skipped(category, elements.len());
        }

        log::info!(
            "🤖 Generating {} scenarios from {} elements via {}",
            category,
            elements.len(),
            self.backend.name()
        );

        let prompt = build_category_prompt(category, elements, url);
        match self.call(&prompt).await {
            Ok(text) => {
                let scenario_count = count_scenarios(&text);
                log::info!("✓ {}: {} scenarios", category, scenario_count);
                CategoryResult {
                    category,
                    scenario_text: text,
                    element_count: elements.len(),
                    scenario_count,
                    status: CategoryStatus::Success,
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("❌ Generation failed for {}: {}", category, e);
                CategoryResult::failed(category, elements.len(), &e)
            }
        }
    }

    /// One bounded backend call, cleaned and validated.
    async fn call(&self, prompt: &str) -> Result<String, GenerationError> {
        complete_with_timeout(self.backend.as_ref(), prompt, self.timeout).await
    }
}

pub(crate) async fn complete_with_timeout(
    backend: &dyn GenerativeBackend,
    prompt: &str,
    timeout: Duration,
) -> Result<String, GenerationError> {
    let response = tokio::time::timeout(timeout, backend.complete(prompt))
        .await
        .map_err(|_| GenerationError::Timeout {
            secs: timeout.as_secs(),
        })??;
    validate_response(&response)
}

/// Clean a raw reply and make sure it holds at least one scenario.
pub fn validate_response(response: &str) -> Result<String, GenerationError> {
    let cleaned = clean_response(response);
    if cleaned.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    if count_scenarios(&cleaned) == 0 {
        return Err(GenerationError::Malformed("no Scenario found".to_string()));
    }
    Ok(cleaned)
}

/// Strip surrounding whitespace and Markdown code fences (```` ``` ````,
/// ```` ```gherkin ````, ```` ```feature ````).
pub fn clean_response(response: &str) -> String {
    let trimmed = response.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the language tag on the opening fence line
    let body = match rest.split_once('\n') {
        Some((tag, body)) if !tag.trim().contains(' ') => body,
        _ => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

/// Count lines that open a scenario.
pub fn count_scenarios(text: &str) -> usize {
    text.lines()
        .map(str::trim_start)
        .filter(|line| line.starts_with("Scenario:") || line.starts_with("Scenario Outline:"))
        .count()
}
