//! The user-story path: one prompt, one call, no extraction.

use super::backend::GenerativeBackend;
use super::generator::complete_with_timeout;
use super::prompts::build_story_prompt;
use crate::error::GenerationError;
use std::time::Duration;

/// Generate a feature document from a free-text user story.
pub async fn generate_from_story(
    backend: &dyn GenerativeBackend,
    story: &str,
    timeout: Duration,
) -> Result<String, GenerationError> {
    if story.trim().is_empty() {
        return Err(GenerationError::Malformed("empty user story".to_string()));
    }

    log::info!("🤖 Generating scenarios from user story via {}", backend.name());
    let prompt = build_story_prompt(story);
    let text = complete_with_timeout(backend, &prompt, timeout).await?;
    log::info!("✓ User story generation complete");
    Ok(text)
}
