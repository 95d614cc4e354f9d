//! The editable draft and the session that owns it.

use crate::error::DraftError;
use crate::extract::Category;
use crate::pipeline::GenerationReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const URL_FEATURE_FILE: &str = "generated_url_scenarios.feature";
pub const STORY_FEATURE_FILE: &str = "generated_story_scenarios.feature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    UserStory,
    Url,
}

/// Generated scenario text as the reviewer is editing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub text: String,
    pub source_kind: SourceKind,
    pub source_value: String,
    /// Element counts from the run that produced the draft
    pub stats: BTreeMap<Category, usize>,
    pub scenario_counts: BTreeMap<Category, usize>,
    /// True once the reviewer has explicitly saved an edit
    pub saved: bool,
    pub created_at: DateTime<Utc>,
    pub saved_at: Option<DateTime<Utc>>,
}

impl Draft {
    pub fn from_report(report: &GenerationReport) -> Self {
        Self {
            text: report.combined_scenario_text.clone(),
            source_kind: SourceKind::Url,
            source_value: report.url.clone(),
            stats: report.stats.clone(),
            scenario_counts: report.scenario_counts.clone(),
            saved: false,
            created_at: Utc::now(),
            saved_at: None,
        }
    }

    pub fn from_story(story: &str, text: String) -> Self {
        Self {
            text,
            source_kind: SourceKind::UserStory,
            source_value: story.to_string(),
            stats: BTreeMap::new(),
            scenario_counts: BTreeMap::new(),
            saved: false,
            created_at: Utc::now(),
            saved_at: None,
        }
    }

    /// Replace the text with the reviewer's edit.
    pub fn save(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.saved = true;
        self.saved_at = Some(Utc::now());
        log::info!("💾 Draft saved ({} bytes)", self.text.len());
    }

    /// Whether the editor's current content differs from the stored text.
    pub fn has_unsaved_changes(&self, candidate: &str) -> bool {
        self.text != candidate
    }

    /// Export exactly the current text as a `.feature` document.
    pub fn export(&self) -> FeatureDocument {
        let file_name = match self.source_kind {
            SourceKind::Url => URL_FEATURE_FILE,
            SourceKind::UserStory => STORY_FEATURE_FILE,
        };
        FeatureDocument {
            file_name: file_name.to_string(),
            content: self.text.clone(),
        }
    }
}

/// A downloadable feature file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDocument {
    pub file_name: String,
    pub content: String,
}

impl FeatureDocument {
    /// Write into `dir` under `file_name`, returning the full path.
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf, DraftError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, self.content.as_bytes()).await?;
        log::info!("✓ Wrote {}", path.display());
        Ok(path)
    }

    /// Write to an explicit path.
    pub async fn write_to_path(&self, path: &Path) -> Result<(), DraftError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.content.as_bytes()).await?;
        log::info!("✓ Wrote {}", path.display());
        Ok(())
    }
}

/// Caller-owned session state: at most one draft at a time.
#[derive(Debug, Default)]
pub struct Session {
    draft: Option<Draft>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new draft, superseding any previous one.
    pub fn install(&mut self, draft: Draft) {
        if self.draft.is_some() {
            log::debug!("Replacing previous draft");
        }
        self.draft = Some(draft);
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Result<&mut Draft, DraftError> {
        self.draft.as_mut().ok_or(DraftError::NoDraft)
    }

    pub fn export(&self) -> Result<FeatureDocument, DraftError> {
        self.draft
            .as_ref()
            .map(Draft::export)
            .ok_or(DraftError::NoDraft)
    }
}
