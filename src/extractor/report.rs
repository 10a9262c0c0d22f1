use crate::error::{PotGatherError, Result};
use crate::extractor::coordinator::ExtractionOutcome;
use crate::scanner::{FileList, SourceSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub extraction_time: DateTime<Utc>,
    pub sources: SourceSnapshot,
    pub summary: ExtractionSummary,
    pub backends: Vec<BackendSummary>,
    pub unmatched_files: Vec<String>,
    pub template: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub base_path: String,
    pub search_paths: Vec<String>,
    pub excluded_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub files_collected: usize,
    pub files_claimed: usize,
    pub files_unmatched: usize,
    pub fragments: usize,
    pub extraction_duration: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSummary {
    pub id: String,
    pub files: usize,
    pub produced_fragment: bool,
}

impl From<&SourceSpec> for SourceSnapshot {
    fn from(spec: &SourceSpec) -> Self {
        Self {
            base_path: spec.base_path.clone(),
            search_paths: spec.search_paths.clone(),
            excluded_paths: spec
                .excluded_paths
                .patterns()
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
        }
    }
}

impl ExtractionReport {
    pub fn new(
        spec: &SourceSpec,
        collected: &FileList,
        outcome: &ExtractionOutcome,
        elapsed: Duration,
    ) -> Self {
        let backends: Vec<BackendSummary> = outcome
            .results
            .iter()
            .map(|result| BackendSummary {
                id: result.backend_id.clone(),
                files: result.claimed.len(),
                produced_fragment: result.fragment.is_some(),
            })
            .collect();

        let summary = ExtractionSummary {
            files_collected: collected.len(),
            files_claimed: backends.iter().map(|b| b.files).sum(),
            files_unmatched: outcome.unmatched.len(),
            fragments: backends.iter().filter(|b| b.produced_fragment).count(),
            extraction_duration: elapsed,
        };

        Self {
            extraction_time: Utc::now(),
            sources: SourceSnapshot::from(spec),
            summary,
            backends,
            unmatched_files: outcome.unmatched.iter().cloned().collect(),
            template: outcome.template.clone(),
        }
    }

    /// Records where the template finally landed.
    pub fn with_template<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.template = Some(path.into());
        self
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_content =
            serde_json::to_string_pretty(self).map_err(|e| PotGatherError::Config {
                message: format!("Failed to serialize report to JSON: {}", e),
            })?;

        fs::write(path.as_ref(), json_content)?;
        Ok(())
    }
}

/// `po/messages.pot` reports to `po/messages.report.json`.
pub fn report_path_for(template: &Path) -> PathBuf {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "potgather".to_string());
    template.with_file_name(format!("{}.report.json", stem))
}
