pub mod analyze;
pub mod dimensions;
pub mod extract;
pub mod init;
pub mod report;
pub mod summarize;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use panelscore_core::catalog::Dimension;
use panelscore_core::service::{EvaluationService, HumanSubmission};
use panelscore_core::store::MemoryStore;
use panelscore_providers::PanelConfig;

/// Offline evaluation input: every rater's scores for one interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub interview_id: String,
    #[serde(default)]
    pub submissions: Vec<RaterSubmission>,
    #[serde(default)]
    pub overrides: Vec<LeadOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaterSubmission {
    pub rater_id: String,
    pub scores: BTreeMap<Dimension, i64>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub dimension_comments: BTreeMap<Dimension, String>,
}

impl RaterSubmission {
    fn to_submission(&self) -> HumanSubmission {
        HumanSubmission {
            scores: self.scores.clone(),
            comment: self.comment.clone(),
            dimension_comments: self.dimension_comments.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadOverride {
    pub lead_id: String,
    pub scores: BTreeMap<Dimension, i64>,
    pub reason: String,
}

impl Session {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse session: {}", path.display()))
    }

    /// Submit every rater, then apply the lead overrides in order.
    pub async fn replay(&self, service: &EvaluationService) -> Result<()> {
        for rater in &self.submissions {
            service
                .submit_human_score(&self.interview_id, &rater.rater_id, &rater.to_submission())
                .await
                .with_context(|| format!("submission from rater '{}' rejected", rater.rater_id))?;
        }
        for ov in &self.overrides {
            service
                .adjust_final_scores(&self.interview_id, &ov.lead_id, &ov.scores, &ov.reason)
                .await
                .with_context(|| format!("override by lead '{}' rejected", ov.lead_id))?;
        }
        Ok(())
    }
}

pub fn load_config(path: Option<PathBuf>) -> Result<PanelConfig> {
    panelscore_providers::load_config_from(path.as_deref())
}

/// A service over a fresh in-memory store.
pub fn build_service(config: &PanelConfig) -> Result<EvaluationService> {
    let service = EvaluationService::new(Arc::new(MemoryStore::new()), config.service_config())
        .context("invalid evaluation settings")?;
    Ok(service)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
