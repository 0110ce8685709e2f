//! Operation facade used by presentation and authorization layers.
//!
//! Writes to one interview are serialized by a per-interview async lock held
//! across the whole read-modify-write of the rater set. Summary writes are
//! additionally revision-checked by the store, so a writer in another process
//! sharing the same store causes a [`EvalError::ConcurrencyConflict`] that is
//! retried here a bounded number of times.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::catalog::{Dimension, WeightTable};
use crate::error::{EvalError, EvalResult, ExtractionFailure, ProviderError};
use crate::extract::{self, ExtractionResult};
use crate::record::{RaterKind, ScoreRecord};
use crate::report::{BlendWeights, CompositeReport, HumanInput, ReportBuilder};
use crate::statistics::ConsistencyThresholds;
use crate::summary::{Aggregator, Summary};
use crate::traits::{CompletionClient, CompletionRequest, ScoreStore};

/// Tunables for [`EvaluationService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub thresholds: ConsistencyThresholds,
    pub blend: BlendWeights,
    pub weights: WeightTable,
    /// Seed for suggestion-pool picks. `None` seeds from the OS.
    pub suggestion_seed: Option<u64>,
    /// Extra attempts after a summary write conflict.
    pub max_conflict_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            thresholds: ConsistencyThresholds::default(),
            blend: BlendWeights::default(),
            weights: WeightTable::default(),
            suggestion_seed: None,
            max_conflict_retries: 3,
        }
    }
}

/// One human rater's submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HumanSubmission {
    pub scores: BTreeMap<Dimension, i64>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub dimension_comments: BTreeMap<Dimension, String>,
}

impl HumanSubmission {
    /// Builds an unsubmitted record, validating every score.
    pub fn to_record(&self, interview_id: &str, rater_id: &str) -> EvalResult<ScoreRecord> {
        let mut record = ScoreRecord::human(interview_id, rater_id, &self.scores)?;
        for (dimension, comment) in &self.dimension_comments {
            record.set_dimension_comment(*dimension, comment.clone())?;
        }
        record.set_comment(self.comment.clone())?;
        Ok(record)
    }
}

pub struct EvaluationService {
    store: Arc<dyn ScoreStore>,
    aggregator: Aggregator,
    reports: ReportBuilder,
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    rng: Mutex<StdRng>,
    max_conflict_retries: u32,
}

impl EvaluationService {
    pub fn new(store: Arc<dyn ScoreStore>, config: ServiceConfig) -> EvalResult<Self> {
        let aggregator = Aggregator::new(config.thresholds, config.weights.clone())?;
        let reports = ReportBuilder::new(config.blend, config.weights)?;
        let rng = match config.suggestion_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            store,
            aggregator,
            reports,
            locks: DashMap::new(),
            rng: Mutex::new(rng),
            max_conflict_retries: config.max_conflict_retries,
        })
    }

    fn lock_for(&self, interview_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .entry(interview_id.to_string())
            .or_default()
            .clone()
    }

    /// Record one human rater's scores and recompute the summary.
    ///
    /// Each rater may submit once per interview. If the record was stored but
    /// the recompute failed, resubmitting the same scores finishes the
    /// recompute instead of being rejected.
    #[instrument(skip(self, submission), fields(scored = submission.scores.len()))]
    pub async fn submit_human_score(
        &self,
        interview_id: &str,
        rater_id: &str,
        submission: &HumanSubmission,
    ) -> EvalResult<Summary> {
        require_id("interview id", interview_id)?;
        require_id("rater id", rater_id)?;
        let mut record = submission.to_record(interview_id, rater_id)?;
        record.submit();

        let lock = self.lock_for(interview_id);
        let _guard = lock.lock().await;

        let existing = self.store.records_for(interview_id).await?;
        if let Some(prior) = existing
            .iter()
            .find(|r| r.kind == RaterKind::Human && r.rater_id == rater_id)
        {
            let summarized = self
                .store
                .find_summary(interview_id)
                .await?
                .is_some_and(|s| s.rater_ids.iter().any(|id| id == rater_id));
            if summarized || !same_submission(prior, &record) {
                return Err(EvalError::Validation(format!(
                    "rater {rater_id} has already scored interview {interview_id}"
                )));
            }
            tracing::info!("resuming summary for a stored score");
            return self.recompute_locked(interview_id).await;
        }
        self.store.save_record(record).await?;
        tracing::info!("human score recorded");

        self.recompute_locked(interview_id).await
    }

    /// Store the AI record produced by a successful extraction.
    #[instrument(skip(self, extraction), fields(ok = extraction.ok))]
    pub async fn submit_ai_extraction(
        &self,
        interview_id: &str,
        rater_id: &str,
        extraction: &ExtractionResult,
    ) -> EvalResult<ScoreRecord> {
        require_id("interview id", interview_id)?;
        if !extraction.ok {
            return Err(EvalError::Extraction(
                extraction
                    .failure
                    .clone()
                    .unwrap_or(ExtractionFailure::NoPayload),
            ));
        }
        if !extraction.has_scores() {
            // Holding the interview's single AI slot with no scores would
            // block every later analysis.
            return Err(EvalError::Extraction(ExtractionFailure::NoPayload));
        }
        let record = ScoreRecord::from_extraction(interview_id, rater_id, extraction)?;

        let lock = self.lock_for(interview_id);
        let _guard = lock.lock().await;

        let existing = self.store.records_for(interview_id).await?;
        ensure_no_ai_record(interview_id, &existing)?;
        self.store.save_record(record.clone()).await?;
        tracing::info!(scored = record.scored_count(), "AI score recorded");

        if existing.iter().any(|r| r.kind == RaterKind::Human) {
            self.recompute_locked(interview_id).await?;
        }
        Ok(record)
    }

    /// Call the completion service, extract, and store the AI record.
    ///
    /// A timeout, a non-success status or an unusable body all come back as a
    /// recoverable [`EvalError::Extraction`] and nothing is stored.
    #[instrument(skip(self, client, request), fields(provider = client.name()))]
    pub async fn run_ai_analysis(
        &self,
        client: &dyn CompletionClient,
        interview_id: &str,
        request: &CompletionRequest,
    ) -> EvalResult<ScoreRecord> {
        require_id("interview id", interview_id)?;
        ensure_no_ai_record(interview_id, &self.store.records_for(interview_id).await?)?;

        let started = Instant::now();
        let response = match tokio::time::timeout(request.timeout, client.complete(request)).await
        {
            Ok(result) => result?,
            Err(_) => return Err(ProviderError::Timeout(request.timeout.as_millis() as u64).into()),
        };
        if !(200..300).contains(&response.status) {
            return Err(ProviderError::ApiError {
                status: response.status,
                message: truncate(&response.body, 200),
            }
            .into());
        }
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "completion received"
        );

        let extraction = extract::extract(&response.body);
        self.submit_ai_extraction(interview_id, client.name(), &extraction)
            .await
    }

    /// Recompute and store the summary from the current human records.
    #[instrument(skip(self))]
    pub async fn recompute_summary(&self, interview_id: &str) -> EvalResult<Summary> {
        let lock = self.lock_for(interview_id);
        let _guard = lock.lock().await;
        self.recompute_locked(interview_id).await
    }

    async fn recompute_locked(&self, interview_id: &str) -> EvalResult<Summary> {
        let mut attempt = 0;
        loop {
            // Summary before records: a record landing after this read is
            // guaranteed to bump the revision we check against.
            let previous = self.store.find_summary(interview_id).await?;
            let (humans, ai) = split_records(self.store.records_for(interview_id).await?);
            if humans.is_empty() {
                return Err(EvalError::NotFound(format!(
                    "no human scores for interview {interview_id}"
                )));
            }
            let summary =
                self.aggregator
                    .summarize(interview_id, &humans, ai.as_ref(), previous.as_ref())?;

            match self
                .store
                .save_summary(summary.clone(), previous.map(|p| p.revision))
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        raters = summary.rater_count,
                        total = summary.normalized_total,
                        grade = %summary.grade,
                        "summary recomputed"
                    );
                    return Ok(summary);
                }
                Err(EvalError::ConcurrencyConflict(msg)) if attempt < self.max_conflict_retries => {
                    attempt += 1;
                    tracing::warn!("summary write conflict, retrying ({attempt}): {msg}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Apply a lead-rater override through the serialized write path.
    #[instrument(skip(self, overrides, reason), fields(dimensions = overrides.len()))]
    pub async fn adjust_final_scores(
        &self,
        interview_id: &str,
        lead_id: &str,
        overrides: &BTreeMap<Dimension, i64>,
        reason: &str,
    ) -> EvalResult<Summary> {
        let lock = self.lock_for(interview_id);
        let _guard = lock.lock().await;

        let mut attempt = 0;
        loop {
            let stored = self.store.find_summary(interview_id).await?;
            let base = match &stored {
                Some(summary) => summary.clone(),
                None => {
                    let (humans, ai) =
                        split_records(self.store.records_for(interview_id).await?);
                    if humans.is_empty() {
                        return Err(EvalError::NotFound(format!(
                            "no human scores for interview {interview_id}"
                        )));
                    }
                    self.aggregator
                        .summarize(interview_id, &humans, ai.as_ref(), None)?
                }
            };
            let amended = self
                .aggregator
                .apply_override(&base, lead_id, overrides, reason)?;

            match self
                .store
                .save_summary(amended.clone(), stored.map(|s| s.revision))
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        total = amended.normalized_total,
                        notes = amended.notes.len(),
                        "final scores adjusted"
                    );
                    return Ok(amended);
                }
                Err(EvalError::ConcurrencyConflict(msg)) if attempt < self.max_conflict_retries => {
                    attempt += 1;
                    tracing::warn!("override write conflict, retrying ({attempt}): {msg}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The stored summary for an interview.
    pub async fn summary(&self, interview_id: &str) -> EvalResult<Summary> {
        self.store
            .find_summary(interview_id)
            .await?
            .ok_or_else(|| EvalError::NotFound(format!("no summary for interview {interview_id}")))
    }

    /// Blend the human summary and the AI record into a report.
    ///
    /// `weights` overrides the configured blend for this call only.
    #[instrument(skip(self))]
    pub async fn generate_report(
        &self,
        interview_id: &str,
        weights: Option<BlendWeights>,
    ) -> EvalResult<CompositeReport> {
        let builder = match weights {
            Some(w) => ReportBuilder::new(w, self.aggregator.weights().clone())?,
            None => self.reports.clone(),
        };

        let (humans, ai) = split_records(self.store.records_for(interview_id).await?);
        let stored = self.store.find_summary(interview_id).await?;
        let computed;
        let human = match (&stored, humans.as_slice()) {
            (Some(summary), _) if summary.rater_count > 0 => Some(HumanInput::Summary(summary)),
            (_, []) => None,
            (_, [single]) => Some(HumanInput::Record(single)),
            (_, many) => {
                computed = self
                    .aggregator
                    .summarize(interview_id, many, ai.as_ref(), None)?;
                Some(HumanInput::Summary(&computed))
            }
        };

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let report = builder.build(interview_id, human, ai.as_ref(), &mut *rng)?;
        tracing::info!(
            basis = ?report.basis,
            total = report.total_score,
            grade = %report.grade,
            "report generated"
        );
        Ok(report)
    }
}

fn require_id(what: &str, value: &str) -> EvalResult<()> {
    if value.trim().is_empty() {
        return Err(EvalError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

fn ensure_no_ai_record(interview_id: &str, records: &[ScoreRecord]) -> EvalResult<()> {
    if records.iter().any(|r| r.kind == RaterKind::Ai) {
        return Err(EvalError::Validation(format!(
            "interview {interview_id} already has an AI score record"
        )));
    }
    Ok(())
}

/// Same scores and comments, ignoring ids and timestamps.
fn same_submission(a: &ScoreRecord, b: &ScoreRecord) -> bool {
    a.scores() == b.scores()
        && a.comment == b.comment
        && a.dimension_comments == b.dimension_comments
}

fn split_records(records: Vec<ScoreRecord>) -> (Vec<ScoreRecord>, Option<ScoreRecord>) {
    let mut humans = Vec::new();
    let mut ai = None;
    for record in records {
        match record.kind {
            RaterKind::Human => humans.push(record),
            RaterKind::Ai => {
                ai.get_or_insert(record);
            }
        }
    }
    (humans, ai)
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
