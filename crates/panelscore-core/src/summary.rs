//! Multi-rater aggregation.
//!
//! A [`Summary`] is recomputed from scratch out of the current human records
//! every time one arrives, so it is always reproducible from its inputs. The
//! only state carried across recomputes is what the lead rater added through
//! [`Aggregator::apply_override`]: final scores, the lead id and the notes log.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Dimension, WeightTable};
use crate::error::{EvalError, EvalResult};
use crate::grade::SummaryGrade;
use crate::record::{RaterKind, ScoreRecord};
use crate::statistics::{mean, population_stddev, ConsistencyLevel, ConsistencyThresholds};

/// Per-dimension statistics across the human raters that scored it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionStat {
    pub mean: f64,
    pub stddev: f64,
    /// Number of raters that set this dimension.
    pub count: usize,
}

/// Lifecycle of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryState {
    NoRaters,
    Partial,
    Finalized,
}

impl fmt::Display for SummaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SummaryState::NoRaters => "no raters",
            SummaryState::Partial => "partial",
            SummaryState::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

/// Statistical aggregate of all human score records for one interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub interview_id: String,
    /// Mean and spread for every dimension at least one rater scored.
    pub dimensions: BTreeMap<Dimension, DimensionStat>,
    /// AI scores, kept for reference only and never blended here.
    #[serde(default)]
    pub ai_reference: BTreeMap<Dimension, u8>,
    /// Lead-rater overrides. Take precedence over the mean.
    #[serde(default)]
    pub final_scores: BTreeMap<Dimension, u8>,
    pub raw_total: f64,
    /// `raw_total` clamped to `[0, 100]`.
    pub normalized_total: f64,
    pub grade: SummaryGrade,
    pub rater_count: usize,
    pub rater_ids: Vec<String>,
    #[serde(default)]
    pub lead_id: Option<String>,
    /// Append-only audit log of overrides.
    #[serde(default)]
    pub notes: Vec<String>,
    /// Regenerated on every recompute.
    #[serde(default)]
    pub narrative: String,
    pub thresholds: ConsistencyThresholds,
    /// Incremented on every stored change; used for optimistic concurrency.
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl Summary {
    pub fn state(&self) -> SummaryState {
        if self.rater_count == 0 {
            SummaryState::NoRaters
        } else if self.final_scores.is_empty() {
            SummaryState::Partial
        } else {
            SummaryState::Finalized
        }
    }

    pub fn consistency(&self, dimension: Dimension) -> Option<ConsistencyLevel> {
        self.dimensions
            .get(&dimension)
            .map(|stat| self.thresholds.classify(stat.stddev))
    }

    /// Number of scored dimensions at each consistency level.
    pub fn consistency_breakdown(&self) -> BTreeMap<ConsistencyLevel, usize> {
        let mut breakdown: BTreeMap<ConsistencyLevel, usize> =
            ConsistencyLevel::ALL.iter().map(|l| (*l, 0)).collect();
        for stat in self.dimensions.values() {
            *breakdown
                .entry(self.thresholds.classify(stat.stddev))
                .or_default() += 1;
        }
        breakdown
    }

    /// Final score if overridden, else the rater mean.
    pub fn effective_score(&self, dimension: Dimension) -> Option<f64> {
        self.final_scores
            .get(&dimension)
            .map(|s| f64::from(*s))
            .or_else(|| self.dimensions.get(&dimension).map(|stat| stat.mean))
    }

    pub fn effective_scores(&self) -> BTreeMap<Dimension, f64> {
        Dimension::ALL
            .iter()
            .filter_map(|d| self.effective_score(*d).map(|s| (*d, s)))
            .collect()
    }

    fn refresh_totals(&mut self, weights: &WeightTable) {
        self.raw_total = weights
            .weighted_average(&self.effective_scores())
            .unwrap_or(0.0);
        self.normalized_total = self.raw_total.clamp(0.0, 100.0);
        self.grade = SummaryGrade::from_score(self.normalized_total);
        self.narrative = self.render_narrative(weights);
        self.updated_at = Utc::now();
    }

    fn render_narrative(&self, weights: &WeightTable) -> String {
        let mut out = String::new();
        if self.rater_count == 0 {
            out.push_str("No human raters have scored this interview yet.");
            return out;
        }

        let _ = writeln!(
            out,
            "{} rater(s) scored this interview. Total {:.1} ({}).",
            self.rater_count, self.normalized_total, self.grade
        );
        for (dimension, stat) in &self.dimensions {
            let _ = write!(
                out,
                "- {}: {:.1} (sd {:.1}, {})",
                dimension.display_name(),
                stat.mean,
                stat.stddev,
                self.thresholds.classify(stat.stddev)
            );
            if let Some(final_score) = self.final_scores.get(dimension) {
                let _ = write!(out, ", final {final_score}");
            }
            out.push('\n');
        }
        let ai_scores: BTreeMap<Dimension, f64> = self
            .ai_reference
            .iter()
            .map(|(d, s)| (*d, f64::from(*s)))
            .collect();
        if let Some(ai_total) = weights.weighted_average(&ai_scores) {
            let _ = writeln!(out, "AI reference total: {ai_total:.1}.");
        }
        out.trim_end().to_string()
    }
}

/// Builds and amends summaries.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    thresholds: ConsistencyThresholds,
    weights: WeightTable,
}

impl Aggregator {
    pub fn new(thresholds: ConsistencyThresholds, weights: WeightTable) -> EvalResult<Self> {
        thresholds.validate()?;
        Ok(Self {
            thresholds,
            weights,
        })
    }

    pub fn thresholds(&self) -> &ConsistencyThresholds {
        &self.thresholds
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Recompute the summary for `interview_id` from its human records.
    ///
    /// `previous` supplies the override state (final scores, lead id, notes)
    /// and the revision to advance from. Unset dimensions are skipped, never
    /// counted as zero.
    pub fn summarize(
        &self,
        interview_id: &str,
        humans: &[ScoreRecord],
        ai: Option<&ScoreRecord>,
        previous: Option<&Summary>,
    ) -> EvalResult<Summary> {
        for record in humans {
            if record.kind != RaterKind::Human {
                return Err(EvalError::Validation(format!(
                    "record {} from {} is not a human record",
                    record.id, record.rater_id
                )));
            }
            if record.interview_id != interview_id {
                return Err(EvalError::Validation(format!(
                    "record {} belongs to interview {}, not {interview_id}",
                    record.id, record.interview_id
                )));
            }
        }
        if let Some(ai) = ai {
            if ai.kind != RaterKind::Ai {
                return Err(EvalError::Validation(format!(
                    "record {} is not an AI record",
                    ai.id
                )));
            }
        }

        let mut dimensions = BTreeMap::new();
        for dimension in Dimension::ALL {
            let values: Vec<f64> = humans
                .iter()
                .filter_map(|r| r.score(dimension))
                .map(f64::from)
                .collect();
            if let Some(m) = mean(&values) {
                dimensions.insert(
                    dimension,
                    DimensionStat {
                        mean: m,
                        stddev: population_stddev(&values),
                        count: values.len(),
                    },
                );
            }
        }

        let mut summary = Summary {
            interview_id: interview_id.to_string(),
            dimensions,
            ai_reference: ai.map(|r| r.scores().clone()).unwrap_or_default(),
            final_scores: previous.map(|p| p.final_scores.clone()).unwrap_or_default(),
            raw_total: 0.0,
            normalized_total: 0.0,
            grade: SummaryGrade::CMinus,
            rater_count: humans.len(),
            rater_ids: humans.iter().map(|r| r.rater_id.clone()).collect(),
            lead_id: previous.and_then(|p| p.lead_id.clone()),
            notes: previous.map(|p| p.notes.clone()).unwrap_or_default(),
            narrative: String::new(),
            thresholds: self.thresholds,
            revision: previous.map_or(1, |p| p.revision + 1),
            updated_at: Utc::now(),
        };
        summary.refresh_totals(&self.weights);
        Ok(summary)
    }

    /// Apply a lead-rater override, returning the amended summary.
    ///
    /// Only the targeted dimensions change. The reason is appended to the
    /// notes log as `[lead <id>] <reason>`.
    pub fn apply_override(
        &self,
        summary: &Summary,
        lead_id: &str,
        overrides: &BTreeMap<Dimension, i64>,
        reason: &str,
    ) -> EvalResult<Summary> {
        if summary.rater_count == 0 {
            return Err(EvalError::Validation(format!(
                "interview {} has no rater scores to override",
                summary.interview_id
            )));
        }
        if lead_id.trim().is_empty() {
            return Err(EvalError::Validation("lead rater id is required".into()));
        }
        if overrides.is_empty() {
            return Err(EvalError::Validation(
                "override must name at least one dimension".into(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(EvalError::Validation("override reason is required".into()));
        }

        let mut validated = BTreeMap::new();
        for (dimension, score) in overrides {
            let value = u8::try_from(*score)
                .ok()
                .filter(|v| *v <= 100)
                .ok_or_else(|| {
                    EvalError::Validation(format!(
                        "override for {dimension} must be within 0..=100, got {score}"
                    ))
                })?;
            validated.insert(*dimension, value);
        }

        let mut amended = summary.clone();
        amended.final_scores.extend(validated);
        amended.lead_id = Some(lead_id.to_string());
        amended
            .notes
            .push(format!("[lead {lead_id}] {}", reason.trim()));
        amended.revision = summary.revision + 1;
        amended.refresh_totals(&self.weights);
        Ok(amended)
    }
}
