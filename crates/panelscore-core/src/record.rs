//! One rater's scores for one interview.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Category, Dimension, WeightTable};
use crate::error::{EvalError, EvalResult};
use crate::extract::ExtractionResult;

/// Who produced a score record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RaterKind {
    Human,
    Ai,
}

impl fmt::Display for RaterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaterKind::Human => write!(f, "human"),
            RaterKind::Ai => write!(f, "ai"),
        }
    }
}

/// Validated per-dimension scores from a single rater.
///
/// A dimension absent from `scores` has not been scored, which is distinct
/// from having been scored 0. Once [`submit`](ScoreRecord::submit) is called
/// the record rejects further changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Unique record identifier.
    pub id: Uuid,
    pub interview_id: String,
    pub rater_id: String,
    pub kind: RaterKind,
    #[serde(default)]
    scores: BTreeMap<Dimension, u8>,
    /// Optional free-text comment per dimension.
    #[serde(default)]
    pub dimension_comments: BTreeMap<Dimension, String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    submitted: bool,
    pub scored_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn new(
        interview_id: impl Into<String>,
        rater_id: impl Into<String>,
        kind: RaterKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            interview_id: interview_id.into(),
            rater_id: rater_id.into(),
            kind,
            scores: BTreeMap::new(),
            dimension_comments: BTreeMap::new(),
            comment: String::new(),
            reasoning: String::new(),
            suggestions: Vec::new(),
            submitted: false,
            scored_at: Utc::now(),
        }
    }

    /// Builds an unsubmitted human record from a raw `{dimension: score}` map.
    pub fn human(
        interview_id: impl Into<String>,
        rater_id: impl Into<String>,
        scores: &BTreeMap<Dimension, i64>,
    ) -> EvalResult<Self> {
        let mut record = Self::new(interview_id, rater_id, RaterKind::Human);
        for (dimension, score) in scores {
            record.set_score(*dimension, *score)?;
        }
        Ok(record)
    }

    /// Builds a submitted AI record from a successful extraction.
    pub fn from_extraction(
        interview_id: impl Into<String>,
        rater_id: impl Into<String>,
        extraction: &ExtractionResult,
    ) -> EvalResult<Self> {
        let mut record = Self::new(interview_id, rater_id, RaterKind::Ai);
        for (dimension, score) in &extraction.dimension_scores {
            record.set_score(*dimension, i64::from(*score))?;
        }
        record.dimension_comments = extraction.dimension_comments.clone();
        record.comment = extraction.overall_comment.clone();
        record.reasoning = reasoning_text(extraction);
        record.suggestions = extraction.suggestions.clone();
        record.submit();
        Ok(record)
    }

    fn ensure_mutable(&self) -> EvalResult<()> {
        if self.submitted {
            return Err(EvalError::Validation(format!(
                "score record {} has been submitted and can no longer change",
                self.id
            )));
        }
        Ok(())
    }

    /// Sets one dimension score. Values outside `[0, 100]` are rejected.
    pub fn set_score(&mut self, dimension: Dimension, score: i64) -> EvalResult<()> {
        self.ensure_mutable()?;
        let value = u8::try_from(score)
            .ok()
            .filter(|v| *v <= 100)
            .ok_or_else(|| {
                EvalError::Validation(format!(
                    "score for {dimension} must be within 0..=100, got {score}"
                ))
            })?;
        self.scores.insert(dimension, value);
        self.scored_at = Utc::now();
        Ok(())
    }

    /// Marks a dimension as not scored.
    pub fn clear_score(&mut self, dimension: Dimension) -> EvalResult<()> {
        self.ensure_mutable()?;
        self.scores.remove(&dimension);
        Ok(())
    }

    pub fn set_dimension_comment(
        &mut self,
        dimension: Dimension,
        comment: impl Into<String>,
    ) -> EvalResult<()> {
        self.ensure_mutable()?;
        self.dimension_comments.insert(dimension, comment.into());
        Ok(())
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) -> EvalResult<()> {
        self.ensure_mutable()?;
        self.comment = comment.into();
        Ok(())
    }

    pub fn score(&self, dimension: Dimension) -> Option<u8> {
        self.scores.get(&dimension).copied()
    }

    /// All set scores, in catalog order.
    pub fn scores(&self) -> &BTreeMap<Dimension, u8> {
        &self.scores
    }

    pub fn scored_count(&self) -> usize {
        self.scores.len()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Freezes the record.
    pub fn submit(&mut self) {
        if !self.submitted {
            self.submitted = true;
            self.scored_at = Utc::now();
        }
    }

    /// Set scores widened to `f64` for the weighted-average formula.
    pub fn score_map(&self) -> BTreeMap<Dimension, f64> {
        self.scores
            .iter()
            .map(|(d, s)| (*d, f64::from(*s)))
            .collect()
    }

    /// Catalog-weighted average over the set dimensions.
    pub fn weighted_score(&self, weights: &WeightTable) -> Option<f64> {
        weights.weighted_average(&self.score_map())
    }

    pub fn category_score(&self, weights: &WeightTable, category: Category) -> Option<f64> {
        weights.category_average(&self.score_map(), category)
    }
}

fn reasoning_text(extraction: &ExtractionResult) -> String {
    let mut parts = Vec::new();
    if !extraction.strengths.is_empty() {
        parts.push(format!("Strengths: {}", extraction.strengths.join("; ")));
    }
    if !extraction.weaknesses.is_empty() {
        parts.push(format!("Weaknesses: {}", extraction.weaknesses.join("; ")));
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_scores() {
        let mut record = ScoreRecord::new("iv-1", "alice", RaterKind::Human);
        assert!(record.set_score(Dimension::Logic, 0).is_ok());
        assert!(record.set_score(Dimension::Logic, 100).is_ok());
        assert!(matches!(
            record.set_score(Dimension::Logic, 101),
            Err(EvalError::Validation(_))
        ));
        assert!(matches!(
            record.set_score(Dimension::Logic, -1),
            Err(EvalError::Validation(_))
        ));
        assert_eq!(record.score(Dimension::Logic), Some(100));
    }

    #[test]
    fn unset_is_distinct_from_zero() {
        let mut record = ScoreRecord::new("iv-1", "alice", RaterKind::Human);
        record.set_score(Dimension::Rigor, 0).unwrap();
        assert_eq!(record.score(Dimension::Rigor), Some(0));
        assert_eq!(record.score(Dimension::Logic), None);
        record.clear_score(Dimension::Rigor).unwrap();
        assert_eq!(record.score(Dimension::Rigor), None);
        assert_eq!(record.weighted_score(&WeightTable::default()), None);
    }

    #[test]
    fn submitted_record_is_frozen() {
        let mut record = ScoreRecord::new("iv-1", "alice", RaterKind::Human);
        record.set_score(Dimension::Logic, 70).unwrap();
        record.submit();
        assert!(record.is_submitted());
        assert!(record.set_score(Dimension::Logic, 90).is_err());
        assert!(record.clear_score(Dimension::Logic).is_err());
        assert!(record.set_comment("late").is_err());
        assert_eq!(record.score(Dimension::Logic), Some(70));
    }

    #[test]
    fn weighted_and_category_scores() {
        let mut raw = BTreeMap::new();
        raw.insert(Dimension::ProgrammingSkill, 90);
        raw.insert(Dimension::Debugging, 55);
        raw.insert(Dimension::Logic, 80);
        let record = ScoreRecord::human("iv-1", "bob", &raw).unwrap();

        let weights = WeightTable::default();
        let skill = record.category_score(&weights, Category::Skill).unwrap();
        assert!((skill - (90.0 * 25.0 + 55.0 * 10.0) / 35.0).abs() < 1e-9);
        assert_eq!(
            record.category_score(&weights, Category::Business),
            None
        );
        let overall = record.weighted_score(&weights).unwrap();
        let expected = (90.0 * 25.0 + 55.0 * 10.0 + 80.0 * 20.0) / 55.0;
        assert!((overall - expected).abs() < 1e-9);
    }

    #[test]
    fn from_extraction_builds_submitted_ai_record() {
        let mut extraction = ExtractionResult {
            ok: true,
            overall_comment: "Strong coder".into(),
            strengths: vec!["algorithms".into()],
            suggestions: vec!["practice proofs".into()],
            ..Default::default()
        };
        extraction
            .dimension_scores
            .insert(Dimension::ProgrammingSkill, 88);

        let record = ScoreRecord::from_extraction("iv-9", "ai", &extraction).unwrap();
        assert_eq!(record.kind, RaterKind::Ai);
        assert!(record.is_submitted());
        assert_eq!(record.score(Dimension::ProgrammingSkill), Some(88));
        assert_eq!(record.comment, "Strong coder");
        assert!(record.reasoning.contains("algorithms"));
        assert_eq!(record.suggestions, vec!["practice proofs".to_string()]);
    }

    #[test]
    fn serde_keeps_unset_dimensions_absent() {
        let mut record = ScoreRecord::new("iv-1", "alice", RaterKind::Human);
        record.set_score(Dimension::BasicMath, 65).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["scores"]["BASIC_MATH"], 65);
        assert!(json["scores"].get("LOGIC").is_none());
        assert_eq!(json["kind"], "HUMAN");
    }
}
