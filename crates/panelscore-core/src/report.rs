//! Composite reports blending the human panel with the AI rater.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Category, Dimension, WeightTable};
use crate::error::{EvalError, EvalResult};
use crate::grade::ReportGrade;
use crate::record::ScoreRecord;
use crate::summary::Summary;

/// Dimensions at or above this composite score can be strengths.
pub const STRENGTH_THRESHOLD: f64 = 80.0;
/// Dimensions below this composite score can be weaknesses.
pub const WEAKNESS_THRESHOLD: f64 = 70.0;
/// Category composite required to unlock that category's roles.
pub const POSITION_THRESHOLD: f64 = 80.0;

const MAX_HIGHLIGHTS: usize = 3;
const FALLBACK_POSITIONS: [&str; 2] = ["Junior Developer", "Technical Support Engineer"];

/// Human/AI blend weights. They need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendWeights {
    pub human_weight: f64,
    pub ai_weight: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            human_weight: 0.6,
            ai_weight: 0.4,
        }
    }
}

impl BlendWeights {
    pub fn new(human_weight: f64, ai_weight: f64) -> EvalResult<Self> {
        let weights = Self {
            human_weight,
            ai_weight,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> EvalResult<()> {
        for (name, w) in [("human", self.human_weight), ("ai", self.ai_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(EvalError::Configuration(format!(
                    "{name} weight must be a finite non-negative number, got {w}"
                )));
            }
        }
        if self.human_weight == 0.0 && self.ai_weight == 0.0 {
            return Err(EvalError::Configuration(
                "human and ai weights cannot both be zero".into(),
            ));
        }
        Ok(())
    }

    /// Blend one dimension. A lone source is returned unscaled.
    pub fn blend(&self, human: Option<f64>, ai: Option<f64>) -> Option<f64> {
        match (human, ai) {
            (Some(h), Some(a)) => Some(self.human_weight * h + self.ai_weight * a),
            (Some(h), None) => Some(h),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }
}

/// Where the human side of a report comes from.
#[derive(Debug, Clone, Copy)]
pub enum HumanInput<'a> {
    Summary(&'a Summary),
    /// A single human record that has not been summarized.
    Record(&'a ScoreRecord),
}

impl HumanInput<'_> {
    fn scores(&self) -> BTreeMap<Dimension, f64> {
        match self {
            HumanInput::Summary(summary) => summary.effective_scores(),
            HumanInput::Record(record) => record.score_map(),
        }
    }
}

/// Which sources a report was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportBasis {
    Both,
    HumanOnly,
    AiOnly,
}

impl fmt::Display for ReportBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportBasis::Both => "the human panel and AI analysis",
            ReportBasis::HumanOnly => "the human panel only",
            ReportBasis::AiOnly => "AI analysis only",
        };
        f.write_str(s)
    }
}

/// The blended evaluation for one interview. Generated on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeReport {
    pub interview_id: String,
    pub basis: ReportBasis,
    /// Revision of the summary used for the human side.
    pub summary_revision: Option<u64>,
    /// Record used for the human side when no summary was available.
    pub human_record_id: Option<Uuid>,
    pub ai_record_id: Option<Uuid>,
    pub weights: BlendWeights,
    pub dimension_scores: BTreeMap<Dimension, f64>,
    pub category_scores: BTreeMap<Category, f64>,
    pub total_score: f64,
    pub grade: ReportGrade,
    pub strengths: Vec<Dimension>,
    pub weaknesses: Vec<Dimension>,
    pub narrative: String,
    pub suggestions: Vec<String>,
    pub suitable_positions: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Builds [`CompositeReport`]s.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    weights: BlendWeights,
    table: WeightTable,
}

impl ReportBuilder {
    pub fn new(weights: BlendWeights, table: WeightTable) -> EvalResult<Self> {
        weights.validate()?;
        Ok(Self { weights, table })
    }

    pub fn weights(&self) -> BlendWeights {
        self.weights
    }

    /// Blend the available sources into a report.
    ///
    /// At least one source must carry scores. `rng` drives the per-category
    /// suggestion picks only.
    pub fn build(
        &self,
        interview_id: &str,
        human: Option<HumanInput<'_>>,
        ai: Option<&ScoreRecord>,
        rng: &mut dyn RngCore,
    ) -> EvalResult<CompositeReport> {
        let human_scores = human.map(|h| h.scores()).unwrap_or_default();
        let ai_scores = ai.map(|r| r.score_map()).unwrap_or_default();

        let basis = match (human_scores.is_empty(), ai_scores.is_empty()) {
            (false, false) => ReportBasis::Both,
            (false, true) => ReportBasis::HumanOnly,
            (true, false) => ReportBasis::AiOnly,
            (true, true) => {
                return Err(EvalError::NotFound(format!(
                    "insufficient data: interview {interview_id} has neither human nor AI scores"
                )))
            }
        };

        let dimension_scores: BTreeMap<Dimension, f64> = Dimension::ALL
            .iter()
            .filter_map(|d| {
                self.weights
                    .blend(human_scores.get(d).copied(), ai_scores.get(d).copied())
                    .map(|score| (*d, score))
            })
            .collect();

        let category_scores: BTreeMap<Category, f64> = Category::ALL
            .iter()
            .filter_map(|c| {
                self.table
                    .category_average(&dimension_scores, *c)
                    .map(|score| (*c, score))
            })
            .collect();

        // Every category gets an equal say, regardless of its dimension count.
        let total_score = if category_scores.is_empty() {
            0.0
        } else {
            category_scores.values().sum::<f64>() / category_scores.len() as f64
        };
        let grade = ReportGrade::from_score(total_score);

        let (strengths, weaknesses) = rank_highlights(&dimension_scores);
        let suggestions = suggestions_for(grade, &weaknesses, &category_scores, rng);
        let suitable_positions = suitable_positions(&category_scores);
        let narrative = render_narrative(basis, total_score, grade, &strengths, &weaknesses);

        let (summary_revision, human_record_id) = match human {
            Some(HumanInput::Summary(s)) => (Some(s.revision), None),
            Some(HumanInput::Record(r)) => (None, Some(r.id)),
            None => (None, None),
        };

        tracing::debug!(
            interview_id,
            %basis,
            total_score,
            "built composite report"
        );

        Ok(CompositeReport {
            interview_id: interview_id.to_string(),
            basis,
            summary_revision,
            human_record_id,
            ai_record_id: ai.map(|r| r.id),
            weights: self.weights,
            dimension_scores,
            category_scores,
            total_score,
            grade,
            strengths,
            weaknesses,
            narrative,
            suggestions,
            suitable_positions,
            generated_at: Utc::now(),
        })
    }
}

/// Top strengths and bottom weaknesses. Ties keep catalog order.
fn rank_highlights(scores: &BTreeMap<Dimension, f64>) -> (Vec<Dimension>, Vec<Dimension>) {
    // BTreeMap iteration is catalog order; sort_by is stable.
    let mut ranked: Vec<(Dimension, f64)> = scores.iter().map(|(d, s)| (*d, *s)).collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let strengths = ranked
        .iter()
        .filter(|(_, s)| *s >= STRENGTH_THRESHOLD)
        .take(MAX_HIGHLIGHTS)
        .map(|(d, _)| *d)
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    let weaknesses = ranked
        .iter()
        .filter(|(_, s)| *s < WEAKNESS_THRESHOLD)
        .take(MAX_HIGHLIGHTS)
        .map(|(d, _)| *d)
        .collect();

    (strengths, weaknesses)
}

fn tier_suggestions(grade: ReportGrade) -> [&'static str; 2] {
    match grade {
        ReportGrade::Excellent => [
            "Take on harder projects and research problems to keep stretching your abilities.",
            "Consider contributing to open source or presenting at conferences to widen your impact.",
        ],
        ReportGrade::Good => [
            "Keep up the momentum and dig deeper into the areas that interest you most.",
            "Build more hands-on project experience to strengthen engineering skills.",
        ],
        ReportGrade::Average => [
            "Systematically fill gaps in foundational knowledge.",
            "Apply theory in practical projects to consolidate what you learn.",
        ],
        ReportGrade::BelowAverage | ReportGrade::Poor => [
            "Start from foundational courses and progress step by step.",
            "Find a mentor and agree on a targeted study plan.",
        ],
    }
}

fn category_pool(category: Category) -> &'static [&'static str] {
    match category {
        Category::Skill => &[
            "Join real development projects to build engineering experience.",
            "Study data structures and algorithms in depth to write more efficient code.",
            "Read well-maintained open source code to learn established practices.",
        ],
        Category::Research => &[
            "Build a habit of reading papers and following the state of the art.",
            "Write technical blog posts or papers to practise articulating ideas.",
            "Take part in research projects to develop a research mindset.",
        ],
        Category::Communication => &[
            "Give technical talks and share knowledge to improve expression.",
            "Practise structured thinking so arguments are easier to follow.",
            "Work on listening and feedback techniques to communicate more effectively.",
        ],
        Category::Mathematics => &[
            "Work through discrete mathematics and linear algebra systematically.",
            "Solve algorithm problems to exercise mathematical modeling.",
            "Read mathematical proofs to learn rigorous reasoning.",
        ],
        Category::Business => &[
            "Follow industry news to build business awareness.",
            "Learn product design methods such as user research and prototyping.",
            "Get involved in open source communities and contribute.",
        ],
    }
}

fn suggestions_for(
    grade: ReportGrade,
    weaknesses: &[Dimension],
    category_scores: &BTreeMap<Category, f64>,
    rng: &mut dyn RngCore,
) -> Vec<String> {
    let mut out: Vec<String> = tier_suggestions(grade).iter().map(|s| s.to_string()).collect();

    for dimension in weaknesses {
        out.push(format!(
            "Practise {} further with targeted reading and worked examples.",
            dimension.display_name()
        ));
    }

    for (category, score) in category_scores {
        if *score >= WEAKNESS_THRESHOLD {
            continue;
        }
        let pool = category_pool(*category);
        out.push(pool[rng.gen_range(0..pool.len())].to_string());
    }
    out
}

/// Role labels unlocked by a strong category. Communication unlocks none.
pub fn category_positions(category: Category) -> &'static [&'static str] {
    match category {
        Category::Skill => &["Backend Developer", "Systems Architect"],
        Category::Research => &["Algorithm Researcher", "Research Scientist"],
        Category::Business => &["Product Manager", "Technical Project Manager"],
        Category::Mathematics => &["Algorithm Engineer", "Data Scientist"],
        Category::Communication => &[],
    }
}

fn suitable_positions(category_scores: &BTreeMap<Category, f64>) -> Vec<String> {
    let positions: Vec<String> = category_scores
        .iter()
        .filter(|(_, score)| **score >= POSITION_THRESHOLD)
        .flat_map(|(category, _)| category_positions(*category))
        .map(|s| s.to_string())
        .collect();
    if positions.is_empty() {
        FALLBACK_POSITIONS.iter().map(|s| s.to_string()).collect()
    } else {
        positions
    }
}

fn render_narrative(
    basis: ReportBasis,
    total: f64,
    grade: ReportGrade,
    strengths: &[Dimension],
    weaknesses: &[Dimension],
) -> String {
    let mut out = format!(
        "Based on {basis}, the overall score is {total:.1} ({grade}). {}",
        grade.description()
    );
    let names = |dims: &[Dimension]| {
        dims.iter()
            .map(|d| d.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    };
    if !strengths.is_empty() {
        let _ = write!(out, " Strengths: {}.", names(strengths));
    }
    if !weaknesses.is_empty() {
        let _ = write!(out, " Needs improvement: {}.", names(weaknesses));
    }
    out
}
