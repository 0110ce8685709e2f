//! Static dimension catalog.
//!
//! Every score in the system is keyed by a [`Dimension`]. Dimensions are
//! grouped into five [`Category`] values and carry a default weight used by
//! the weighted-average formula shared by records, summaries and reports.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A scoring category grouping related dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Skill,
    Research,
    Communication,
    Mathematics,
    Business,
}

impl Category {
    /// All categories in catalog order.
    pub const ALL: [Category; 5] = [
        Category::Skill,
        Category::Research,
        Category::Communication,
        Category::Mathematics,
        Category::Business,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Category::Skill => "Skill",
            Category::Research => "Academic and Research Potential",
            Category::Communication => "Communication Skills",
            Category::Mathematics => "Mathematical Ability",
            Category::Business => "Design and Business Acumen",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Skill => "Programming and technical implementation ability",
            Category::Research => "Innovative thinking and research ability",
            Category::Communication => "Expression and communication ability",
            Category::Mathematics => "Mathematical reasoning and modeling ability",
            Category::Business => "Product thinking and business insight",
        }
    }

    /// Dimensions belonging to this category, in catalog order.
    pub fn dimensions(self) -> Vec<Dimension> {
        Dimension::ALL
            .iter()
            .copied()
            .filter(|d| d.category() == self)
            .collect()
    }

    /// Sum of the default weights of this category's dimensions.
    pub fn total_weight(self) -> u32 {
        self.dimensions().iter().map(|d| d.default_weight()).sum()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One scored facet of ability.
///
/// The serialized form is the upper snake-case key used by external scoring
/// payloads (e.g. `PROGRAMMING_SKILL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    // Skill
    ProgrammingSkill,
    FrameworkEnv,
    CodeQuality,
    Debugging,
    SystemDesign,
    // Research
    CreativeExpression,
    ResearchIntuition,
    IdeaValidation,
    TheoreticalBuilding,
    // Communication
    Rigor,
    Logic,
    Persuasiveness,
    // Mathematics
    BasicMath,
    MathModeling,
    ProofAbility,
    // Business
    ProductDesign,
    BusinessInsight,
    OpenSource,
}

impl Dimension {
    /// All dimensions in catalog order. Tie-breaks elsewhere rely on this order.
    pub const ALL: [Dimension; 18] = [
        Dimension::ProgrammingSkill,
        Dimension::FrameworkEnv,
        Dimension::CodeQuality,
        Dimension::Debugging,
        Dimension::SystemDesign,
        Dimension::CreativeExpression,
        Dimension::ResearchIntuition,
        Dimension::IdeaValidation,
        Dimension::TheoreticalBuilding,
        Dimension::Rigor,
        Dimension::Logic,
        Dimension::Persuasiveness,
        Dimension::BasicMath,
        Dimension::MathModeling,
        Dimension::ProofAbility,
        Dimension::ProductDesign,
        Dimension::BusinessInsight,
        Dimension::OpenSource,
    ];

    /// Position in [`Dimension::ALL`].
    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn category(self) -> Category {
        use Dimension::*;
        match self {
            ProgrammingSkill | FrameworkEnv | CodeQuality | Debugging | SystemDesign => {
                Category::Skill
            }
            CreativeExpression | ResearchIntuition | IdeaValidation | TheoreticalBuilding => {
                Category::Research
            }
            Rigor | Logic | Persuasiveness => Category::Communication,
            BasicMath | MathModeling | ProofAbility => Category::Mathematics,
            ProductDesign | BusinessInsight | OpenSource => Category::Business,
        }
    }

    /// Default weight on a 0-100 scale.
    pub fn default_weight(self) -> u32 {
        use Dimension::*;
        match self {
            ProgrammingSkill => 25,
            FrameworkEnv => 15,
            CodeQuality => 15,
            Debugging => 10,
            SystemDesign => 20,
            CreativeExpression => 15,
            ResearchIntuition => 20,
            IdeaValidation => 20,
            TheoreticalBuilding => 20,
            Rigor => 20,
            Logic => 20,
            Persuasiveness => 15,
            BasicMath => 10,
            MathModeling => 25,
            ProofAbility => 20,
            ProductDesign => 20,
            BusinessInsight => 20,
            OpenSource => 15,
        }
    }

    /// Upper snake-case key, as used in external payloads.
    pub fn key(self) -> &'static str {
        use Dimension::*;
        match self {
            ProgrammingSkill => "PROGRAMMING_SKILL",
            FrameworkEnv => "FRAMEWORK_ENV",
            CodeQuality => "CODE_QUALITY",
            Debugging => "DEBUGGING",
            SystemDesign => "SYSTEM_DESIGN",
            CreativeExpression => "CREATIVE_EXPRESSION",
            ResearchIntuition => "RESEARCH_INTUITION",
            IdeaValidation => "IDEA_VALIDATION",
            TheoreticalBuilding => "THEORETICAL_BUILDING",
            Rigor => "RIGOR",
            Logic => "LOGIC",
            Persuasiveness => "PERSUASIVENESS",
            BasicMath => "BASIC_MATH",
            MathModeling => "MATH_MODELING",
            ProofAbility => "PROOF_ABILITY",
            ProductDesign => "PRODUCT_DESIGN",
            BusinessInsight => "BUSINESS_INSIGHT",
            OpenSource => "OPEN_SOURCE",
        }
    }

    pub fn display_name(self) -> &'static str {
        use Dimension::*;
        match self {
            ProgrammingSkill => "Programming Skills",
            FrameworkEnv => "Familiarity with Classic Frameworks and Environment Setup",
            CodeQuality => "Engineering Optimization and Code Quality",
            Debugging => "Code Debugging Skills",
            SystemDesign => "System Design Skills",
            CreativeExpression => "Creative Expression Ability",
            ResearchIntuition => "Research Intuition and Taste",
            IdeaValidation => "Ability to Validate Innovative Ideas",
            TheoreticalBuilding => "Ability to Build Theoretical Systems",
            Rigor => "Clarity and Precision of Expression",
            Logic => "Logical Coherence",
            Persuasiveness => "Persuasiveness",
            BasicMath => "Basic Arithmetic Skills",
            MathModeling => "Mathematical Modeling Skills",
            ProofAbility => "Mathematical Proof Skills",
            ProductDesign => "Product Design Skills",
            BusinessInsight => "Business and Market Insight",
            OpenSource => "Open Source Product Design and Maintenance Skills",
        }
    }

    pub fn description(self) -> &'static str {
        use Dimension::*;
        match self {
            ProgrammingSkill => "Programming fundamentals, implementation and applied algorithms",
            FrameworkEnv => "Familiarity with mainstream frameworks, tooling and environments",
            CodeQuality => "Code conventions, readability, maintainability and optimization",
            Debugging => "Finding and fixing defects in code",
            SystemDesign => "Architecture, module decomposition and scalability",
            CreativeExpression => "Expressing novel ideas and concepts clearly",
            ResearchIntuition => "Sensitivity to promising research directions",
            IdeaValidation => "Validating the feasibility and value of new ideas",
            TheoreticalBuilding => "Building complete theoretical frameworks",
            Rigor => "Accuracy, clarity and correct terminology",
            Logic => "Structure and coherence of reasoning",
            Persuasiveness => "Persuasive and influential argument",
            BasicMath => "Basic arithmetic and calculation",
            MathModeling => "Abstracting real problems into mathematical models",
            ProofAbility => "Mathematical reasoning and rigorous proof",
            ProductDesign => "Product features, user experience and interaction design",
            BusinessInsight => "Market trends, business models and competition",
            OpenSource => "Planning, building and running open source projects",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Dimension {
    type Err = String;

    /// Parses a dimension key case-insensitively; `-` and spaces are treated as `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.key() == normalized)
            .ok_or_else(|| format!("unknown dimension: {s}"))
    }
}

/// Per-dimension weights used by the weighted-average formula.
///
/// Defaults to the catalog weights. A table may be customised, and a dimension
/// whose weight is missing or zero contributes nothing to the weighted sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    weights: HashMap<Dimension, u32>,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            weights: Dimension::ALL
                .iter()
                .map(|d| (*d, d.default_weight()))
                .collect(),
        }
    }
}

impl WeightTable {
    /// A table with no weight data; every weighted average degrades to a simple mean.
    pub fn empty() -> Self {
        Self {
            weights: HashMap::new(),
        }
    }

    pub fn with_weight(mut self, dimension: Dimension, weight: u32) -> Self {
        self.weights.insert(dimension, weight);
        self
    }

    pub fn weight(&self, dimension: Dimension) -> u32 {
        self.weights.get(&dimension).copied().unwrap_or(0)
    }

    /// Weighted average of the present scores.
    ///
    /// `Σ(score_d · weight_d) / Σ(weight_d for d present)`. The divisor only
    /// counts dimensions present in `scores`. When the present dimensions carry
    /// no weight at all the simple mean is returned. Returns `None` for an
    /// empty map.
    pub fn weighted_average(&self, scores: &BTreeMap<Dimension, f64>) -> Option<f64> {
        if scores.is_empty() {
            return None;
        }

        let (sum, total_weight) = scores.iter().fold((0.0, 0u64), |(sum, tw), (d, s)| {
            let w = self.weight(*d);
            (sum + s * w as f64, tw + w as u64)
        });

        if total_weight == 0 {
            return Some(scores.values().sum::<f64>() / scores.len() as f64);
        }
        Some(sum / total_weight as f64)
    }

    /// Weighted average restricted to one category.
    pub fn category_average(
        &self,
        scores: &BTreeMap<Dimension, f64>,
        category: Category,
    ) -> Option<f64> {
        let in_category: BTreeMap<Dimension, f64> = scores
            .iter()
            .filter(|(d, _)| d.category() == category)
            .map(|(d, s)| (*d, *s))
            .collect();
        self.weighted_average(&in_category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn catalog_shape() {
        assert_eq!(Dimension::ALL.len(), 18);
        for (i, d) in Dimension::ALL.iter().enumerate() {
            assert_eq!(d.ordinal(), i);
        }
        let counts: Vec<usize> = Category::ALL
            .iter()
            .map(|c| c.dimensions().len())
            .collect();
        assert_eq!(counts, vec![5, 4, 3, 3, 3]);
        assert_eq!(Category::Skill.total_weight(), 85);
        assert_eq!(Category::Communication.total_weight(), 55);
    }

    #[test]
    fn dimension_key_parse() {
        assert_eq!(
            "PROGRAMMING_SKILL".parse::<Dimension>().unwrap(),
            Dimension::ProgrammingSkill
        );
        assert_eq!(
            "math-modeling".parse::<Dimension>().unwrap(),
            Dimension::MathModeling
        );
        assert!("COOKING".parse::<Dimension>().is_err());
        for d in Dimension::ALL {
            assert_eq!(d.key().parse::<Dimension>().unwrap(), d);
        }
    }

    #[test]
    fn serde_uses_upper_snake_keys() {
        let json = serde_json::to_string(&Dimension::OpenSource).unwrap();
        assert_eq!(json, "\"OPEN_SOURCE\"");
    }

    #[test]
    fn weighted_average_uses_present_weights_only() {
        let table = WeightTable::default();
        let mut scores = BTreeMap::new();
        scores.insert(Dimension::ProgrammingSkill, 80.0); // w 25
        scores.insert(Dimension::Debugging, 60.0); // w 10
        let avg = table.weighted_average(&scores).unwrap();
        let expected = (80.0 * 25.0 + 60.0 * 10.0) / 35.0;
        assert!((avg - expected).abs() < 1e-9);
    }

    #[test]
    fn weighted_average_empty_is_none() {
        assert_eq!(WeightTable::default().weighted_average(&BTreeMap::new()), None);
    }

    #[test]
    fn weighted_average_without_weights_is_simple_mean() {
        let mut scores = BTreeMap::new();
        scores.insert(Dimension::Rigor, 50.0);
        scores.insert(Dimension::Logic, 100.0);
        let avg = WeightTable::empty().weighted_average(&scores).unwrap();
        assert!((avg - 75.0).abs() < 1e-9);
    }

    #[test]
    fn category_average_ignores_other_categories() {
        let mut scores = BTreeMap::new();
        scores.insert(Dimension::BasicMath, 40.0);
        scores.insert(Dimension::ProductDesign, 100.0);
        let avg = WeightTable::default()
            .category_average(&scores, Category::Mathematics)
            .unwrap();
        assert!((avg - 40.0).abs() < 1e-9);
        assert_eq!(
            WeightTable::default().category_average(&scores, Category::Skill),
            None
        );
    }

    fn score_map() -> impl Strategy<Value = BTreeMap<Dimension, f64>> {
        proptest::collection::btree_map(
            (0usize..18).prop_map(|i| Dimension::ALL[i]),
            0.0f64..=100.0,
            1..18,
        )
    }

    proptest! {
        #[test]
        fn weighted_average_matches_manual(scores in score_map()) {
            let table = WeightTable::default();
            let mut num = 0.0;
            let mut den = 0.0;
            for (d, s) in &scores {
                num += s * d.default_weight() as f64;
                den += d.default_weight() as f64;
            }
            let avg = table.weighted_average(&scores).unwrap();
            prop_assert!((avg - num / den).abs() < 1e-9);
        }

        #[test]
        fn weighted_average_stays_in_range(scores in score_map()) {
            let avg = WeightTable::default().weighted_average(&scores).unwrap();
            prop_assert!((0.0..=100.0 + 1e-9).contains(&avg));
        }
    }
}
