//! Grading vocabularies.
//!
//! Two tables coexist: the nine-band letter grade used on rater summaries and
//! the five-band descriptive grade used on composite reports. They have
//! different boundaries and are kept as separate types so neither can be
//! substituted for the other.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Letter grade for a rater-panel summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryGrade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
}

impl SummaryGrade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 85.0 => SummaryGrade::APlus,
            s if s >= 80.0 => SummaryGrade::A,
            s if s >= 75.0 => SummaryGrade::AMinus,
            s if s >= 70.0 => SummaryGrade::BPlus,
            s if s >= 65.0 => SummaryGrade::B,
            s if s >= 60.0 => SummaryGrade::BMinus,
            s if s >= 55.0 => SummaryGrade::CPlus,
            s if s >= 50.0 => SummaryGrade::C,
            _ => SummaryGrade::CMinus,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SummaryGrade::APlus => "A+",
            SummaryGrade::A => "A",
            SummaryGrade::AMinus => "A-",
            SummaryGrade::BPlus => "B+",
            SummaryGrade::B => "B",
            SummaryGrade::BMinus => "B-",
            SummaryGrade::CPlus => "C+",
            SummaryGrade::C => "C",
            SummaryGrade::CMinus => "C-",
        }
    }
}

impl fmt::Display for SummaryGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Descriptive grade for a composite report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportGrade {
    Excellent,
    Good,
    Average,
    #[serde(rename = "Below Average")]
    BelowAverage,
    Poor,
}

impl ReportGrade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => ReportGrade::Excellent,
            s if s >= 80.0 => ReportGrade::Good,
            s if s >= 70.0 => ReportGrade::Average,
            s if s >= 60.0 => ReportGrade::BelowAverage,
            _ => ReportGrade::Poor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReportGrade::Excellent => "Excellent",
            ReportGrade::Good => "Good",
            ReportGrade::Average => "Average",
            ReportGrade::BelowAverage => "Below Average",
            ReportGrade::Poor => "Poor",
        }
    }

    /// One-sentence description used in report narratives.
    pub fn description(self) -> &'static str {
        match self {
            ReportGrade::Excellent => {
                "The candidate performed excellently, with outstanding overall ability."
            }
            ReportGrade::Good => "The candidate performed well, with solid overall ability.",
            ReportGrade::Average => {
                "The candidate performed at an average level, with room for improvement."
            }
            ReportGrade::BelowAverage => {
                "The candidate performed below average and needs significant improvement."
            }
            ReportGrade::Poor => {
                "The candidate performed poorly and needs comprehensive improvement."
            }
        }
    }
}

impl fmt::Display for ReportGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_grade_boundaries() {
        assert_eq!(SummaryGrade::from_score(85.0), SummaryGrade::APlus);
        assert_eq!(SummaryGrade::from_score(84.999), SummaryGrade::A);
        assert_eq!(SummaryGrade::from_score(60.0), SummaryGrade::BMinus);
        assert_eq!(SummaryGrade::from_score(49.9), SummaryGrade::CMinus);
        assert_eq!(SummaryGrade::from_score(100.0).to_string(), "A+");
    }

    #[test]
    fn report_grade_boundaries() {
        assert_eq!(ReportGrade::from_score(90.0), ReportGrade::Excellent);
        assert_eq!(ReportGrade::from_score(89.999), ReportGrade::Good);
        assert_eq!(ReportGrade::from_score(70.0), ReportGrade::Average);
        assert_eq!(ReportGrade::from_score(60.0), ReportGrade::BelowAverage);
        assert_eq!(ReportGrade::from_score(0.0), ReportGrade::Poor);
    }

    #[test]
    fn serialized_labels() {
        assert_eq!(serde_json::to_string(&SummaryGrade::BPlus).unwrap(), "\"B+\"");
        assert_eq!(
            serde_json::to_string(&ReportGrade::BelowAverage).unwrap(),
            "\"Below Average\""
        );
    }
}
