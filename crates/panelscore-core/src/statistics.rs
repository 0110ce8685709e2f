//! Descriptive statistics and inter-rater consistency labels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};

/// Arithmetic mean. Returns `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`). Zero for fewer than two values.
pub fn population_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let Some(m) = mean(values) else {
        return 0.0;
    };
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// How closely the raters agreed on one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    High,
    Moderate,
    Divergent,
    HighlyDivergent,
}

impl ConsistencyLevel {
    pub const ALL: [ConsistencyLevel; 4] = [
        ConsistencyLevel::High,
        ConsistencyLevel::Moderate,
        ConsistencyLevel::Divergent,
        ConsistencyLevel::HighlyDivergent,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ConsistencyLevel::High => "high agreement",
            ConsistencyLevel::Moderate => "moderate",
            ConsistencyLevel::Divergent => "divergent",
            ConsistencyLevel::HighlyDivergent => "highly divergent",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Upper stddev bounds (exclusive) for each consistency level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyThresholds {
    pub high: f64,
    pub moderate: f64,
    pub divergent: f64,
}

impl Default for ConsistencyThresholds {
    fn default() -> Self {
        Self {
            high: 5.0,
            moderate: 10.0,
            divergent: 15.0,
        }
    }
}

impl ConsistencyThresholds {
    /// Thresholds must be finite, non-negative and strictly increasing.
    pub fn validate(&self) -> EvalResult<()> {
        let all = [self.high, self.moderate, self.divergent];
        if all.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(EvalError::Configuration(format!(
                "consistency thresholds must be finite and non-negative, got {all:?}"
            )));
        }
        if !(self.high < self.moderate && self.moderate < self.divergent) {
            return Err(EvalError::Configuration(format!(
                "consistency thresholds must be strictly increasing, got {all:?}"
            )));
        }
        Ok(())
    }

    pub fn classify(&self, stddev: f64) -> ConsistencyLevel {
        if stddev < self.high {
            ConsistencyLevel::High
        } else if stddev < self.moderate {
            ConsistencyLevel::Moderate
        } else if stddev < self.divergent {
            ConsistencyLevel::Divergent
        } else {
            ConsistencyLevel::HighlyDivergent
        }
    }
}
