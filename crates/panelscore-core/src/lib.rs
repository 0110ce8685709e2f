//! panelscore-core: Multi-rater score aggregation and lenient response extraction.
//!
//! This crate defines the dimension catalog, score records, the extractor that
//! recovers scores from completion responses, the aggregator that summarizes a
//! rater panel, and the builder that blends human and AI scores into a report.

pub mod catalog;
pub mod error;
pub mod extract;
pub mod grade;
pub mod record;
pub mod report;
pub mod service;
pub mod statistics;
pub mod store;
pub mod summary;
pub mod traits;

pub use catalog::{Category, Dimension, WeightTable};
pub use error::{EvalError, EvalResult, ExtractionFailure, ProviderError};
pub use extract::{extract, ExtractionResult};
pub use record::{RaterKind, ScoreRecord};
pub use report::{BlendWeights, CompositeReport, ReportBuilder};
pub use service::{EvaluationService, HumanSubmission, ServiceConfig};
pub use summary::{Aggregator, Summary, SummaryState};
