//! Technical-analysis report normalization
//!
//! Turns the backend's report payloads into the single `FormattedAnalysis`
//! shape rendered by the UI.

pub mod formatter;
pub mod types;

// Re-export main types
pub use formatter::{format_technical_analysis, placeholder, try_format_technical_analysis, FormatError};
pub use types::{FormattedAnalysis, RiskAssessment, TradingAdvice, TrendAnalysis, TrendProbabilities};
