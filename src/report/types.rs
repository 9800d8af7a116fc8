//! Normalized technical-analysis report

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendProbabilities {
    pub up: f64,
    pub sideways: f64,
    pub down: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub probabilities: TrendProbabilities,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradingAdvice {
    pub action: String,
    pub reason: String,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: String,
    pub score: f64,
    pub details: Vec<Value>,
}

/// Report in the single shape the UI renders, whatever the backend sent.
///
/// `indicators_analysis` maps indicator names (`RSI`, `MACD`, ...) to objects
/// that always carry a `value`; the remaining fields are passed through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattedAnalysis {
    pub current_price: f64,
    pub snapshot_price: f64,
    pub trend_analysis: TrendAnalysis,
    pub indicators_analysis: Map<String, Value>,
    pub trading_advice: TradingAdvice,
    pub risk_assessment: RiskAssessment,
    pub last_update_time: String,
}

impl FormattedAnalysis {
    pub fn indicator_value(&self, name: &str) -> Option<&Value> {
        self.indicators_analysis.get(name)?.get("value")
    }
}
