//! Normalization of technical-analysis payloads
//!
//! The backend answers in three shapes: an `{status, data}` envelope (possibly
//! holding a `reports` array), the flat force-refresh record and the nested
//! analysis record. All of them end up as a `FormattedAnalysis`; anything
//! unrecognized becomes a placeholder report.

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::types::{
    FormattedAnalysis, RiskAssessment, TradingAdvice, TrendAnalysis, TrendProbabilities,
};

const NO_DATA: &str = "No data";
const NO_ADVICE: &str = "No advice";
const DEFAULT_RISK_LEVEL: &str = "medium";
const DEFAULT_RISK_SCORE: f64 = 50.0;
const LOAD_FAILED: &str = "Data loading failed";

/// Indicators shown on the placeholder report, in display order
const PLACEHOLDER_INDICATORS: [&str; 11] = [
    "RSI",
    "MACD",
    "BollingerBands",
    "BIAS",
    "PSY",
    "DMI",
    "VWAP",
    "FundingRate",
    "ExchangeNetflow",
    "NUPL",
    "MayerMultiple",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("empty technical analysis payload")]
    Empty,

    #[error("API response status: {0}")]
    Status(String),

    #[error("API response carries no data")]
    MissingData,

    #[error("reports array is empty")]
    NoReports,

    #[error("unrecognized technical analysis format")]
    UnknownShape,
}

/// Normalizes any backend payload, falling back to the placeholder report.
pub fn format_technical_analysis(payload: &Value) -> FormattedAnalysis {
    match try_format_technical_analysis(payload) {
        Ok(formatted) => formatted,
        Err(err) => {
            tracing::warn!(error = %err, "Using placeholder technical analysis");
            placeholder()
        }
    }
}

pub fn try_format_technical_analysis(payload: &Value) -> Result<FormattedAnalysis, FormatError> {
    if !is_truthy(payload) {
        return Err(FormatError::Empty);
    }

    let record = unwrap_envelope(payload)?;

    if is_force_refresh(record) {
        return Ok(from_force_refresh(record));
    }
    if is_analysis(record) {
        return Ok(from_analysis(record));
    }
    Err(FormatError::UnknownShape)
}

/// Placeholder shown when a payload cannot be interpreted.
pub fn placeholder() -> FormattedAnalysis {
    let indicators = PLACEHOLDER_INDICATORS
        .iter()
        .map(|name| {
            let value = default_indicator_value(name);
            (
                name.to_string(),
                json!({ "value": value, "analysis": LOAD_FAILED, "support_trend": "neutral" }),
            )
        })
        .collect();

    FormattedAnalysis {
        current_price: 0.0,
        snapshot_price: 0.0,
        trend_analysis: TrendAnalysis {
            probabilities: TrendProbabilities {
                up: 0.33,
                sideways: 0.34,
                down: 0.33,
            },
            summary: "Data loading failed, please refresh and try again".to_string(),
        },
        indicators_analysis: indicators,
        trading_advice: TradingAdvice {
            action: NO_ADVICE.to_string(),
            reason: LOAD_FAILED.to_string(),
            ..Default::default()
        },
        risk_assessment: RiskAssessment {
            level: DEFAULT_RISK_LEVEL.to_string(),
            score: DEFAULT_RISK_SCORE,
            details: vec![json!("Data loading failed, unable to assess risk")],
        },
        last_update_time: now_iso(),
    }
}

fn unwrap_envelope(payload: &Value) -> Result<&Value, FormatError> {
    let Some(status) = payload.get("status").and_then(Value::as_str) else {
        return Ok(payload);
    };
    let Some(data) = payload.get("data") else {
        return Ok(payload);
    };

    if status != "success" {
        return Err(FormatError::Status(status.to_string()));
    }
    if !is_truthy(data) {
        return Err(FormatError::MissingData);
    }

    match data.get("reports").and_then(Value::as_array) {
        Some(reports) => reports.first().ok_or(FormatError::NoReports),
        None => Ok(data),
    }
}

fn is_force_refresh(record: &Value) -> bool {
    has_keys(
        record,
        &[
            "trend_up_probability",
            "trend_sideways_probability",
            "trend_down_probability",
        ],
    )
}

fn is_analysis(record: &Value) -> bool {
    has_keys(
        record,
        &["trend_analysis", "indicators_analysis", "trading_advice"],
    )
}

fn from_force_refresh(record: &Value) -> FormattedAnalysis {
    FormattedAnalysis {
        current_price: num(record.get("current_price"), 0.0),
        snapshot_price: num(record.get("snapshot_price"), 0.0),
        trend_analysis: TrendAnalysis {
            probabilities: TrendProbabilities {
                up: num(record.get("trend_up_probability"), 0.0),
                sideways: num(record.get("trend_sideways_probability"), 0.0),
                down: num(record.get("trend_down_probability"), 0.0),
            },
            summary: text(record.get("trend_summary"), NO_DATA),
        },
        indicators_analysis: record
            .get("indicators_analysis")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        trading_advice: TradingAdvice {
            action: text(record.get("trading_action"), NO_ADVICE),
            reason: text(record.get("trading_reason"), NO_DATA),
            entry_price: num(record.get("entry_price"), 0.0),
            stop_loss: num(record.get("stop_loss"), 0.0),
            take_profit: num(record.get("take_profit"), 0.0),
        },
        risk_assessment: risk(
            record.get("risk_level"),
            record.get("risk_score"),
            record.get("risk_details"),
        ),
        last_update_time: text_or_else(record.get("last_update_time"), now_iso),
    }
}

fn from_analysis(record: &Value) -> FormattedAnalysis {
    let price = record
        .get("price")
        .and_then(Value::as_f64)
        .unwrap_or_else(|| num(record.get("current_price"), 0.0));

    let trend = record.get("trend_analysis");
    let probabilities = trend.and_then(|t| t.get("probabilities"));
    let advice = record.get("trading_advice");

    let risk_assessment = match record.get("risk_assessment").filter(|r| is_truthy(r)) {
        Some(r) => risk(r.get("level"), r.get("score"), r.get("details")),
        None => risk(
            field(advice, "risk_level"),
            field(advice, "risk_score"),
            field(advice, "risk_details"),
        ),
    };

    let last_update_time = match record.get("last_update_time").and_then(Value::as_str) {
        Some(t) => t.to_string(),
        None => text_or_else(record.get("timestamp"), now_iso),
    };

    FormattedAnalysis {
        current_price: num(record.get("current_price"), price),
        snapshot_price: num(record.get("snapshot_price"), price),
        trend_analysis: TrendAnalysis {
            probabilities: TrendProbabilities {
                up: num(field(probabilities, "up"), 0.0),
                sideways: num(field(probabilities, "sideways"), 0.0),
                down: num(field(probabilities, "down"), 0.0),
            },
            summary: text(field(trend, "summary"), NO_DATA),
        },
        indicators_analysis: backfill_indicators(
            record.get("indicators_analysis"),
            record.get("indicators").filter(|r| is_truthy(r)),
        ),
        trading_advice: TradingAdvice {
            action: text(field(advice, "action"), NO_ADVICE),
            reason: text(field(advice, "reason"), NO_DATA),
            entry_price: num(field(advice, "entry_price"), 0.0),
            stop_loss: num(field(advice, "stop_loss"), 0.0),
            take_profit: num(field(advice, "take_profit"), 0.0),
        },
        risk_assessment,
        last_update_time,
    }
}

/// Keeps object-valued indicators, giving each one a `value`.
fn backfill_indicators(analysis: Option<&Value>, raw: Option<&Value>) -> Map<String, Value> {
    let Some(analysis) = analysis.and_then(Value::as_object) else {
        return Map::new();
    };

    analysis
        .iter()
        .filter_map(|(name, indicator)| {
            let mut indicator = indicator.as_object()?.clone();
            if !indicator.contains_key("value") {
                let value = raw
                    .and_then(|raw| raw_indicator_value(name, raw))
                    .unwrap_or_else(|| default_indicator_value(name));
                indicator.insert("value".to_string(), value);
            }
            Some((name.clone(), Value::Object(indicator)))
        })
        .collect()
}

/// Value of indicator `name` assembled from the flat `indicators` record.
fn raw_indicator_value(name: &str, raw: &Value) -> Option<Value> {
    let pick = |key: &str| match raw.get(key) {
        Some(v) if is_truthy(v) => v.clone(),
        _ => json!(0),
    };

    let value = match name.to_ascii_lowercase().as_str() {
        "rsi" => pick("rsi"),
        "macd" => json!({
            "line": pick("macd_line"),
            "signal": pick("macd_signal"),
            "histogram": pick("macd_histogram"),
        }),
        "bollingerbands" => json!({
            "upper": pick("bollinger_upper"),
            "middle": pick("bollinger_middle"),
            "lower": pick("bollinger_lower"),
        }),
        "bias" => pick("bias"),
        "psy" => pick("psy"),
        "dmi" => json!({
            "plus_di": pick("dmi_plus"),
            "minus_di": pick("dmi_minus"),
            "adx": pick("dmi_adx"),
        }),
        "vwap" => pick("vwap"),
        "fundingrate" => pick("funding_rate"),
        "exchangenetflow" => pick("exchange_netflow"),
        "nupl" => pick("nupl"),
        "mayermultiple" => pick("mayer_multiple"),
        _ => return None,
    };
    Some(value)
}

fn default_indicator_value(name: &str) -> Value {
    match name.to_ascii_lowercase().as_str() {
        "macd" => json!({ "line": 0, "signal": 0, "histogram": 0 }),
        "bollingerbands" => json!({ "upper": 0, "middle": 0, "lower": 0 }),
        "dmi" => json!({ "plus_di": 0, "minus_di": 0, "adx": 0 }),
        _ => json!(0),
    }
}

fn risk(level: Option<&Value>, score: Option<&Value>, details: Option<&Value>) -> RiskAssessment {
    RiskAssessment {
        level: text(level, DEFAULT_RISK_LEVEL),
        score: num(score, DEFAULT_RISK_SCORE),
        details: details
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}

fn field<'a>(parent: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    parent.and_then(|p| p.get(key))
}

fn has_keys(record: &Value, keys: &[&str]) -> bool {
    record
        .as_object()
        .is_some_and(|obj| keys.iter().all(|k| obj.contains_key(*k)))
}

fn num(value: Option<&Value>, default: f64) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(default)
}

fn text(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn text_or_else(value: Option<&Value>, default: impl FnOnce() -> String) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(default)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
