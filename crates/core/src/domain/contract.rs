//! Normalization of backend payloads: lower-case keys, trimmed ids, plain numbers.

use crate::domain::api::{HorizonOutcome, PerformanceSummaryItem, TrainingRow};
use crate::domain::maturity::MaturityStage;
use serde_json::{Map, Value};

/// Lower-cases every object key, recursively.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(obj) => {
            let mut out = Map::with_capacity(obj.len());
            for (k, v) in obj {
                let key = k.to_ascii_lowercase();
                // Keep the first spelling if a payload carries both `symbol` and `SYMBOL`.
                if !out.contains_key(&key) {
                    out.insert(key, normalize_keys(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

pub fn parse_summary_items(body: &Value) -> Vec<PerformanceSummaryItem> {
    array_field(body, "items")
        .iter()
        .filter(|v| v.is_object())
        .map(summary_item_from_value)
        .collect()
}

pub fn parse_training_rows(body: &Value) -> Vec<TrainingRow> {
    array_field(body, "rows")
        .iter()
        .filter(|v| v.is_object())
        .map(training_row_from_value)
        .collect()
}

pub fn parse_realized_returns(body: &Value) -> Vec<f64> {
    array_field(body, "realized_returns")
        .iter()
        .filter_map(as_number)
        .filter(|n| n.is_finite())
        .collect()
}

fn summary_item_from_value(v: &Value) -> PerformanceSummaryItem {
    let mut by_horizon: Vec<HorizonOutcome> = array_field(v, "by_horizon")
        .iter()
        .filter(|h| h.is_object())
        .filter_map(horizon_from_value)
        .collect();
    by_horizon.sort_by_key(|h| h.horizon_bars);

    PerformanceSummaryItem {
        symbol: identifier(v, "symbol").to_ascii_uppercase(),
        market_type: identifier(v, "market_type").to_ascii_uppercase(),
        pattern_id: identifier(v, "pattern_id"),
        recs_total: count(v, "recs_total"),
        outcomes_total: count(v, "outcomes_total"),
        horizons_covered: horizons_count(v.get("horizons_covered")),
        by_horizon,
    }
}

fn horizon_from_value(v: &Value) -> Option<HorizonOutcome> {
    let horizon_bars = number(v, "horizon_bars").filter(|n| *n >= 1.0)? as u32;
    Some(HorizonOutcome {
        horizon_bars,
        n: number(v, "n").filter(|n| *n >= 0.0).map(|n| n as u32),
        mean_realized_return: number(v, "mean_realized_return"),
        pct_positive: number(v, "pct_positive"),
        pct_hit: number(v, "pct_hit"),
        min_realized_return: number(v, "min_realized_return"),
        max_realized_return: number(v, "max_realized_return"),
    })
}

fn training_row_from_value(v: &Value) -> TrainingRow {
    let maturity_stage = text(v, "maturity_stage").and_then(|s| s.parse::<MaturityStage>().ok());
    let reasons = array_field(v, "reasons")
        .iter()
        .filter_map(|r| match r {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|s| !s.is_empty())
        .collect();

    TrainingRow {
        market_type: identifier(v, "market_type").to_ascii_uppercase(),
        symbol: identifier(v, "symbol").to_ascii_uppercase(),
        pattern_id: identifier(v, "pattern_id"),
        maturity_score: number(v, "maturity_score"),
        maturity_stage,
        coverage_ratio: number(v, "coverage_ratio"),
        reasons,
    }
}

/// `horizons_covered` arrives as a count or as the list of covered horizons.
pub fn horizons_count(v: Option<&Value>) -> u32 {
    match v {
        Some(Value::Array(items)) => items.len() as u32,
        Some(other) => as_number(other)
            .filter(|n| *n >= 0.0)
            .map(|n| n as u32)
            .unwrap_or(0),
        None => 0,
    }
}

fn array_field<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    v.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn number(v: &Value, key: &str) -> Option<f64> {
    v.get(key).and_then(as_number)
}

fn count(v: &Value, key: &str) -> u32 {
    number(v, key)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u32)
        .unwrap_or(0)
}

fn text(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn identifier(v: &Value, key: &str) -> String {
    text(v, key).unwrap_or_default()
}

pub fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
