use crate::domain::maturity::MaturityStage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub api_ok: bool,
    #[serde(default)]
    pub snowflake_ok: bool,
    #[serde(default)]
    pub snowflake_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveMetrics {
    #[serde(default)]
    pub last_run: Option<RunSummary>,
    #[serde(default)]
    pub last_brief: Option<BriefSummary>,
    #[serde(default)]
    pub outcomes: Option<OutcomeActivity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BriefSummary {
    #[serde(default)]
    pub brief_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeActivity {
    #[serde(default)]
    pub since_last_run: Option<u64>,
    #[serde(default)]
    pub last_calculated_at: Option<String>,
}

/// One symbol/pattern row from `/performance/summary`, after ingestion normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummaryItem {
    pub symbol: String,
    pub market_type: String,
    pub pattern_id: String,
    pub recs_total: u32,
    pub outcomes_total: u32,
    pub horizons_covered: u32,
    pub by_horizon: Vec<HorizonOutcome>,
}

impl PerformanceSummaryItem {
    pub fn join_key(&self) -> String {
        join_key(&self.market_type, &self.symbol, &self.pattern_id)
    }

    pub fn horizon(&self, horizon_bars: u32) -> Option<&HorizonOutcome> {
        self.by_horizon
            .iter()
            .find(|h| h.horizon_bars == horizon_bars)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HorizonOutcome {
    pub horizon_bars: u32,
    pub n: Option<u32>,
    pub mean_realized_return: Option<f64>,
    pub pct_positive: Option<f64>,
    pub pct_hit: Option<f64>,
    pub min_realized_return: Option<f64>,
    pub max_realized_return: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub market_type: String,
    pub symbol: String,
    pub pattern_id: String,
    pub maturity_score: Option<f64>,
    pub maturity_stage: Option<MaturityStage>,
    pub coverage_ratio: Option<f64>,
    pub reasons: Vec<String>,
}

impl TrainingRow {
    pub fn join_key(&self) -> String {
        join_key(&self.market_type, &self.symbol, &self.pattern_id)
    }
}

/// Composite key `market_type|symbol|pattern_id` shared by summary items and training rows.
pub fn join_key(market_type: &str, symbol: &str, pattern_id: &str) -> String {
    format!("{market_type}|{symbol}|{pattern_id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionQuery {
    pub market_type: String,
    pub symbol: String,
    pub pattern_id: String,
    pub horizon_bars: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodayResponse {
    #[serde(default)]
    pub status: Option<TodayStatus>,
    #[serde(default)]
    pub portfolio: Option<Portfolio>,
    #[serde(default)]
    pub brief: Option<Brief>,
    #[serde(default)]
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodayStatus {
    #[serde(default)]
    pub as_of: Option<String>,
    #[serde(default)]
    pub last_run_status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    #[serde(default)]
    pub portfolio_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub equity: Option<f64>,
    #[serde(default)]
    pub cash: Option<f64>,
    #[serde(default)]
    pub open_positions: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Brief {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Free-form body; the backend sends either text or structured JSON.
    #[serde(default)]
    pub content: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub market_type: Option<String>,
    #[serde(default)]
    pub pattern_id: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}
