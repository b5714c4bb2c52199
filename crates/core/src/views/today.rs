use crate::client::{DashboardApi, FetchError};
use crate::domain::api::{Brief, Insight, Portfolio, TodayResponse};
use crate::format;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A page section that is either populated or an explicit empty state with guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Section<T> {
    Ready { data: T },
    Empty { message: String },
}

impl<T> Section<T> {
    pub fn empty(message: &str) -> Self {
        Self::Empty {
            message: message.to_string(),
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ready { data } => Some(data),
            Self::Empty { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioCard {
    pub portfolio_id: String,
    pub name: String,
    pub status: String,
    pub equity: String,
    pub cash: String,
    pub open_positions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefCard {
    pub title: String,
    pub summary: String,
    pub created_at: String,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRow {
    pub symbol: String,
    pub market_type: String,
    pub pattern_id: String,
    pub headline: String,
    pub detail: String,
    pub score: String,
    /// Query string that opens the suggestions view on this insight.
    pub suggestions_query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayView {
    pub portfolio_id: Option<String>,
    pub status_line: String,
    pub portfolio: Section<PortfolioCard>,
    pub brief: Section<BriefCard>,
    pub insights: Section<Vec<InsightRow>>,
}

pub async fn load_today(
    api: &dyn DashboardApi,
    portfolio_id: Option<&str>,
) -> Result<TodayView, FetchError> {
    let res = api.today(portfolio_id).await?;
    Ok(build_today_view(res, portfolio_id))
}

pub fn build_today_view(res: TodayResponse, portfolio_id: Option<&str>) -> TodayView {
    let status_line = match &res.status {
        Some(s) => {
            let parts: Vec<String> = [s.as_of.as_deref(), s.last_run_status.as_deref(), s.message.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if parts.is_empty() {
                format::PLACEHOLDER.to_string()
            } else {
                parts.join(" · ")
            }
        }
        None => format::PLACEHOLDER.to_string(),
    };

    let portfolio = match res.portfolio {
        Some(p) => Section::Ready {
            data: portfolio_card(p),
        },
        None if portfolio_id.is_none() => {
            Section::empty("No portfolio selected. Pass a portfolio_id or set PORTFOLIO_ID.")
        }
        None => Section::empty("Portfolio not found. Check the portfolio_id."),
    };

    let brief = match res.brief {
        Some(b) => Section::Ready {
            data: brief_card(b),
        },
        None => Section::empty("No brief yet today. It is written after the daily run completes."),
    };

    let rows: Vec<InsightRow> = res.insights.into_iter().map(insight_row).collect();
    let insights = if rows.is_empty() {
        Section::empty("No insights for today.")
    } else {
        Section::Ready { data: rows }
    };

    TodayView {
        portfolio_id: portfolio_id.map(str::to_string),
        status_line,
        portfolio,
        brief,
        insights,
    }
}

fn money(v: Option<f64>) -> String {
    v.filter(|v| v.is_finite())
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| format::PLACEHOLDER.to_string())
}

fn portfolio_card(p: Portfolio) -> PortfolioCard {
    PortfolioCard {
        portfolio_id: format::text(p.portfolio_id.as_deref()),
        name: format::text(p.name.as_deref()),
        status: format::text(p.status.as_deref()),
        equity: money(p.equity),
        cash: money(p.cash),
        open_positions: format::count(p.open_positions),
    }
}

fn brief_card(b: Brief) -> BriefCard {
    BriefCard {
        title: format::text(b.title.as_deref()),
        summary: format::text(b.summary.as_deref()),
        created_at: format::text(b.created_at.as_deref()),
        body: b.content.as_ref().map(brief_lines).unwrap_or_default(),
    }
}

/// Flattens the brief body into display lines. Text is split on newlines; arrays
/// contribute one line per element; objects one `key: value` line per entry.
fn brief_lines(content: &Value) -> Vec<String> {
    fn scalar(v: &Value) -> Option<String> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            other => Some(other.to_string()),
        }
    }

    match content {
        Value::String(s) => s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items.iter().filter_map(scalar).collect(),
        Value::Object(obj) => obj
            .iter()
            .filter_map(|(k, v)| scalar(v).map(|v| format!("{k}: {v}")))
            .collect(),
        other => scalar(other).into_iter().collect(),
    }
}

fn insight_row(i: Insight) -> InsightRow {
    let suggestions_query = i.symbol.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(|symbol| {
        let mut q = format!("symbol={symbol}");
        if let Some(p) = i.pattern_id.as_deref().filter(|p| !p.trim().is_empty()) {
            q.push_str(&format!("&pattern_id={}", p.trim()));
        }
        if let Some(m) = i.market_type.as_deref().filter(|m| !m.trim().is_empty()) {
            q.push_str(&format!("&market_type={}", m.trim()));
        }
        q.push_str("&from=brief");
        q
    });

    InsightRow {
        symbol: format::text(i.symbol.as_deref()),
        market_type: format::text(i.market_type.as_deref()),
        pattern_id: format::text(i.pattern_id.as_deref()),
        headline: format::text(i.headline.as_deref()),
        detail: format::text(i.detail.as_deref()),
        score: format::score(i.score),
        suggestions_query,
    }
}
