use crate::client::{DashboardApi, FetchError};
use crate::config::Settings;
use crate::domain::api::{
    DistributionQuery, LiveMetrics, PerformanceSummaryItem, StatusResponse, TodayResponse,
    TrainingRow,
};
use crate::domain::contract;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDashboardApi {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.require_api_base_url()?;
        Self::new(base_url, settings.api_timeout)
    }

    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!base_url.trim().is_empty(), "API base URL must be non-empty");

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build dashboard api http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// GETs `path` and returns the body with object keys normalized.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = self.url(path);
        let started = Instant::now();

        let res = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%url, error = %e, "dashboard api request failed");
                FetchError::Network(e.to_string())
            })?;

        let status = res.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "dashboard api returned an error status");
            return Err(FetchError::from_status(
                status.as_u16(),
                status.canonical_reason(),
            ));
        }

        let text = res
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let raw = serde_json::from_str::<Value>(&text)
            .map_err(|e| FetchError::Decode(format!("{path}: {e}")))?;

        tracing::debug!(
            %url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dashboard api response"
        );
        Ok(contract::normalize_keys(raw))
    }

    async fn get_typed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let body = self.get_json(path, query).await?;
        serde_json::from_value::<T>(body).map_err(|e| FetchError::Decode(format!("{path}: {e}")))
    }
}

fn portfolio_query(portfolio_id: Option<&str>) -> Vec<(&'static str, String)> {
    portfolio_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|id| vec![("portfolio_id", id.to_string())])
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn status(&self) -> Result<StatusResponse, FetchError> {
        self.get_typed("/status", &[]).await
    }

    async fn live_metrics(&self, portfolio_id: Option<&str>) -> Result<LiveMetrics, FetchError> {
        self.get_typed("/live/metrics", &portfolio_query(portfolio_id))
            .await
    }

    async fn performance_summary(&self) -> Result<Vec<PerformanceSummaryItem>, FetchError> {
        let body = self.get_json("/performance/summary", &[]).await?;
        Ok(contract::parse_summary_items(&body))
    }

    async fn training_status(&self) -> Result<Vec<TrainingRow>, FetchError> {
        let body = self.get_json("/training/status", &[]).await?;
        Ok(contract::parse_training_rows(&body))
    }

    async fn distribution(&self, query: &DistributionQuery) -> Result<Vec<f64>, FetchError> {
        let params = [
            ("market_type", query.market_type.clone()),
            ("symbol", query.symbol.clone()),
            ("pattern_id", query.pattern_id.clone()),
            ("horizon_bars", query.horizon_bars.to_string()),
            ("limit", query.limit.to_string()),
        ];
        let body = self.get_json("/performance/distribution", &params).await?;
        Ok(contract::parse_realized_returns(&body))
    }

    async fn today(&self, portfolio_id: Option<&str>) -> Result<TodayResponse, FetchError> {
        self.get_typed("/today", &portfolio_query(portfolio_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_once() {
        let api = HttpDashboardApi::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.base_url(), "http://localhost:8000");
        assert_eq!(api.url("/status"), "http://localhost:8000/status");
        assert_eq!(api.url("today"), "http://localhost:8000/today");
    }

    #[test]
    fn rejects_empty_base_url() {
        assert!(HttpDashboardApi::new("  ", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn portfolio_query_skips_blank_ids() {
        assert!(portfolio_query(None).is_empty());
        assert!(portfolio_query(Some("  ")).is_empty());
        assert_eq!(
            portfolio_query(Some(" p-1 ")),
            vec![("portfolio_id", "p-1".to_string())]
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let api = HttpDashboardApi::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = api.status().await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)), "unexpected error: {err:?}");
    }
}
