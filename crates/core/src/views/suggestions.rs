use crate::client::{DashboardApi, FetchError};
use crate::suggestions::evidence::{self, EvidenceDistribution, EvidenceRow};
use crate::suggestions::filter::SuggestionFilter;
use crate::suggestions::{derive_candidates, Candidates, DerivedCandidate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionsView {
    pub strong: Vec<DerivedCandidate>,
    pub early: Vec<DerivedCandidate>,
    pub filter: SuggestionFilter,
    pub from_brief: bool,
    pub items_fetched: usize,
    /// `false` when training status could not be loaded and maturity is estimated.
    pub training_available: bool,
    pub empty_message: Option<String>,
}

impl SuggestionsView {
    fn build(
        candidates: Candidates,
        filter: SuggestionFilter,
        items_fetched: usize,
        training_available: bool,
    ) -> Self {
        let filter = filter.normalized();
        let candidates = filter.apply(candidates);

        let empty_message = if !candidates.is_empty() {
            None
        } else if items_fetched == 0 {
            Some("No performance history yet. Suggestions appear once recommendations have outcomes.".to_string())
        } else if filter.is_active() {
            Some("No candidates match the current filter.".to_string())
        } else {
            Some("No candidate has enough history yet (3+ recommendations across 3+ horizons).".to_string())
        };

        Self {
            strong: candidates.strong,
            early: candidates.early,
            from_brief: filter.from_brief(),
            filter,
            items_fetched,
            training_available,
            empty_message,
        }
    }

    /// Narrows an unfiltered view to `filter` without refetching.
    pub fn with_filter(&self, filter: SuggestionFilter) -> Self {
        let candidates = Candidates {
            strong: self.strong.clone(),
            early: self.early.clone(),
        };
        Self::build(candidates, filter, self.items_fetched, self.training_available)
    }
}

/// Summary first, then training. A training failure degrades to proxy maturity.
async fn fetch_candidates(api: &dyn DashboardApi) -> Result<(Candidates, usize, bool), FetchError> {
    let items = api.performance_summary().await?;

    let (training, training_available) = match api.training_status().await {
        Ok(rows) => (rows, true),
        Err(err) => {
            tracing::warn!(error = %err, "training status unavailable; using maturity proxy");
            (Vec::new(), false)
        }
    };

    Ok((derive_candidates(&items, &training), items.len(), training_available))
}

pub async fn load_suggestions(
    api: &dyn DashboardApi,
    filter: SuggestionFilter,
) -> Result<SuggestionsView, FetchError> {
    let (candidates, items_fetched, training_available) = fetch_candidates(api).await?;
    Ok(SuggestionsView::build(
        candidates,
        filter,
        items_fetched,
        training_available,
    ))
}

/// Candidate the evidence drawer is opened for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSelection {
    pub market_type: String,
    pub symbol: String,
    pub pattern_id: String,
    #[serde(default)]
    pub horizon_bars: Option<u32>,
}

impl EvidenceSelection {
    fn normalized(self) -> Self {
        Self {
            market_type: self.market_type.trim().to_ascii_uppercase(),
            symbol: self.symbol.trim().to_ascii_uppercase(),
            pattern_id: self.pattern_id.trim().to_string(),
            horizon_bars: self.horizon_bars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceView {
    pub candidate: DerivedCandidate,
    pub rows: Vec<EvidenceRow>,
    pub distribution: EvidenceDistribution,
}

/// Builds the evidence drawer for one candidate. `Ok(None)` when the selection is not a
/// current candidate.
pub async fn load_evidence(
    api: &dyn DashboardApi,
    selection: EvidenceSelection,
    limit: u32,
    bins: usize,
) -> Result<Option<EvidenceView>, FetchError> {
    let selection = selection.normalized();
    let (candidates, _, _) = fetch_candidates(api).await?;
    let Some(candidate) = candidates
        .find(&selection.market_type, &selection.symbol, &selection.pattern_id)
        .cloned()
    else {
        return Ok(None);
    };

    let query = evidence::distribution_query(&candidate, selection.horizon_bars, limit);
    let returns = api.distribution(&query).await?;

    Ok(Some(EvidenceView {
        rows: evidence::evidence_rows(&candidate),
        distribution: evidence::distribution(query.horizon_bars, &returns, bins),
        candidate,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::api::{
        DistributionQuery, LiveMetrics, PerformanceSummaryItem, StatusResponse, TodayResponse,
        TrainingRow,
    };
    use crate::suggestions::tests::{horizon, item};
    use std::sync::Mutex;

    /// In-memory backend for view and poller tests.
    #[derive(Default)]
    pub(crate) struct StubApi {
        pub items: Option<Vec<PerformanceSummaryItem>>,
        pub training: Option<Vec<TrainingRow>>,
        pub returns: Vec<f64>,
        pub status: Option<StatusResponse>,
        pub live: Option<LiveMetrics>,
        pub today: Option<TodayResponse>,
        pub distribution_queries: Mutex<Vec<DistributionQuery>>,
        pub calls: Mutex<Vec<&'static str>>,
    }

    fn unavailable() -> FetchError {
        FetchError::from_status(503, Some("Service Unavailable"))
    }

    #[async_trait::async_trait]
    impl DashboardApi for StubApi {
        async fn status(&self) -> Result<StatusResponse, FetchError> {
            self.calls.lock().unwrap().push("status");
            self.status
                .clone()
                .ok_or_else(|| FetchError::Network("connection refused".to_string()))
        }

        async fn live_metrics(&self, _portfolio_id: Option<&str>) -> Result<LiveMetrics, FetchError> {
            self.calls.lock().unwrap().push("live");
            self.live.clone().ok_or_else(unavailable)
        }

        async fn performance_summary(&self) -> Result<Vec<PerformanceSummaryItem>, FetchError> {
            self.calls.lock().unwrap().push("summary");
            self.items.clone().ok_or_else(unavailable)
        }

        async fn training_status(&self) -> Result<Vec<TrainingRow>, FetchError> {
            self.calls.lock().unwrap().push("training");
            self.training.clone().ok_or_else(unavailable)
        }

        async fn distribution(&self, query: &DistributionQuery) -> Result<Vec<f64>, FetchError> {
            self.calls.lock().unwrap().push("distribution");
            self.distribution_queries.lock().unwrap().push(query.clone());
            Ok(self.returns.clone())
        }

        async fn today(&self, _portfolio_id: Option<&str>) -> Result<TodayResponse, FetchError> {
            self.calls.lock().unwrap().push("today");
            self.today.clone().ok_or_else(unavailable)
        }
    }

    fn sample_items() -> Vec<PerformanceSummaryItem> {
        vec![
            item("AAPL", 15, 5, vec![horizon(5, 0.6, 0.02)]),
            item("MSFT", 20, 5, vec![horizon(5, 0.7, 0.03)]),
            item("TSLA", 4, 3, vec![horizon(3, 0.5, 0.01)]),
            item("NVDA", 1, 5, vec![]),
        ]
    }

    #[tokio::test]
    async fn summary_failure_skips_training_fetch() {
        let api = StubApi::default();
        let err = load_suggestions(&api, SuggestionFilter::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Service Unavailable");
        assert_eq!(*api.calls.lock().unwrap(), vec!["summary"]);
    }

    #[tokio::test]
    async fn training_failure_degrades_to_proxy() {
        let api = StubApi {
            items: Some(sample_items()),
            ..Default::default()
        };
        let view = load_suggestions(&api, SuggestionFilter::default()).await.unwrap();
        assert!(!view.training_available);
        assert_eq!(view.items_fetched, 4);
        let order: Vec<&str> = view.strong.iter().map(|c| c.item.symbol.as_str()).collect();
        assert_eq!(order, vec!["MSFT", "AAPL"]);
        assert_eq!(view.early.len(), 1);
        assert!(view.empty_message.is_none());
        assert_eq!(*api.calls.lock().unwrap(), vec!["summary", "training"]);
    }

    #[tokio::test]
    async fn empty_states_distinguish_no_data_from_no_match() {
        let api = StubApi {
            items: Some(Vec::new()),
            training: Some(Vec::new()),
            ..Default::default()
        };
        let view = load_suggestions(&api, SuggestionFilter::default()).await.unwrap();
        assert!(view.empty_message.unwrap().starts_with("No performance history"));

        let api = StubApi {
            items: Some(sample_items()),
            training: Some(Vec::new()),
            ..Default::default()
        };
        let filter = SuggestionFilter {
            symbol: Some("GOOG".to_string()),
            from: Some("brief".to_string()),
            ..Default::default()
        };
        let view = load_suggestions(&api, filter).await.unwrap();
        assert!(view.from_brief);
        assert_eq!(view.empty_message.as_deref(), Some("No candidates match the current filter."));
    }

    #[tokio::test]
    async fn unfiltered_view_narrows_without_refetching() {
        let api = StubApi {
            items: Some(sample_items()),
            training: Some(Vec::new()),
            ..Default::default()
        };
        let all = load_suggestions(&api, SuggestionFilter::default()).await.unwrap();
        let msft = all.with_filter(SuggestionFilter {
            symbol: Some("msft".to_string()),
            ..Default::default()
        });

        assert_eq!(msft.strong.len(), 1);
        assert_eq!(msft.strong[0].item.symbol, "MSFT");
        assert!(msft.early.is_empty());
        assert_eq!(msft.items_fetched, 4);
        assert_eq!(msft.filter.symbol.as_deref(), Some("MSFT"));
        assert_eq!(*api.calls.lock().unwrap(), vec!["summary", "training"]);
    }

    #[tokio::test]
    async fn evidence_fetches_distribution_for_scoring_horizon() {
        let api = StubApi {
            items: Some(sample_items()),
            training: Some(Vec::new()),
            returns: vec![-0.01, 0.0, 0.02, 0.05],
            ..Default::default()
        };
        let selection = EvidenceSelection {
            market_type: "stock".to_string(),
            symbol: "aapl".to_string(),
            pattern_id: "p1".to_string(),
            horizon_bars: None,
        };
        let view = load_evidence(&api, selection, 250, 10).await.unwrap().unwrap();

        assert_eq!(view.candidate.item.symbol, "AAPL");
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.distribution.horizon_bars, 5);
        assert_eq!(view.distribution.sample_size, 4);
        assert_eq!(view.distribution.histogram.as_ref().unwrap().total(), 4);

        let queries = api.distribution_queries.lock().unwrap();
        assert_eq!(queries[0].limit, 250);
        assert_eq!(queries[0].market_type, "STOCK");
    }

    #[tokio::test]
    async fn evidence_for_unknown_candidate_is_none() {
        let api = StubApi {
            items: Some(sample_items()),
            training: Some(Vec::new()),
            ..Default::default()
        };
        let selection = EvidenceSelection {
            market_type: "STOCK".to_string(),
            symbol: "NVDA".to_string(),
            pattern_id: "p1".to_string(),
            horizon_bars: Some(5),
        };
        assert!(load_evidence(&api, selection, 100, 20).await.unwrap().is_none());
        assert!(!api.calls.lock().unwrap().contains(&"distribution"));
    }
}
