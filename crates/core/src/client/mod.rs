pub mod error;
pub mod http;

pub use error::FetchError;

use crate::domain::api::{
    DistributionQuery, LiveMetrics, PerformanceSummaryItem, StatusResponse, TodayResponse,
    TrainingRow,
};

/// Read-only view of the research backend.
#[async_trait::async_trait]
pub trait DashboardApi: Send + Sync {
    async fn status(&self) -> Result<StatusResponse, FetchError>;

    async fn live_metrics(&self, portfolio_id: Option<&str>) -> Result<LiveMetrics, FetchError>;

    async fn performance_summary(&self) -> Result<Vec<PerformanceSummaryItem>, FetchError>;

    async fn training_status(&self) -> Result<Vec<TrainingRow>, FetchError>;

    async fn distribution(&self, query: &DistributionQuery) -> Result<Vec<f64>, FetchError>;

    async fn today(&self, portfolio_id: Option<&str>) -> Result<TodayResponse, FetchError>;
}
