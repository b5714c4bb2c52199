use crate::client::{DashboardApi, FetchError};
use crate::domain::api::{LiveMetrics, StatusResponse};
use crate::time::timestamps;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const AGE_TICK: Duration = Duration::from_secs(1);

const API_DOWN_MESSAGE: &str = "API not reachable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum StatusBanner {
    Checking,
    Ok,
    Degraded { message: String },
    Down { message: String },
}

impl StatusBanner {
    pub fn from_poll(result: Result<StatusResponse, FetchError>) -> Self {
        match result {
            Ok(s) if s.api_ok && s.snowflake_ok => Self::Ok,
            Ok(s) if s.api_ok => Self::Degraded {
                message: s
                    .snowflake_message
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Data warehouse not reachable".to_string()),
            },
            Ok(_) => Self::Degraded {
                message: "API reports it is not healthy".to_string(),
            },
            Err(err) => {
                tracing::debug!(error = %err, "status poll failed");
                Self::Down {
                    message: API_DOWN_MESSAGE.to_string(),
                }
            }
        }
    }

    pub fn headline(&self) -> &str {
        match self {
            Self::Checking => "Checking services…",
            Self::Ok => "All systems operational",
            Self::Degraded { message } | Self::Down { message } => message,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Live header state: the last good metrics plus how long ago they arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveHeader {
    pub metrics: Option<LiveMetrics>,
    pub error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub seconds_since_update: Option<u64>,
}

impl LiveHeader {
    pub fn apply(&mut self, result: Result<LiveMetrics, FetchError>, now: DateTime<Utc>) {
        match result {
            Ok(metrics) => {
                *self = Self {
                    metrics: Some(metrics),
                    error: None,
                    last_success_at: Some(now),
                    seconds_since_update: Some(0),
                };
            }
            Err(err) => {
                self.error = Some(err.to_string());
                self.tick(now);
            }
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.seconds_since_update = self
            .last_success_at
            .map(|t| timestamps::seconds_since(t, now));
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub portfolio_id: Option<String>,
    pub metrics_interval: Duration,
    pub status_interval: Duration,
    pub age_tick: Duration,
}

impl PollerConfig {
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self {
            portfolio_id: settings.portfolio_id.clone(),
            metrics_interval: settings.metrics_poll_interval,
            status_interval: settings.status_poll_interval,
            age_tick: AGE_TICK,
        }
    }
}

fn interval(period: Duration) -> tokio::time::Interval {
    let mut iv = tokio::time::interval(period.max(Duration::from_millis(1)));
    iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
    iv
}

pub async fn run_status_poller(
    api: Arc<dyn DashboardApi>,
    period: Duration,
    tx: watch::Sender<StatusBanner>,
    shutdown: CancellationToken,
) {
    let mut iv = interval(period);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = iv.tick() => {}
        }

        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            res = api.status() => res,
        };
        let banner = StatusBanner::from_poll(result);
        tx.send_if_modified(|current| {
            if *current == banner {
                return false;
            }
            tracing::info!(from = ?current, to = ?banner, "status banner changed");
            *current = banner;
            true
        });
    }
    tracing::debug!("status poller stopped");
}

pub async fn run_live_poller(
    api: Arc<dyn DashboardApi>,
    portfolio_id: Option<String>,
    period: Duration,
    tx: watch::Sender<LiveHeader>,
    shutdown: CancellationToken,
) {
    let mut iv = interval(period);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = iv.tick() => {}
        }

        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            res = api.live_metrics(portfolio_id.as_deref()) => res,
        };
        if let Err(err) = &result {
            tracing::warn!(error = %err, "live metrics poll failed");
        }
        tx.send_modify(|header| header.apply(result, Utc::now()));
    }
    tracing::debug!("live metrics poller stopped");
}

/// Refreshes `seconds_since_update` without refetching.
pub async fn run_age_ticker(
    period: Duration,
    tx: watch::Sender<LiveHeader>,
    shutdown: CancellationToken,
) {
    let mut iv = interval(period);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = iv.tick() => {}
        }
        let now = Utc::now();
        tx.send_if_modified(|header| {
            let before = header.seconds_since_update;
            header.tick(now);
            before != header.seconds_since_update
        });
    }
}

/// Handles to the running pollers. Dropping this does not stop them; cancel the token
/// passed to [`spawn_pollers`] and await [`Pollers::join`].
pub struct Pollers {
    pub status: watch::Receiver<StatusBanner>,
    pub live: watch::Receiver<LiveHeader>,
    tasks: Vec<JoinHandle<()>>,
}

impl Pollers {
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "poller task failed");
            }
        }
    }
}

pub fn spawn_pollers(
    api: Arc<dyn DashboardApi>,
    config: PollerConfig,
    shutdown: CancellationToken,
) -> Pollers {
    let (status_tx, status_rx) = watch::channel(StatusBanner::Checking);
    let (live_tx, live_rx) = watch::channel(LiveHeader::default());

    let tasks = vec![
        tokio::spawn(run_status_poller(
            api.clone(),
            config.status_interval,
            status_tx,
            shutdown.clone(),
        )),
        tokio::spawn(run_live_poller(
            api,
            config.portfolio_id,
            config.metrics_interval,
            live_tx.clone(),
            shutdown.clone(),
        )),
        tokio::spawn(run_age_ticker(config.age_tick, live_tx, shutdown)),
    ];

    Pollers {
        status: status_rx,
        live: live_rx,
        tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api::RunSummary;
    use crate::views::suggestions::tests::StubApi;
    use chrono::TimeZone;

    #[test]
    fn banner_states_follow_status_response() {
        let ok = StatusResponse {
            api_ok: true,
            snowflake_ok: true,
            snowflake_message: None,
        };
        assert_eq!(StatusBanner::from_poll(Ok(ok)), StatusBanner::Ok);

        let degraded = StatusResponse {
            api_ok: true,
            snowflake_ok: false,
            snowflake_message: Some("warehouse suspended".to_string()),
        };
        assert_eq!(
            StatusBanner::from_poll(Ok(degraded)),
            StatusBanner::Degraded {
                message: "warehouse suspended".to_string()
            }
        );

        let down = StatusBanner::from_poll(Err(FetchError::Network("refused".to_string())));
        assert_eq!(down.headline(), "API not reachable");
        assert!(!down.is_healthy());
    }

    #[test]
    fn live_header_keeps_metrics_on_failure_and_ages() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let mut header = LiveHeader::default();
        header.tick(t0);
        assert_eq!(header.seconds_since_update, None);

        let metrics = LiveMetrics {
            last_run: Some(RunSummary {
                run_id: Some("r-1".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        header.apply(Ok(metrics.clone()), t0);
        assert_eq!(header.seconds_since_update, Some(0));

        let t1 = t0 + chrono::Duration::seconds(75);
        header.apply(Err(FetchError::from_status(502, Some("Bad Gateway"))), t1);
        assert_eq!(header.metrics, Some(metrics));
        assert_eq!(header.error.as_deref(), Some("Bad Gateway"));
        assert_eq!(header.seconds_since_update, Some(75));
    }

    #[tokio::test]
    async fn status_poller_reports_down_when_api_is_unreachable() {
        let api: Arc<dyn DashboardApi> = Arc::new(StubApi::default());
        let (tx, mut rx) = watch::channel(StatusBanner::Checking);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_status_poller(
            api,
            Duration::from_millis(10),
            tx,
            shutdown.clone(),
        ));

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("banner never changed")
            .unwrap();
        assert_eq!(
            *rx.borrow(),
            StatusBanner::Down {
                message: "API not reachable".to_string()
            }
        );

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn spawned_pollers_publish_and_stop_on_shutdown() {
        let api = StubApi {
            status: Some(StatusResponse {
                api_ok: true,
                snowflake_ok: true,
                snowflake_message: None,
            }),
            live: Some(LiveMetrics::default()),
            ..Default::default()
        };
        let shutdown = CancellationToken::new();
        let config = PollerConfig {
            portfolio_id: Some("p-1".to_string()),
            metrics_interval: Duration::from_millis(20),
            status_interval: Duration::from_millis(20),
            age_tick: Duration::from_millis(5),
        };
        let mut pollers = spawn_pollers(Arc::new(api), config, shutdown.clone());

        tokio::time::timeout(Duration::from_secs(2), pollers.live.changed())
            .await
            .expect("live header never updated")
            .unwrap();
        assert!(pollers.live.borrow().last_success_at.is_some());

        tokio::time::timeout(Duration::from_secs(2), pollers.status.wait_for(|b| b.is_healthy()))
            .await
            .expect("status never became healthy")
            .unwrap();

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), pollers.join())
            .await
            .expect("pollers did not stop");
    }
}
