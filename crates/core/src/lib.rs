pub mod client;
pub mod domain;
pub mod explain;
pub mod format;
pub mod glossary;
pub mod poll;
pub mod suggestions;
pub mod time;
pub mod views;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_METRICS_POLL_SECS: u64 = 60;
    const DEFAULT_STATUS_POLL_SECS: u64 = 60;
    const DEFAULT_DISTRIBUTION_LIMIT: u32 = 500;
    const DEFAULT_HISTOGRAM_BINS: usize = 20;
    const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_base_url: Option<String>,
        pub portfolio_id: Option<String>,
        pub sentry_dsn: Option<String>,
        pub glossary_path: Option<String>,
        pub api_timeout: Duration,
        pub metrics_poll_interval: Duration,
        pub status_poll_interval: Duration,
        pub distribution_limit: u32,
        pub histogram_bins: usize,
        pub port: u16,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                api_base_url: None,
                portfolio_id: None,
                sentry_dsn: None,
                glossary_path: None,
                api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
                metrics_poll_interval: Duration::from_secs(DEFAULT_METRICS_POLL_SECS),
                status_poll_interval: Duration::from_secs(DEFAULT_STATUS_POLL_SECS),
                distribution_limit: DEFAULT_DISTRIBUTION_LIMIT,
                histogram_bins: DEFAULT_HISTOGRAM_BINS,
                port: DEFAULT_PORT,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();
            Ok(Self {
                api_base_url: non_empty_var("API_BASE_URL"),
                portfolio_id: non_empty_var("PORTFOLIO_ID"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                glossary_path: non_empty_var("GLOSSARY_PATH"),
                api_timeout: parsed_var::<u64>("API_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.api_timeout),
                metrics_poll_interval: parsed_var::<u64>("METRICS_POLL_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.metrics_poll_interval),
                status_poll_interval: parsed_var::<u64>("STATUS_POLL_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.status_poll_interval),
                distribution_limit: parsed_var("DISTRIBUTION_LIMIT")?
                    .unwrap_or(defaults.distribution_limit),
                histogram_bins: parsed_var::<usize>("HISTOGRAM_BINS")?
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.histogram_bins),
                port: parsed_var("PORT")?.unwrap_or(defaults.port),
            })
        }

        pub fn require_api_base_url(&self) -> anyhow::Result<&str> {
            self.api_base_url
                .as_deref()
                .context("API_BASE_URL is required")
        }
    }

    fn non_empty_var(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parsed_var<T>(name: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match non_empty_var(name) {
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .with_context(|| format!("{name} is not a valid value: {raw}")),
            None => Ok(None),
        }
    }

}
