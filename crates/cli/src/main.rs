use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mip_core::client::http::HttpDashboardApi;
use mip_core::client::{DashboardApi, FetchError};
use mip_core::explain::ExplainMode;
use mip_core::glossary::tooltip::{resolve_tooltip, TooltipVariant};
use mip_core::glossary::GlossaryStore;
use mip_core::poll::{spawn_pollers, PollerConfig, StatusBanner};
use mip_core::suggestions::filter::SuggestionFilter;
use mip_core::views::suggestions::{load_evidence, load_suggestions, EvidenceSelection};
use mip_core::views::{today, training, ViewScope};

mod render;

use render::Explainer;

#[derive(Debug, Parser)]
#[command(name = "mip", about = "Market intelligence dashboard in the terminal")]
struct Args {
    /// Hide glossary notes and section explanations.
    #[arg(long, global = true)]
    no_explain: bool,

    /// Backend base URL. Overrides API_BASE_URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Portfolio for the today and live views. Overrides PORTFOLIO_ID.
    #[arg(long, global = true)]
    portfolio_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Backend and warehouse health.
    Status,
    /// Latest run, brief and outcome activity.
    Live,
    /// Strong and early candidates.
    Suggestions {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        pattern_id: Option<String>,
        #[arg(long)]
        market_type: Option<String>,
        /// Set to `brief` when following a link from today's brief.
        #[arg(long)]
        from: Option<String>,
    },
    /// Per-horizon outcomes and the realized return histogram for one candidate.
    Evidence {
        #[arg(long)]
        market_type: String,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        pattern_id: String,
        /// Defaults to the candidate's scoring horizon.
        #[arg(long)]
        horizon: Option<u32>,
    },
    /// Today's portfolio, brief and insights.
    Today,
    /// Maturity of every trained pattern.
    Training,
    /// Look up a glossary entry by `scope.key`.
    Glossary {
        key: String,
        #[arg(long)]
        long: bool,
    },
    /// Poll status and live metrics until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = mip_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if let Some(url) = args.base_url {
        settings.api_base_url = Some(url);
    }
    if let Some(id) = args.portfolio_id {
        settings.portfolio_id = Some(id);
    }

    let glossary = GlossaryStore::load(settings.glossary_path.as_deref())?;
    let explainer = Explainer::new(ExplainMode::new(!args.no_explain), glossary);

    if let Command::Glossary { key, long } = &args.command {
        let variant = if *long {
            TooltipVariant::Long
        } else {
            TooltipVariant::Short
        };
        match resolve_tooltip(explainer.mode(), explainer.glossary(), key, variant) {
            Some(tip) => {
                println!("{}", tip.text);
                if let Some(calc) = tip.calc {
                    println!("= {calc}");
                }
            }
            None => tracing::warn!(%key, "no glossary entry"),
        }
        return Ok(());
    }

    let api: Arc<dyn DashboardApi> = Arc::new(HttpDashboardApi::from_settings(&settings)?);

    let result = run(args.command, api, &settings, &explainer).await;
    if let Err(e) = &result {
        sentry_anyhow::capture_anyhow(e);
    }
    result
}

async fn run(
    command: Command,
    api: Arc<dyn DashboardApi>,
    settings: &mip_core::config::Settings,
    explainer: &Explainer,
) -> anyhow::Result<()> {
    let portfolio_id = settings.portfolio_id.as_deref();
    let now = chrono::Utc::now();

    let out = match command {
        Command::Status => {
            let banner = StatusBanner::from_poll(api.status().await);
            render::status(&banner)
        }
        Command::Live => {
            let mut header = mip_core::poll::LiveHeader::default();
            header.apply(fetch(api.live_metrics(portfolio_id)).await, now);
            if let Some(err) = &header.error {
                anyhow::bail!("live metrics unavailable: {err}");
            }
            render::live(&header, now)
        }
        Command::Suggestions {
            symbol,
            pattern_id,
            market_type,
            from,
        } => {
            let filter = SuggestionFilter {
                symbol,
                pattern_id,
                market_type,
                from,
            };
            let view = fetch(load_suggestions(api.as_ref(), filter))
                .await
                .context("failed to load suggestions")?;
            render::suggestions(&view, explainer)
        }
        Command::Evidence {
            market_type,
            symbol,
            pattern_id,
            horizon,
        } => {
            let selection = EvidenceSelection {
                market_type,
                symbol,
                pattern_id,
                horizon_bars: horizon,
            };
            let view = fetch(load_evidence(
                api.as_ref(),
                selection,
                settings.distribution_limit,
                settings.histogram_bins,
            ))
            .await
            .context("failed to load evidence")?
            .context("no current candidate for that market, symbol and pattern")?;
            render::evidence(&view, explainer)
        }
        Command::Today => {
            let view = fetch(today::load_today(api.as_ref(), portfolio_id))
                .await
                .context("failed to load today")?;
            render::today(&view, explainer)
        }
        Command::Training => {
            let view = fetch(training::load_training(api.as_ref()))
                .await
                .context("failed to load training status")?;
            render::training(&view, explainer)
        }
        Command::Watch => return watch(api, settings).await,
        Command::Glossary { .. } => return Ok(()),
    };

    print!("{out}");
    Ok(())
}

/// Runs one page fetch; Ctrl-C aborts it.
async fn fetch<T, F>(fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    let scope = ViewScope::new();
    let ticket = scope.begin();
    let closer = scope.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            closer.close();
        }
    });

    let result = ticket.run(fut).await;
    interrupt.abort();
    result
}

async fn watch(api: Arc<dyn DashboardApi>, settings: &mip_core::config::Settings) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let mut pollers = spawn_pollers(api, PollerConfig::from_settings(settings), shutdown.clone());
    tracing::info!(
        status_every = ?settings.status_poll_interval,
        metrics_every = ?settings.metrics_poll_interval,
        "watching; press Ctrl-C to stop"
    );

    println!("{}", render::status(&pollers.status.borrow_and_update()));
    let mut last_live_error: Option<String> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = pollers.status.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", render::status(&pollers.status.borrow_and_update()));
            }
            changed = pollers.live.changed() => {
                if changed.is_err() {
                    break;
                }
                let header = pollers.live.borrow_and_update().clone();
                // Age ticks alone only matter when something else changed.
                let fresh = header.seconds_since_update == Some(0);
                if fresh || header.error != last_live_error {
                    last_live_error = header.error.clone();
                    print!("{}", render::live(&header, chrono::Utc::now()));
                }
            }
        }
    }

    shutdown.cancel();
    pollers.join().await;
    Ok(())
}

fn init_sentry(settings: &mip_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
