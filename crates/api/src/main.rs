use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mip_core::client::http::HttpDashboardApi;
use mip_core::client::DashboardApi;
use mip_core::explain::{ExplainHandle, ExplainMode};
use mip_core::glossary::GlossaryStore;
use mip_core::poll::{spawn_pollers, PollerConfig};

mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Arc::new(mip_core::config::Settings::from_env()?);
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let api: Arc<dyn DashboardApi> = match HttpDashboardApi::from_settings(&settings) {
        Ok(client) => {
            tracing::info!(base_url = client.base_url(), "backend client ready");
            Arc::new(client)
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            return Err(e);
        }
    };

    let glossary = match GlossaryStore::load(settings.glossary_path.as_deref()) {
        Ok(store) => store,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "glossary load failed; falling back to the bundled glossary");
            GlossaryStore::embedded()?
        }
    };

    let shutdown = CancellationToken::new();
    let pollers = spawn_pollers(
        api.clone(),
        PollerConfig::from_settings(&settings),
        shutdown.clone(),
    );

    let state = routes::AppState {
        api,
        explain: ExplainHandle::new(),
        mode: ExplainMode::default(),
        glossary: Arc::new(glossary),
        settings: settings.clone(),
        status: pollers.status.clone(),
        live: pollers.live.clone(),
        pages: Arc::default(),
    };

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, "dashboard api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    pollers.join().await;
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    shutdown.cancel();
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
