pub mod suggestions;
pub mod today;
pub mod training;

use crate::client::FetchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
    generation: Arc<AtomicU64>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fetch, superseding every ticket handed out before.
    pub fn begin(&self) -> FetchTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        FetchTicket {
            generation,
            scope: self.clone(),
        }
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    scope: ViewScope,
}

impl FetchTicket {
    pub fn is_current(&self) -> bool {
        !self.scope.is_closed() && self.scope.generation.load(Ordering::SeqCst) == self.generation
    }

    /// Drives `fut` unless the scope closes first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        tokio::select! {
            _ = self.scope.token.cancelled() => Err(FetchError::Cancelled),
            res = fut => res,
        }
    }
}

/// `data` keeps the last good snapshot across failed or in-flight refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub loading: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
            updated_at: None,
        }
    }
}

impl<T> ViewState<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewState<U> {
        ViewState {
            data: self.data.map(f),
            error: self.error,
            loading: self.loading,
            updated_at: self.updated_at,
        }
    }

    pub fn apply(&mut self, result: Result<T, FetchError>, now: DateTime<Utc>) {
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.updated_at = Some(now);
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct Page<T> {
    scope: ViewScope,
    state: watch::Sender<ViewState<T>>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Page<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            scope: ViewScope::new(),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.state.subscribe()
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn close(&self) {
        self.scope.close();
    }
}

impl<T: Clone> Page<T> {
    pub fn state(&self) -> ViewState<T> {
        self.state.borrow().clone()
    }

    /// Runs one fetch. Returns `false` when the result was discarded because a newer
    /// refresh started or the page closed in the meantime.
    pub async fn refresh<F>(&self, fetch: F) -> bool
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        let ticket = self.scope.begin();
        self.state.send_modify(|s| s.loading = true);

        let result = ticket.run(fetch).await;
        if !ticket.is_current() {
            tracing::debug!("discarding superseded fetch result");
            return false;
        }

        self.state.send_modify(|s| s.apply(result, Utc::now()));
        true
    }
}

impl<T> Drop for Page<T> {
    fn drop(&mut self) {
        self.scope.close();
    }
}
