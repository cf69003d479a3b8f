//! Timer-driven polling session.
//!
//! A [`PollSession`] owns at most one polling task at a time. Each task fetches,
//! applies the outcome to the shared [`PollerState`], and either sleeps for the
//! scheduled interval or exits. `stop()` flips the session's cancellation token
//! while holding the state lock, and the task re-checks the token under that
//! same lock before applying any fetch result, so nothing is written into a
//! session after it has been torn down.

use crate::api::AnalyticsSource;
use crate::cache::ReportCache;
use crate::error::SessionError;
use crate::models::AnalysisRecord;
use crate::poller::state::{
    Notification, PollerConfig, PollerState, Schedule, TickEffects, ViewSnapshot,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Events delivered to the consumer of a session.
#[derive(Debug, Clone)]
pub enum PollEvent {
    Notification(Notification),
    /// Emitted after every applied tick.
    Updated(ViewSnapshot),
}

/// Request to start a brand-new analysis for the same product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAnalysisRequest {
    pub product_id: String,
    pub prefill_website: Option<String>,
    pub is_new_analysis: bool,
    pub disable_website_edit: bool,
}

impl NewAnalysisRequest {
    /// Prefill the website from `shown`, the record currently on display.
    pub fn for_product(product_id: &str, shown: Option<&AnalysisRecord>) -> Self {
        Self {
            product_id: product_id.to_string(),
            prefill_website: shown
                .and_then(|record| record.payload())
                .and_then(|payload| payload.brand_website),
            is_new_analysis: true,
            disable_website_edit: true,
        }
    }
}

struct RunHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// One polling session scoped to a product.
pub struct PollSession<S: AnalyticsSource> {
    source: Arc<S>,
    cache: Option<ReportCache>,
    config: PollerConfig,
    state: Option<Arc<Mutex<PollerState>>>,
    events: mpsc::UnboundedSender<PollEvent>,
    run: Option<RunHandle>,
}

fn lock(state: &Mutex<PollerState>) -> MutexGuard<'_, PollerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: AnalyticsSource> PollSession<S> {
    /// Create an idle session and the receiver for its events.
    pub fn new(
        source: S,
        cache: Option<ReportCache>,
        config: PollerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PollEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = Self {
            source: Arc::new(source),
            cache,
            config,
            state: None,
            events,
            run: None,
        };
        (session, receiver)
    }

    /// Start polling `product_id`, replacing any running loop.
    ///
    /// State is kept when restarting the same product and recreated (seeded
    /// from the cache) when the product changes. Must be called from within a
    /// Tokio runtime.
    pub fn start(&mut self, product_id: &str) -> Result<(), SessionError> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(SessionError::EmptyProductId);
        }

        self.stop();

        let reusable = self
            .state
            .as_ref()
            .filter(|state| lock(state).product_id() == product_id)
            .cloned();
        let state = match reusable {
            Some(state) => state,
            None => {
                let seeded = self
                    .cache
                    .as_ref()
                    .and_then(|cache| cache.last_completed(product_id));
                if seeded.is_some() {
                    info!("Loaded last completed report for {} from cache", product_id);
                }
                let state = Arc::new(Mutex::new(PollerState::new(
                    product_id,
                    seeded,
                    self.config.clone(),
                )));
                self.state = Some(Arc::clone(&state));
                state
            }
        };
        lock(&state).begin();

        let (cancel, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.source),
            self.cache.clone(),
            state,
            self.events.clone(),
            cancel_rx,
            product_id.to_string(),
        ));

        info!("Polling analytics for {}", product_id);
        self.run = Some(RunHandle { cancel, task });
        Ok(())
    }

    /// Cancel the running loop. A no-op when nothing is running.
    pub fn stop(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        match &self.state {
            Some(state) => {
                let mut state = lock(state);
                let _ = run.cancel.send(true);
                state.terminate();
            }
            None => {
                let _ = run.cancel.send(true);
            }
        }
        run.task.abort();
        debug!("Polling session stopped");
    }

    /// Whether a polling loop is still scheduled.
    #[cfg(test)]
    pub fn is_polling(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.task.is_finished())
    }

    /// Current view state, if a product has been started.
    pub fn snapshot(&self) -> Option<ViewSnapshot> {
        self.state.as_ref().map(|state| lock(state).snapshot())
    }

    /// Build the request that starts a fresh analysis for the current product.
    pub fn new_analysis_request(&self) -> Option<NewAnalysisRequest> {
        let snapshot = self.snapshot()?;
        Some(NewAnalysisRequest::for_product(
            &snapshot.product_id,
            snapshot.view().record(),
        ))
    }
}

impl<S: AnalyticsSource> Drop for PollSession<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop<S: AnalyticsSource>(
    source: Arc<S>,
    cache: Option<ReportCache>,
    state: Arc<Mutex<PollerState>>,
    events: mpsc::UnboundedSender<PollEvent>,
    mut cancel: watch::Receiver<bool>,
    product_id: String,
) {
    loop {
        if *cancel.borrow() {
            return;
        }

        let outcome = source.fetch_latest(&product_id).await;

        let schedule = {
            let mut state = lock(&state);
            if *cancel.borrow() {
                debug!("Discarding analytics fetched after the session stopped");
                return;
            }

            let effects = state.apply(outcome);
            if let Some(cache) = &cache {
                persist(cache, &effects);
            }
            for notification in &effects.notifications {
                let _ = events.send(PollEvent::Notification(*notification));
            }
            let _ = events.send(PollEvent::Updated(state.snapshot()));
            effects.schedule
        };

        match schedule {
            Schedule::Stop => return,
            Schedule::RetryAfter(delay) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.changed() => return,
                }
            }
        }
    }
}

fn persist(cache: &ReportCache, effects: &TickEffects) {
    if let Some(scope) = &effects.scope {
        if let Err(e) = cache.remember_scope(&scope.product_id, &scope.keywords) {
            warn!("Failed to update cache {}: {}", cache.path().display(), e);
        }
    }
    if let Some(completed) = &effects.completed {
        if let Err(e) = cache.remember_completed(
            &completed.product_id,
            &completed.response,
            completed.date.as_deref(),
        ) {
            warn!("Failed to cache completed report: {}", e);
        }
    }
}
