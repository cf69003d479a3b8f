//! Poller state and the per-tick transition function.
//!
//! [`PollerState::apply`] is pure with respect to I/O: it takes the outcome of
//! one fetch, updates what the view should show, and returns the side effects
//! (notifications, cache writes, next schedule) for the driver to perform.

use crate::error::FetchError;
use crate::models::{AnalysisRecord, AnalysisStatus, AnalyticsResponse};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Consecutive transport failures before the snapshot carries an error message.
pub const DEFAULT_FAILURE_WARNING_THRESHOLD: u32 = 10;

/// Tunables for one polling session.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Zero disables the warning entirely.
    pub failure_warning_threshold: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            failure_warning_threshold: DEFAULT_FAILURE_WARNING_THRESHOLD,
        }
    }
}

/// Where a polling session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    /// Waiting for the first result worth showing.
    Polling,
    /// A new run is in progress while the last completed report is shown.
    ShowingStaleWithBackgroundRun,
    /// A completed report arrived; no further polls are scheduled.
    ShowingFreshCompleted,
    Terminated,
}

/// User-facing notifications raised by state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Notification {
    AnalysisInProgress,
    AnalysisUpdated,
}

impl Notification {
    pub fn title(&self) -> &'static str {
        match self {
            Notification::AnalysisInProgress => "Analysis in Progress",
            Notification::AnalysisUpdated => "Analysis Updated",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Notification::AnalysisInProgress => {
                "Your analysis has begun. Keep this session open; \
                 you'll be notified here when it's ready."
            }
            Notification::AnalysisUpdated => "Your updated analysis is now available.",
        }
    }
}

/// What to do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    RetryAfter(Duration),
    Stop,
}

/// Scope details refreshed in the cache on every tick that carries a record.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeUpdate {
    pub product_id: String,
    pub keywords: Vec<String>,
}

/// A completed response to store as the last known good report.
#[derive(Debug, Clone)]
pub struct CompletedUpdate {
    pub product_id: String,
    pub response: AnalyticsResponse,
    pub date: Option<String>,
}

/// Side effects requested by one tick.
#[derive(Debug, Clone)]
pub struct TickEffects {
    pub notifications: Vec<Notification>,
    pub scope: Option<ScopeUpdate>,
    pub completed: Option<CompletedUpdate>,
    pub schedule: Schedule,
}

impl TickEffects {
    fn retry(interval: Duration) -> Self {
        Self {
            notifications: Vec::new(),
            scope: None,
            completed: None,
            schedule: Schedule::RetryAfter(interval),
        }
    }
}

/// What the view should render right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportView<'a> {
    /// The current record is completed and authoritative.
    Fresh(&'a AnalysisRecord),
    /// The last completed report, shown while `running` proceeds.
    Stale {
        report: &'a AnalysisRecord,
        running: &'a AnalysisRecord,
    },
    /// Nothing to show yet.
    Loading,
}

impl<'a> ReportView<'a> {
    /// The record whose payload should be rendered.
    pub fn record(&self) -> Option<&'a AnalysisRecord> {
        match *self {
            ReportView::Fresh(record) => Some(record),
            ReportView::Stale { report, .. } => Some(report),
            ReportView::Loading => None,
        }
    }
}

/// Decide which record to render.
///
/// A non-completed current record never replaces the last completed one; with
/// no completed record to fall back on, the loader is shown.
pub fn resolve_view<'a>(
    current: Option<&'a AnalysisRecord>,
    last_completed: Option<&'a AnalysisRecord>,
) -> ReportView<'a> {
    let Some(current) = current else {
        return ReportView::Loading;
    };
    match current.status() {
        AnalysisStatus::Completed => ReportView::Fresh(current),
        AnalysisStatus::InProgress
        | AnalysisStatus::Error
        | AnalysisStatus::Pending
        | AnalysisStatus::Unrecognized(_) => match last_completed {
            Some(report) => ReportView::Stale {
                report,
                running: current,
            },
            None => ReportView::Loading,
        },
    }
}

/// Owned copy of the state handed to consumers.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub product_id: String,
    pub current: Option<AnalysisRecord>,
    pub previous: Option<AnalysisRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub phase: Phase,
}

impl ViewSnapshot {
    pub fn view(&self) -> ReportView<'_> {
        resolve_view(self.current.as_ref(), self.previous.as_ref())
    }

    pub fn is_final(&self) -> bool {
        self.phase == Phase::ShowingFreshCompleted
    }
}

/// Process-local state for one product.
#[derive(Debug, Clone)]
pub struct PollerState {
    product_id: String,
    current: Option<AnalysisRecord>,
    last_completed: Option<AnalysisRecord>,
    is_loading: bool,
    has_notified_start: bool,
    phase: Phase,
    consecutive_failures: u32,
    error: Option<String>,
    config: PollerConfig,
}

impl PollerState {
    /// Create state for `product_id`, optionally seeded with a cached report.
    pub fn new(
        product_id: impl Into<String>,
        last_completed: Option<AnalysisRecord>,
        config: PollerConfig,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            current: None,
            last_completed,
            is_loading: true,
            has_notified_start: false,
            phase: Phase::Idle,
            consecutive_failures: 0,
            error: None,
            config,
        }
    }

    /// Enter a new polling session.
    pub fn begin(&mut self) {
        self.has_notified_start = false;
        self.consecutive_failures = 0;
        self.phase = Phase::Polling;
    }

    /// End the session; no outgoing transitions until the next `begin`.
    pub fn terminate(&mut self) {
        self.phase = Phase::Terminated;
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            product_id: self.product_id.clone(),
            current: self.current.clone(),
            previous: self.last_completed.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
            phase: self.phase,
        }
    }

    /// Apply one fetch outcome.
    pub fn apply(&mut self, outcome: Result<AnalyticsResponse, FetchError>) -> TickEffects {
        let interval = self.config.interval;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                self.record_failure(&e);
                return TickEffects::retry(interval);
            }
        };

        self.consecutive_failures = 0;
        self.error = None;

        let Some(record) = response.most_recent().cloned() else {
            debug!("No analytics for {} yet", self.product_id);
            self.is_loading = true;
            self.phase = Phase::Polling;
            return TickEffects::retry(interval);
        };

        let mut effects = TickEffects::retry(interval);
        effects.scope = Some(ScopeUpdate {
            product_id: self.product_id.clone(),
            keywords: record.search_keywords(),
        });

        let status = record.status();
        match status {
            AnalysisStatus::Completed => {
                let new_ts = record.timestamp();
                let old_ts = self.last_completed.as_ref().and_then(AnalysisRecord::timestamp);

                if let (Some(new_ts), Some(old_ts)) = (new_ts, old_ts) {
                    if new_ts > old_ts {
                        effects.notifications.push(Notification::AnalysisUpdated);
                    }
                }

                let is_older = match (new_ts, old_ts) {
                    (Some(new_ts), Some(old_ts)) => new_ts < old_ts,
                    _ => false,
                };
                if is_older {
                    warn!(
                        "Completed record for {} is older than the cached report; keeping it",
                        self.product_id
                    );
                } else {
                    self.last_completed = Some(record.clone());
                    effects.completed = Some(CompletedUpdate {
                        product_id: self.product_id.clone(),
                        response: response.clone(),
                        date: record.raw_date().map(String::from),
                    });
                }

                info!("Analysis for {} completed", self.product_id);
                self.current = Some(record);
                self.is_loading = false;
                self.phase = Phase::ShowingFreshCompleted;
                effects.schedule = Schedule::Stop;
            }
            AnalysisStatus::InProgress
            | AnalysisStatus::Error
            | AnalysisStatus::Pending
            | AnalysisStatus::Unrecognized(_) => {
                debug!(
                    "Analysis for {} is {}; polling again in {:?}",
                    self.product_id, status, interval
                );
                let announces_start =
                    matches!(status, AnalysisStatus::InProgress | AnalysisStatus::Error);
                if announces_start && !self.has_notified_start {
                    effects.notifications.push(Notification::AnalysisInProgress);
                    self.has_notified_start = true;
                }

                self.current = Some(record);
                self.is_loading = self.last_completed.is_none();
                self.phase = if self.last_completed.is_some() {
                    Phase::ShowingStaleWithBackgroundRun
                } else {
                    Phase::Polling
                };
            }
        }

        effects
    }

    fn record_failure(&mut self, error: &FetchError) {
        self.consecutive_failures += 1;
        warn!(
            "Failed to fetch analytics for {} (attempt {}): {}",
            self.product_id, self.consecutive_failures, error
        );

        let threshold = self.config.failure_warning_threshold;
        if threshold > 0 && self.consecutive_failures >= threshold {
            if self.consecutive_failures == threshold {
                warn!(
                    "Analytics for {} unreachable for {} consecutive attempts; still retrying",
                    self.product_id, threshold
                );
            }
            self.error = Some(format!(
                "Unable to reach the analytics service ({} consecutive failures); still retrying",
                self.consecutive_failures
            ));
        }
    }
}

#[cfg(test)]
impl PollerState {
    pub fn current(&self) -> Option<&AnalysisRecord> {
        self.current.as_ref()
    }

    pub fn last_completed(&self) -> Option<&AnalysisRecord> {
        self.last_completed.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn has_notified_start(&self) -> bool {
        self.has_notified_start
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> ReportView<'_> {
        resolve_view(self.current.as_ref(), self.last_completed.as_ref())
    }
}
