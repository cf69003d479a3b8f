//! Analysis result polling.
//!
//! `state` holds the transition logic for a single tick; `session` drives it
//! on a timer and owns cancellation.

pub mod session;
pub mod state;

pub use session::{NewAnalysisRequest, PollEvent, PollSession};
pub use state::{Phase, PollerConfig, ReportView, ViewSnapshot};
