//! Analytics API access.
//!
//! This module provides the HTTP client for the product analytics endpoint
//! and the [`AnalyticsSource`] seam the poller is generic over.

pub mod client;

pub use client::{AnalyticsClient, AnalyticsSource};
