//! Durable last-known-good report cache.
//!
//! A single JSON document that survives restarts. It holds the last full
//! completed response and a little context about the product it belongs to.
//! Writes replace the whole file; concurrent writers are last-writer-wins.

use crate::error::CacheError;
use crate::models::{AnalysisRecord, AnalyticsResponse};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Contents of the cache file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheContents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analysis_data: Option<AnalyticsResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analysis_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub keyword_count: usize,
}

/// File-backed report cache.
#[derive(Debug, Clone)]
pub struct ReportCache {
    path: PathBuf,
}

impl ReportCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the platform data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brandpulse")
            .join("cache.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache. A missing file is an empty cache.
    pub fn load(&self) -> Result<CacheContents, CacheError> {
        if !self.path.exists() {
            return Ok(CacheContents::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// The last completed record for `product_id`, if one is cached.
    ///
    /// A cache written for a different product is ignored. Unreadable caches
    /// are logged and treated as empty.
    pub fn last_completed(&self, product_id: &str) -> Option<AnalysisRecord> {
        let contents = match self.load() {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Ignoring unreadable cache {}: {}", self.path.display(), e);
                return None;
            }
        };

        if let Some(cached_product) = contents.product_id.as_deref() {
            if cached_product != product_id {
                debug!(
                    "Cached report belongs to product {}, not {}",
                    cached_product, product_id
                );
                return None;
            }
        }

        contents
            .last_analysis_data
            .as_ref()
            .and_then(AnalyticsResponse::first_completed)
            .cloned()
    }

    /// Record the product and its search keywords.
    pub fn remember_scope(&self, product_id: &str, keywords: &[String]) -> Result<(), CacheError> {
        let mut contents = self.load().unwrap_or_default();
        if contents.product_id.as_deref() != Some(product_id) {
            // Nothing cached for another product carries over.
            contents.last_analysis_data = None;
            contents.last_analysis_date = None;
            contents.keywords.clear();
            contents.keyword_count = 0;
        }
        contents.product_id = Some(product_id.to_string());
        if !keywords.is_empty() {
            contents.keywords = keywords.to_vec();
            contents.keyword_count = keywords.len();
        }
        self.store(&contents)
    }

    /// Record a completed response as the new last-known-good report.
    pub fn remember_completed(
        &self,
        product_id: &str,
        response: &AnalyticsResponse,
        date: Option<&str>,
    ) -> Result<(), CacheError> {
        let mut contents = self.load().unwrap_or_default();
        contents.last_analysis_data = Some(response.clone());
        contents.last_analysis_date = date.map(String::from);
        contents.product_id = Some(product_id.to_string());
        self.store(&contents)
    }

    fn store(&self, contents: &CacheContents) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(contents)?;
        std::fs::write(&self.path, json)?;
        debug!("Cache written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn completed(id: &str, date: &str) -> AnalysisRecord {
        AnalysisRecord {
            id: Some(id.to_string()),
            status: Some("completed".to_string()),
            date: Some(date.to_string()),
            ..Default::default()
        }
    }

    fn response(product_id: &str, records: Vec<AnalysisRecord>) -> AnalyticsResponse {
        AnalyticsResponse {
            count: records.len() as u64,
            analytics: records,
            limit: 10,
            product_id: Some(product_id.to_string()),
        }
    }

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = ReportCache::new(dir.path().join("cache.json"));

        let contents = cache.load().unwrap();
        assert!(contents.last_analysis_data.is_none());
        assert!(cache.last_completed("p1").is_none());
    }

    #[test]
    fn test_completed_report_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let cache = ReportCache::new(&path);

        let stored = response(
            "p1",
            vec![
                AnalysisRecord {
                    status: Some("in_progress".to_string()),
                    ..Default::default()
                },
                completed("r1", "2025-04-01T00:00:00Z"),
            ],
        );
        cache
            .remember_completed("p1", &stored, Some("2025-04-01T00:00:00Z"))
            .unwrap();

        let reopened = ReportCache::new(&path);
        let record = reopened.last_completed("p1").unwrap();
        assert_eq!(record.id.as_deref(), Some("r1"));
        assert_eq!(
            reopened.load().unwrap().last_analysis_date.as_deref(),
            Some("2025-04-01T00:00:00Z")
        );
    }

    #[test]
    fn test_other_products_report_is_ignored() {
        let dir = TempDir::new().unwrap();
        let cache = ReportCache::new(dir.path().join("cache.json"));
        cache
            .remember_completed("p1", &response("p1", vec![completed("r1", "2025-04-01")]), None)
            .unwrap();

        assert!(cache.last_completed("p2").is_none());
    }

    #[test]
    fn test_remember_scope_keeps_report_for_same_product() {
        let dir = TempDir::new().unwrap();
        let cache = ReportCache::new(dir.path().join("cache.json"));
        cache
            .remember_completed("p1", &response("p1", vec![completed("r1", "2025-04-01")]), None)
            .unwrap();

        cache
            .remember_scope("p1", &["crm".to_string(), "pipeline".to_string()])
            .unwrap();

        let contents = cache.load().unwrap();
        assert_eq!(contents.keyword_count, 2);
        assert!(cache.last_completed("p1").is_some());

        // Empty keywords on the same product keep the previous set.
        cache.remember_scope("p1", &[]).unwrap();
        assert_eq!(cache.load().unwrap().keywords, vec!["crm", "pipeline"]);
    }

    #[test]
    fn test_remember_scope_resets_on_product_change() {
        let dir = TempDir::new().unwrap();
        let cache = ReportCache::new(dir.path().join("cache.json"));
        cache
            .remember_completed("p1", &response("p1", vec![completed("r1", "2025-04-01")]), None)
            .unwrap();
        cache
            .remember_scope("p1", &["crm".to_string(), "pipeline".to_string()])
            .unwrap();

        cache.remember_scope("p2", &[]).unwrap();

        let contents = cache.load().unwrap();
        assert_eq!(contents.product_id.as_deref(), Some("p2"));
        assert!(contents.last_analysis_data.is_none());
        assert!(contents.last_analysis_date.is_none());
        assert!(contents.keywords.is_empty());
        assert_eq!(contents.keyword_count, 0);
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cache = ReportCache::new(&path);
        assert!(cache.load().is_err());
        assert!(cache.last_completed("p1").is_none());
    }
}
