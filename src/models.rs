//! Wire models for the product analytics API.
//!
//! Only the `analytics` array of the envelope is required. Record metadata is
//! decoded leniently (ids may be numbers, counts may be null) and the analysis
//! payload itself is kept as raw JSON, only decoded into [`AnalyticsPayload`]
//! when a report is rendered. A field of an unexpected shape therefore never
//! turns a valid record into a fetch failure.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Serde helpers for the loosely typed JSON the analytics backend emits.
///
/// Use with `#[serde(default, deserialize_with = "lenient::...")]`.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Strings pass through; numbers and booleans are rendered as text.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    /// A non-negative count; null or anything unparseable is zero.
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        })
    }

    /// `null` decodes as the type's default.
    pub fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }
}

/// Envelope returned by the product analytics endpoint.
///
/// `analytics[0]` is the most recent record; the order is trusted as sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub analytics: Vec<AnalysisRecord>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub limit: u64,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_id: Option<String>,
}

impl AnalyticsResponse {
    /// The most recent record, if the job has produced one yet.
    pub fn most_recent(&self) -> Option<&AnalysisRecord> {
        self.analytics.first()
    }

    /// First record in the response whose status is completed.
    pub fn first_completed(&self) -> Option<&AnalysisRecord> {
        self.analytics
            .iter()
            .find(|record| record.status() == AnalysisStatus::Completed)
    }
}

/// Status of an analysis job as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnalysisStatus {
    Pending,
    InProgress,
    Completed,
    Error,
    /// Any status string this client does not know about.
    Unrecognized(String),
}

impl From<&str> for AnalysisStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" => AnalysisStatus::Pending,
            "in_progress" => AnalysisStatus::InProgress,
            "completed" => AnalysisStatus::Completed,
            "error" => AnalysisStatus::Error,
            other => AnalysisStatus::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisStatus::Pending => write!(f, "pending"),
            AnalysisStatus::InProgress => write!(f, "in_progress"),
            AnalysisStatus::Completed => write!(f, "completed"),
            AnalysisStatus::Error => write!(f, "error"),
            AnalysisStatus::Unrecognized(s) if s.is_empty() => write!(f, "unknown"),
            AnalysisStatus::Unrecognized(s) => write!(f, "{}", s),
        }
    }
}

/// One snapshot of a (possibly still running) analysis job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    /// Raw analysis payload; only meaningful once the record is completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<String>,
}

impl AnalysisRecord {
    /// Parsed status; a missing status is treated as unrecognized.
    pub fn status(&self) -> AnalysisStatus {
        self.status
            .as_deref()
            .map(AnalysisStatus::from)
            .unwrap_or_else(|| AnalysisStatus::Unrecognized(String::new()))
    }

    /// Recency of this record: the latest of its date, update and creation times.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        [&self.date, &self.updated_at, &self.created_at]
            .into_iter()
            .flatten()
            .filter_map(|raw| parse_timestamp(raw))
            .max()
    }

    /// The raw timestamp string that best identifies this record's date.
    pub fn raw_date(&self) -> Option<&str> {
        self.date
            .as_deref()
            .or(self.updated_at.as_deref())
            .or(self.created_at.as_deref())
    }

    /// Decode the payload into its typed form.
    ///
    /// Returns `None` when the record has no payload or it cannot be decoded.
    pub fn payload(&self) -> Option<AnalyticsPayload> {
        let raw = self.analytics.as_ref()?;
        match serde_json::from_value(raw.clone()) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!("Failed to decode analysis payload: {}", e);
                None
            }
        }
    }

    /// Search keywords recorded in the payload's analysis scope.
    pub fn search_keywords(&self) -> Vec<String> {
        self.analytics
            .as_ref()
            .and_then(|payload| payload.pointer("/analysis_scope/search_keywords"))
            .and_then(Value::as_array)
            .map(|keywords| {
                keywords
                    .iter()
                    .filter_map(|k| k.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Parse the timestamp formats the analytics backend is known to emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Typed view of a completed analysis payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsPayload {
    pub brand_name: Option<String>,
    pub brand_website: Option<String>,
    pub model_name: Option<String>,
    pub status: Option<String>,
    pub analysis_scope: Option<AnalysisScope>,
    pub ai_visibility: Option<AiVisibility>,
    pub sentiment: Option<Sentiment>,
    pub competitor_visibility_table: Option<DataTable>,
    pub competitor_sentiment_table: Option<DataTable>,
    pub brand_mentions: Option<BrandMentions>,
    pub sources_and_content_impact: Option<DataTable>,
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub recommendations: Vec<Recommendation>,
    pub executive_summary: Option<ExecutiveSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisScope {
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub search_keywords: Vec<String>,
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub keywords_or_queries: Vec<String>,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// AI visibility score and its tier as computed by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiVisibility {
    pub weighted_mentions_total: Option<f64>,
    pub breakdown: Option<MentionBreakdown>,
    pub tier_mapping_method: Option<String>,
    pub brand_tier: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionBreakdown {
    pub top_two_mentions: Option<f64>,
    pub top_five_mentions: Option<f64>,
    pub later_mentions: Option<f64>,
    pub calculation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sentiment {
    pub dominant_sentiment: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandMentions {
    pub total_mentions: Option<f64>,
    pub queries_with_mentions: Option<f64>,
    pub total_sources_checked: Option<f64>,
    pub alignment_with_visibility: Option<String>,
}

/// A header plus rows of loosely typed cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTable {
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub header: Vec<Value>,
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub rows: Vec<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_notes: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendation {
    pub overall_insight: Option<String>,
    pub suggested_action: Option<String>,
    pub overall_effort: Option<String>,
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutiveSummary {
    pub brand_score_and_tier: Option<String>,
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub weaknesses: Vec<String>,
    pub competitor_positioning: Option<CompetitorPositioning>,
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub prioritized_actions: Vec<String>,
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorPositioning {
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub leaders: Vec<PositionedBrand>,
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub mid_tier: Vec<PositionedBrand>,
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub laggards: Vec<PositionedBrand>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionedBrand {
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub summary: String,
}

/// Render a loosely typed table cell as display text.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(status: &str) -> AnalysisRecord {
        AnalysisRecord {
            id: Some("a1".to_string()),
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!(AnalysisStatus::from("COMPLETED"), AnalysisStatus::Completed);
        assert_eq!(AnalysisStatus::from("In_Progress"), AnalysisStatus::InProgress);
        assert_eq!(AnalysisStatus::from("error"), AnalysisStatus::Error);
        assert_eq!(AnalysisStatus::from("pending"), AnalysisStatus::Pending);
        assert_eq!(
            AnalysisStatus::from("queued"),
            AnalysisStatus::Unrecognized("queued".to_string())
        );
    }

    #[test]
    fn test_missing_status_is_unrecognized() {
        let record = AnalysisRecord::default();
        assert_eq!(
            record.status(),
            AnalysisStatus::Unrecognized(String::new())
        );
        assert_eq!(record.status().to_string(), "unknown");
    }

    #[test]
    fn test_timestamp_takes_latest_of_update_and_creation() {
        let record = AnalysisRecord {
            created_at: Some("2025-03-01T10:00:00Z".to_string()),
            updated_at: Some("2025-03-02T08:30:00Z".to_string()),
            ..record("completed")
        };
        assert_eq!(
            record.timestamp(),
            parse_timestamp("2025-03-02T08:30:00Z")
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-03-02T08:30:00+02:00").is_some());
        assert!(parse_timestamp("2025-03-02T08:30:00.123456").is_some());
        assert!(parse_timestamp("2025-03-02 08:30:00").is_some());
        assert!(parse_timestamp("2025-03-02").is_some());
        assert!(parse_timestamp("yesterday").is_none());

        let naive = parse_timestamp("2025-03-02T08:30:00").unwrap();
        let zoned = parse_timestamp("2025-03-02T08:30:00Z").unwrap();
        assert_eq!(naive, zoned);
    }

    #[test]
    fn test_response_requires_analytics_array() {
        let missing = serde_json::from_value::<AnalyticsResponse>(json!({
            "count": 0,
            "limit": 10,
            "product_id": "p1"
        }));
        assert!(missing.is_err());

        let empty: AnalyticsResponse =
            serde_json::from_value(json!({ "analytics": [], "count": 0 })).unwrap();
        assert!(empty.most_recent().is_none());
    }

    #[test]
    fn test_first_completed_skips_running_records() {
        let response = AnalyticsResponse {
            analytics: vec![record("in_progress"), record("completed")],
            count: 2,
            limit: 10,
            product_id: None,
        };
        assert_eq!(response.first_completed(), Some(&response.analytics[1]));
    }

    #[test]
    fn test_payload_decodes_leniently() {
        let record = AnalysisRecord {
            analytics: Some(json!({
                "brand_name": "Acme",
                "analysis_scope": { "search_keywords": ["crm", "sales tool"] },
                "ai_visibility": { "weighted_mentions_total": 212.5, "brand_tier": "Medium" },
                "recommendations": [{ "overall_insight": "Thin coverage", "impact": "High" }],
                "unexpected_section": { "ignored": true }
            })),
            ..record("completed")
        };

        let payload = record.payload().unwrap();
        assert_eq!(payload.brand_name.as_deref(), Some("Acme"));
        assert_eq!(payload.recommendations.len(), 1);
        assert_eq!(
            payload.ai_visibility.unwrap().weighted_mentions_total,
            Some(212.5)
        );
        assert_eq!(record.search_keywords(), vec!["crm", "sales tool"]);
    }

    #[test]
    fn test_record_metadata_accepts_numbers_and_nulls() {
        let response: AnalyticsResponse = serde_json::from_value(json!({
            "analytics": [
                { "id": 17, "product_id": 42, "status": "completed", "date": null }
            ],
            "count": null,
            "limit": null,
            "product_id": 42
        }))
        .unwrap();

        assert_eq!(response.count, 0);
        assert_eq!(response.limit, 0);
        assert_eq!(response.product_id.as_deref(), Some("42"));

        let record = response.most_recent().unwrap();
        assert_eq!(record.id.as_deref(), Some("17"));
        assert_eq!(record.product_id.as_deref(), Some("42"));
        assert!(record.date.is_none());
        assert_eq!(record.status(), AnalysisStatus::Completed);
    }

    #[test]
    fn test_payload_null_lists_decode_as_empty() {
        let record = AnalysisRecord {
            analytics: Some(json!({
                "brand_name": "Acme",
                "recommendations": null,
                "analysis_scope": { "search_keywords": null },
                "executive_summary": {
                    "strengths": null,
                    "weaknesses": ["Few reviews"],
                    "competitor_positioning": {
                        "leaders": [{ "name": "Rival", "summary": null }],
                        "laggards": null
                    }
                },
                "sources_and_content_impact": { "header": null, "rows": null }
            })),
            ..record("completed")
        };

        let payload = record.payload().unwrap();
        assert_eq!(payload.brand_name.as_deref(), Some("Acme"));
        assert!(payload.recommendations.is_empty());
        assert!(payload.analysis_scope.unwrap().search_keywords.is_empty());

        let summary = payload.executive_summary.unwrap();
        assert!(summary.strengths.is_empty());
        assert_eq!(summary.weaknesses, vec!["Few reviews"]);
        let positioning = summary.competitor_positioning.unwrap();
        assert_eq!(positioning.leaders[0].name, "Rival");
        assert_eq!(positioning.leaders[0].summary, "");
        assert!(positioning.laggards.is_empty());

        let table = payload.sources_and_content_impact.unwrap();
        assert!(table.header.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("ChatGPT")), "ChatGPT");
        assert_eq!(cell_text(&json!(12)), "12");
        assert_eq!(cell_text(&Value::Null), "");
    }
}
