//! Markdown and JSON report generation.
//!
//! This module renders the record chosen by the poller's display resolution
//! into a terminal-friendly report.

use crate::analysis::{source_rows, summarize_mentions, Gauge, MentionSummary, DEFAULT_GAUGE_MAX};
use crate::models::{
    cell_text, AnalysisRecord, AnalyticsPayload, DataTable, ExecutiveSummary, PositionedBrand,
    Recommendation,
};
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Which optional sections to include.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub include_tables: bool,
    pub include_recommendations: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_tables: true,
            include_recommendations: true,
        }
    }
}

/// The record to render and, when it is a stale report, the run that is
/// still in progress.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub product_id: &'a str,
    pub record: &'a AnalysisRecord,
    pub running: Option<&'a AnalysisRecord>,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(input: &ReportInput<'_>, options: &ReportOptions) -> String {
    let payload = input.record.payload().unwrap_or_default();
    let mut output = String::new();

    // Title
    match payload.brand_name.as_deref() {
        Some(brand) => output.push_str(&format!("# AI Visibility Report: {}\n\n", brand)),
        None => output.push_str("# AI Visibility Report\n\n"),
    }

    if let Some(running) = input.running {
        output.push_str(&generate_stale_banner(input.record, running));
    }

    output.push_str(&generate_metadata_section(input, &payload));
    output.push_str(&generate_insights_section(&payload));

    if let Some(summary) = &payload.executive_summary {
        output.push_str(&generate_executive_summary_section(summary));
    }

    if options.include_tables {
        if let Some(table) = &payload.competitor_visibility_table {
            output.push_str(&generate_table_section("Competitor Visibility", table));
        }
        if let Some(table) = &payload.competitor_sentiment_table {
            output.push_str(&generate_table_section("Competitor Sentiment", table));
        }
        if let Some(table) = &payload.sources_and_content_impact {
            output.push_str(&generate_content_impact_section(table));
        }
    }

    if options.include_recommendations && !payload.recommendations.is_empty() {
        output.push_str(&generate_recommendations_section(&payload.recommendations));
    }

    output.push_str(&generate_footer());

    output
}

fn generate_stale_banner(report: &AnalysisRecord, running: &AnalysisRecord) -> String {
    format!(
        "> ⏳ A new analysis is running (status: `{}`).\n\
         > Showing the last completed report from {}.\n\n",
        running.status(),
        report.raw_date().unwrap_or("an earlier run")
    )
}

/// Generate the metadata section.
fn generate_metadata_section(input: &ReportInput<'_>, payload: &AnalyticsPayload) -> String {
    let mut section = String::new();
    let record = input.record;

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Product:** {}\n", input.product_id));
    if let Some(name) = &record.product_name {
        section.push_str(&format!("- **Product Name:** {}\n", name));
    }
    if let Some(website) = &payload.brand_website {
        section.push_str(&format!("- **Website:** {}\n", website));
    }
    if let Some(model) = &payload.model_name {
        section.push_str(&format!("- **Model:** `{}`\n", model));
    }
    match record.timestamp() {
        Some(ts) => section.push_str(&format!(
            "- **Analysis Date:** {}\n",
            ts.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        None => {
            if let Some(raw) = record.raw_date() {
                section.push_str(&format!("- **Analysis Date:** {}\n", raw));
            }
        }
    }
    section.push_str(&format!("- **Status:** {}\n", record.status()));

    if let Some(scope) = &payload.analysis_scope {
        if !scope.search_keywords.is_empty() {
            section.push_str(&format!(
                "- **Keywords:** {}\n",
                scope.search_keywords.join(", ")
            ));
        }
    }
    section.push('\n');

    section
}

/// Generate the overall insights section.
fn generate_insights_section(payload: &AnalyticsPayload) -> String {
    let mut section = String::new();
    section.push_str("## Overall Insights\n\n");

    let visibility = payload.ai_visibility.clone().unwrap_or_default();
    let score = visibility.weighted_mentions_total.unwrap_or(0.0);
    let gauge = Gauge::new(score, DEFAULT_GAUGE_MAX);
    let tier = visibility.brand_tier.as_deref().unwrap_or("N/A");

    section.push_str(&format!(
        "- **AI Visibility:** {} {}\n",
        tier_emoji(tier),
        tier
    ));
    section.push_str(&format!(
        "- **Visibility Score:** {:.0} / {:.0} `{}` ({})\n",
        score,
        gauge.max,
        gauge.bar(20),
        gauge.zone
    ));

    if let Some(mentions) = &payload.brand_mentions {
        section.push_str(&format!(
            "- **Queries With Mentions:** {:.0}\n",
            mentions.queries_with_mentions.unwrap_or(0.0)
        ));
        section.push_str(&format!(
            "- **Sources Checked:** {:.0}\n",
            mentions.total_sources_checked.unwrap_or(0.0)
        ));
    }

    if let Some(breakdown) = &visibility.breakdown {
        section.push_str(&format!(
            "- **Mention Positions:** top two {:.0} · top five {:.0} · later {:.0}\n",
            breakdown.top_two_mentions.unwrap_or(0.0),
            breakdown.top_five_mentions.unwrap_or(0.0),
            breakdown.later_mentions.unwrap_or(0.0)
        ));
    }

    if let Some(table) = &payload.sources_and_content_impact {
        section.push_str(&generate_mention_line(&summarize_mentions(table)));
    }

    if let Some(sentiment) = &payload.sentiment {
        let dominant = sentiment.dominant_sentiment.as_deref().unwrap_or("Unknown");
        section.push_str(&format!("- **Dominant Sentiment:** {}\n", dominant));
        if let Some(summary) = &sentiment.summary {
            section.push_str(&format!("\n{}\n", summary));
        }
    }

    if let Some(explanation) = &visibility.explanation {
        section.push_str(&format!("\n*{}*\n", explanation));
    }
    section.push('\n');

    section
}

fn generate_mention_line(summary: &MentionSummary) -> String {
    match &summary.top_brand {
        Some(top) => format!(
            "- **Brand Mentions:** {} {} ({:.0} vs. {} at {:.0}, {:.0}%)\n",
            summary.tier.emoji(),
            summary.tier,
            summary.your_brand_total,
            top.brand,
            top.mentions,
            summary.ratio
        ),
        None => format!(
            "- **Brand Mentions:** {} {} (no mentions recorded)\n",
            summary.tier.emoji(),
            summary.tier
        ),
    }
}

fn generate_executive_summary_section(summary: &ExecutiveSummary) -> String {
    let mut section = String::new();
    section.push_str("## Executive Summary\n\n");

    if let Some(score) = &summary.brand_score_and_tier {
        section.push_str(&format!("{}\n\n", score));
    }

    push_list(&mut section, "Strengths", &summary.strengths);
    push_list(&mut section, "Weaknesses", &summary.weaknesses);

    if let Some(positioning) = &summary.competitor_positioning {
        section.push_str("### Competitor Positioning\n\n");
        push_positioned(&mut section, "Leaders", &positioning.leaders);
        push_positioned(&mut section, "Mid Tier", &positioning.mid_tier);
        push_positioned(&mut section, "Laggards", &positioning.laggards);
    }

    if !summary.prioritized_actions.is_empty() {
        section.push_str("### Prioritized Actions\n\n");
        for (i, action) in summary.prioritized_actions.iter().enumerate() {
            section.push_str(&format!("{}. {}\n", i + 1, action));
        }
        section.push('\n');
    }

    if let Some(conclusion) = &summary.conclusion {
        section.push_str(&format!("**Conclusion:** {}\n\n", conclusion));
    }

    section
}

fn push_list(section: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    section.push_str(&format!("### {}\n\n", title));
    for item in items {
        section.push_str(&format!("- {}\n", item));
    }
    section.push('\n');
}

fn push_positioned(section: &mut String, title: &str, brands: &[PositionedBrand]) {
    if brands.is_empty() {
        return;
    }
    section.push_str(&format!("**{}**\n\n", title));
    for brand in brands {
        section.push_str(&format!("- **{}**: {}\n", brand.name, brand.summary));
    }
    section.push('\n');
}

/// Render any header-plus-rows table.
fn generate_table_section(title: &str, table: &DataTable) -> String {
    if table.rows.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str(&format!("## {}\n\n", title));

    let header: Vec<String> = table.header.iter().map(cell_text).collect();
    let width = header
        .len()
        .max(table.rows.iter().map(Vec::len).max().unwrap_or(0));

    section.push_str(&table_row((0..width).map(|i| header.get(i).cloned().unwrap_or_default())));
    section.push_str(&table_row((0..width).map(|_| "---".to_string())));
    for row in &table.rows {
        section.push_str(&table_row(
            (0..width).map(|i| row.get(i).map(cell_text).unwrap_or_default()),
        ));
    }
    section.push('\n');

    section
}

fn generate_content_impact_section(table: &DataTable) -> String {
    let rows = source_rows(table);
    if rows.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Content Impact\n\n");

    let brands = rows[0].cells.iter().map(|cell| {
        if cell.is_your_brand {
            format!("**{}**", cell.brand)
        } else {
            cell.brand.clone()
        }
    });
    section.push_str(&table_row(std::iter::once("Platform".to_string()).chain(brands)));
    section.push_str(&table_row(
        std::iter::once("---".to_string()).chain(rows[0].cells.iter().map(|_| "---".to_string())),
    ));

    for row in &rows {
        let cells = row.cells.iter().map(|cell| {
            format!(
                "{:.0} {} {}",
                cell.mentions,
                cell.tier.emoji(),
                cell.tier
            )
        });
        section.push_str(&table_row(std::iter::once(row.source.clone()).chain(cells)));
    }
    section.push('\n');

    section
}

/// Generate the recommendations section.
fn generate_recommendations_section(recommendations: &[Recommendation]) -> String {
    let mut section = String::new();

    section.push_str("## Recommendations\n\n");
    section.push_str("| Insight | Suggested Action | Effort | Impact |\n");
    section.push_str("|---|---|---|---|\n");

    for rec in recommendations {
        let effort = rec.overall_effort.as_deref().unwrap_or("");
        let impact = rec.impact.as_deref().unwrap_or("");
        section.push_str(&table_row(
            [
                rec.overall_insight.clone().unwrap_or_default(),
                rec.suggested_action.clone().unwrap_or_default(),
                format!("{} {}", effort_emoji(effort), effort),
                format!("{} {}", tier_emoji(impact), impact),
            ]
            .into_iter(),
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report rendered by BrandPulse v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

fn table_row(cells: impl Iterator<Item = String>) -> String {
    let cells: Vec<String> = cells
        .map(|cell| cell.replace('|', "\\|").replace('\n', " "))
        .collect();
    format!("| {} |\n", cells.join(" | "))
}

/// Emoji for a backend tier label where higher is better.
fn tier_emoji(tier: &str) -> &'static str {
    match tier.trim().to_lowercase().as_str() {
        "high" => "🟢",
        "medium" => "🟡",
        "low" | "absent" => "🔴",
        _ => "⚪",
    }
}

/// Emoji for an effort label, where lower is better.
fn effort_emoji(effort: &str) -> &'static str {
    match effort.trim().to_lowercase().as_str() {
        "high" => "🔴",
        "medium" => "🟡",
        "low" => "🟢",
        _ => "⚪",
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    product_id: &'a str,
    stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    running_status: Option<String>,
    record: &'a AnalysisRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    mentions: Option<MentionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    visibility: Option<Gauge>,
}

/// Generate a JSON report.
pub fn generate_json_report(input: &ReportInput<'_>) -> Result<String> {
    let payload = input.record.payload();
    let report = JsonReport {
        product_id: input.product_id,
        stale: input.running.is_some(),
        running_status: input.running.map(|r| r.status().to_string()),
        record: input.record,
        mentions: payload
            .as_ref()
            .and_then(|p| p.sources_and_content_impact.as_ref())
            .map(summarize_mentions),
        visibility: payload
            .as_ref()
            .and_then(|p| p.ai_visibility.as_ref())
            .and_then(|v| v.weighted_mentions_total)
            .map(|score| Gauge::new(score, DEFAULT_GAUGE_MAX)),
    };
    serde_json::to_string_pretty(&report).map_err(Into::into)
}

/// Write a rendered report to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
