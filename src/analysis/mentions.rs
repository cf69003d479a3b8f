//! Brand mention aggregation over the source × brand matrix.
//!
//! The content impact table has one row per source. After the leading source
//! column, each brand occupies a group of [`BRAND_GROUP_WIDTH`] columns whose
//! header cell is the brand name and whose second cell holds the mention count.
//! The last group is always the brand the report was generated for.

use crate::models::{cell_text, DataTable};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Columns occupied by each brand in the matrix.
pub const BRAND_GROUP_WIDTH: usize = 3;

/// Offset of the mention count within a brand's column group.
const MENTIONS_OFFSET: usize = 1;

/// Coarse classification of a mention ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MentionTier {
    Low,
    Medium,
    High,
}

impl MentionTier {
    /// Classify a ratio expressed as a percentage.
    pub fn from_ratio(percent: f64) -> Self {
        if percent >= 70.0 {
            MentionTier::High
        } else if percent >= 40.0 {
            MentionTier::Medium
        } else {
            MentionTier::Low
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MentionTier::High => "🟢",
            MentionTier::Medium => "🟡",
            MentionTier::Low => "🔴",
        }
    }
}

impl fmt::Display for MentionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MentionTier::Low => write!(f, "Low"),
            MentionTier::Medium => write!(f, "Medium"),
            MentionTier::High => write!(f, "High"),
        }
    }
}

/// Total mentions of one brand across every source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandTotal {
    pub brand: String,
    pub mentions: f64,
}

/// Headline mention figures for a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MentionSummary {
    /// Per-brand totals in column order.
    pub totals: Vec<BrandTotal>,
    /// Brand with the most mentions; the first seen wins a tie.
    pub top_brand: Option<BrandTotal>,
    pub your_brand_total: f64,
    /// `your_brand_total` as a percentage of the top brand's total.
    pub ratio: f64,
    pub tier: MentionTier,
}

/// One brand's cell in a source row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandCell {
    pub brand: String,
    pub mentions: f64,
    pub tier: MentionTier,
    pub is_your_brand: bool,
}

/// Mentions for one source, each brand tiered against the row's leader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    pub source: String,
    pub cells: Vec<BrandCell>,
}

/// Brand names from the matrix header, in column order.
pub fn brand_names(table: &DataTable) -> Vec<String> {
    let end = table.header.len().saturating_sub(2);
    (1..end)
        .step_by(BRAND_GROUP_WIDTH)
        .map(|i| cell_text(&table.header[i]))
        .collect()
}

fn mention_count(row: &[Value], brand_index: usize) -> f64 {
    let column = 1 + brand_index * BRAND_GROUP_WIDTH + MENTIONS_OFFSET;
    match row.get(column) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Sum each brand's mentions across all rows.
pub fn brand_totals(table: &DataTable) -> Vec<BrandTotal> {
    brand_names(table)
        .into_iter()
        .enumerate()
        .map(|(index, brand)| BrandTotal {
            mentions: table.rows.iter().map(|row| mention_count(row, index)).sum(),
            brand,
        })
        .collect()
}

/// Compute the top brand, the report brand's total, and its tier.
pub fn summarize_mentions(table: &DataTable) -> MentionSummary {
    let totals = brand_totals(table);

    let mut top_brand: Option<&BrandTotal> = None;
    for total in &totals {
        let best = top_brand.map_or(0.0, |t| t.mentions);
        if total.mentions > best {
            top_brand = Some(total);
        }
    }
    let top_brand = top_brand.cloned();

    let your_brand_total = totals.last().map_or(0.0, |t| t.mentions);
    let top_total = top_brand.as_ref().map_or(0.0, |t| t.mentions);
    let ratio = if top_total > 0.0 {
        your_brand_total * 100.0 / top_total
    } else {
        0.0
    };

    MentionSummary {
        totals,
        top_brand,
        your_brand_total,
        ratio,
        tier: MentionTier::from_ratio(ratio),
    }
}

/// Tier every brand within each source row against that row's maximum.
pub fn source_rows(table: &DataTable) -> Vec<SourceRow> {
    let brands = brand_names(table);
    let last = brands.len().saturating_sub(1);

    table
        .rows
        .iter()
        .map(|row| {
            let counts: Vec<f64> = (0..brands.len()).map(|i| mention_count(row, i)).collect();
            let max = counts.iter().copied().fold(0.0, f64::max);

            let cells = brands
                .iter()
                .zip(counts)
                .enumerate()
                .map(|(i, (brand, mentions))| {
                    let ratio = if max > 0.0 { mentions * 100.0 / max } else { 0.0 };
                    BrandCell {
                        brand: brand.clone(),
                        mentions,
                        tier: MentionTier::from_ratio(ratio),
                        is_your_brand: i == last,
                    }
                })
                .collect();

            SourceRow {
                source: row.first().map(cell_text).unwrap_or_default(),
                cells,
            }
        })
        .collect()
}
