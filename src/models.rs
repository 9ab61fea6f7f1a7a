//! Data models for listing triage.
//!
//! This module contains the core data structures shared by the rotator,
//! dispatcher, aggregator and report renderers.

use crate::error::FailureRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of trailing key characters kept when a credential is shown.
const KEY_SUFFIX_LEN: usize = 4;

/// A candidate auction listing, as supplied by the search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingItem {
    /// Auction-site identifier, also the image folder name.
    #[serde(alias = "itemId", deserialize_with = "deserialize_item_id")]
    pub item_id: String,
    /// Listing title.
    #[serde(default = "default_title")]
    pub title: String,
    /// Current listing price in dollars.
    #[serde(default)]
    pub price: f64,
    /// Public URL of the listing.
    #[serde(default)]
    pub item_url: String,
}

/// Search results carry numeric ids; manifests written by hand use strings.
fn deserialize_item_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

fn default_title() -> String {
    "No title".to_string()
}

/// One already-downloaded, already-resized image.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageHandle {
    /// File name, used for logging only.
    pub name: String,
    /// MIME type sent alongside the bytes.
    pub mime_type: String,
    /// Raw encoded image bytes.
    pub data: Vec<u8>,
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Appraisal verdict extracted from model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Maybe,
    Pass,
    StrongPass,
    Unknown,
}

impl Recommendation {
    /// Ranking score, higher is better.
    pub fn score(&self) -> u8 {
        match self {
            Recommendation::StrongBuy => 5,
            Recommendation::Buy => 4,
            Recommendation::Maybe => 3,
            Recommendation::Pass => 2,
            Recommendation::StrongPass => 1,
            Recommendation::Unknown => 0,
        }
    }

    /// CSS class used by the HTML digest.
    pub fn css_class(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "strong-buy",
            Recommendation::Buy => "buy",
            Recommendation::Maybe => "maybe",
            Recommendation::Pass => "pass",
            Recommendation::StrongPass => "strong-pass",
            Recommendation::Unknown => "unknown",
        }
    }

    /// Returns an emoji representation of the recommendation.
    pub fn emoji(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "🟢",
            Recommendation::Buy => "🔵",
            Recommendation::Maybe => "🟡",
            Recommendation::Pass => "🔴",
            Recommendation::StrongPass => "⚫",
            Recommendation::Unknown => "⚪",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::StrongBuy => write!(f, "STRONG BUY"),
            Recommendation::Buy => write!(f, "BUY"),
            Recommendation::Maybe => write!(f, "MAYBE"),
            Recommendation::Pass => write!(f, "PASS"),
            Recommendation::StrongPass => write!(f, "STRONG PASS"),
            Recommendation::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Result of one successful appraisal call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEvaluation {
    pub title: String,
    pub listing_price: f64,
    pub item_url: String,
    /// Number of images actually submitted (after truncation).
    pub total_images: usize,
    /// Model output, verbatim.
    pub full_analysis: String,
    /// Redacted suffix of the API key used.
    pub api_key_used: String,
    pub model_used: String,
}

/// Keep only a short suffix of an API key.
pub fn redact_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let start = chars.len().saturating_sub(KEY_SUFFIX_LEN);
    let suffix: String = chars[start..].iter().collect();
    format!("...{}", suffix)
}

/// What happened when an item was dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Evaluated(ItemEvaluation),
    Failed(FailureRecord),
}

impl DispatchOutcome {
    pub fn evaluation(&self) -> Option<&ItemEvaluation> {
        match self {
            DispatchOutcome::Evaluated(evaluation) => Some(evaluation),
            DispatchOutcome::Failed(_) => None,
        }
    }

    /// Whether the dispatch reached the provider and spent a rotation slot.
    pub fn spent_slot(&self) -> bool {
        match self {
            DispatchOutcome::Evaluated(_) => true,
            DispatchOutcome::Failed(failure) => matches!(
                failure,
                FailureRecord::RateLimited { .. } | FailureRecord::Provider { .. }
            ),
        }
    }

    pub fn failure(&self) -> Option<&FailureRecord> {
        match self {
            DispatchOutcome::Evaluated(_) => None,
            DispatchOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Per-item record persisted by the caller after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item: ListingItem,
    /// Images the image source returned, before truncation.
    pub images_found: usize,
    pub outcome: DispatchOutcome,
}

/// Snapshot of per-key request counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    /// Key index to number of slots spent.
    pub counts: BTreeMap<usize, u64>,
    /// Configured per-key estimate. Reporting only, never enforced.
    pub per_key_limit: u64,
}

impl UsageReport {
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Estimated capacity across all keys.
    pub fn capacity(&self) -> u64 {
        self.counts.len() as u64 * self.per_key_limit
    }
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Requests: {}/{}", self.total(), self.capacity())?;
        for (index, count) in &self.counts {
            writeln!(f, "  API Key {}: {}/{}", index + 1, count, self.per_key_limit)?;
        }
        Ok(())
    }
}

/// An evaluation with its extracted verdict and score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub title: String,
    pub price: f64,
    pub url: String,
    pub recommendation: Recommendation,
    pub estimated_value: String,
    pub score: u8,
    pub analysis: String,
    pub model_used: String,
}

/// Counts by recommendation and by failure kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSummary {
    pub items_total: usize,
    pub evaluated: usize,
    pub strong_buy: usize,
    pub buy: usize,
    pub maybe: usize,
    pub pass: usize,
    pub strong_pass: usize,
    pub unknown: usize,
    pub no_images: usize,
    pub rate_limited: usize,
    pub provider_errors: usize,
    pub skipped: usize,
}

impl DigestSummary {
    /// Creates a summary from per-item outcomes and their ranked entries.
    pub fn from_outcomes(outcomes: &[ItemOutcome], entries: &[RankedEntry]) -> Self {
        let mut summary = Self {
            items_total: outcomes.len(),
            evaluated: entries.len(),
            ..Self::default()
        };

        for entry in entries {
            match entry.recommendation {
                Recommendation::StrongBuy => summary.strong_buy += 1,
                Recommendation::Buy => summary.buy += 1,
                Recommendation::Maybe => summary.maybe += 1,
                Recommendation::Pass => summary.pass += 1,
                Recommendation::StrongPass => summary.strong_pass += 1,
                Recommendation::Unknown => summary.unknown += 1,
            }
        }

        for failure in outcomes.iter().filter_map(|o| o.outcome.failure()) {
            match failure {
                FailureRecord::NoImages { .. } => summary.no_images += 1,
                FailureRecord::RateLimited { .. } => summary.rate_limited += 1,
                FailureRecord::Provider { .. } => summary.provider_errors += 1,
                FailureRecord::Skipped { .. } => summary.skipped += 1,
            }
        }

        summary
    }

    pub fn failed(&self) -> usize {
        self.no_images + self.rate_limited + self.provider_errors + self.skipped
    }
}

/// The ranked digest handed to the report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    pub generated_at: DateTime<Utc>,
    pub summary: DigestSummary,
    pub usage: UsageReport,
    /// Ranked best first.
    pub entries: Vec<RankedEntry>,
}
