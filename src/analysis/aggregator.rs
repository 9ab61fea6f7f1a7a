//! Ranking and digest assembly.
//!
//! Successful evaluations are scored by their extracted recommendation and
//! stably sorted best-first; failed items never reach the ranking.

use crate::analysis::extractor::extract;
use crate::models::{
    Digest, DigestSummary, ItemEvaluation, ItemOutcome, RankedEntry, Recommendation, UsageReport,
};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Score a single evaluation.
pub fn rank_evaluation(evaluation: &ItemEvaluation) -> RankedEntry {
    let extraction = extract(&evaluation.full_analysis);

    RankedEntry {
        title: evaluation.title.clone(),
        price: evaluation.listing_price,
        url: evaluation.item_url.clone(),
        recommendation: extraction.recommendation,
        estimated_value: extraction.estimated_value,
        score: extraction.recommendation.score(),
        analysis: evaluation.full_analysis.clone(),
        model_used: evaluation.model_used.clone(),
    }
}

/// Rank evaluated outcomes, best first. Equal scores keep arrival order.
pub fn rank(outcomes: &[ItemOutcome]) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = outcomes
        .iter()
        .filter_map(|o| o.outcome.evaluation())
        .map(rank_evaluation)
        .collect();

    // sort_by_key is stable
    ranked.sort_by_key(|entry| Reverse(entry.score));
    ranked
}

/// Build the digest consumed by the report renderer.
pub fn build_digest(
    outcomes: &[ItemOutcome],
    usage: UsageReport,
    generated_at: DateTime<Utc>,
) -> Digest {
    let entries = rank(outcomes);
    let summary = DigestSummary::from_outcomes(outcomes, &entries);

    Digest {
        generated_at,
        summary,
        usage,
        entries,
    }
}

/// Entries worth acting on (BUY or better).
pub fn top_picks(entries: &[RankedEntry]) -> Vec<&RankedEntry> {
    entries
        .iter()
        .filter(|e| e.score >= Recommendation::Buy.score())
        .collect()
}

/// Evaluations per model, for the digest statistics.
pub fn model_distribution(entries: &[RankedEntry]) -> HashMap<String, usize> {
    let mut dist: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        *dist.entry(entry.model_used.clone()).or_default() += 1;
    }

    dist
}
