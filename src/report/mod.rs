//! Digest rendering.
//!
//! Renders the ranked digest as Markdown, HTML or JSON. Delivery (email,
//! chat) is left to the caller.

pub mod generator;
pub mod html;

pub use generator::{generate_json_report, generate_markdown_report, ReportOptions};
pub use html::generate_html_report;

#[cfg(test)]
pub(crate) fn test_digest() -> crate::models::Digest {
    use crate::models::{Digest, DigestSummary, RankedEntry, Recommendation, UsageReport};
    use chrono::{TimeZone, Utc};

    let entry = |title: &str, recommendation: Recommendation, analysis: &str| RankedEntry {
        title: title.to_string(),
        price: 24.99,
        url: format!("https://example.com/item/{}", title),
        recommendation,
        estimated_value: "Total Estimated Value: $300".to_string(),
        score: recommendation.score(),
        analysis: analysis.to_string(),
        model_used: "gemini-2.0-flash".to_string(),
    };

    Digest {
        generated_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        summary: DigestSummary {
            items_total: 3,
            evaluated: 2,
            strong_buy: 1,
            pass: 1,
            no_images: 1,
            ..DigestSummary::default()
        },
        usage: UsageReport {
            counts: [(0, 1), (1, 1)].into_iter().collect(),
            per_key_limit: 40,
        },
        entries: vec![
            entry("Binder", Recommendation::StrongBuy, "STRONG BUY: $150 profit"),
            entry("Shoebox", Recommendation::Pass, "PASS: bulk only"),
        ],
    }
}
