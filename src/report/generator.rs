//! Markdown and JSON digest generation.
//!
//! This module renders the ranked digest into a human-readable
//! Markdown document, or serializes it as JSON.

use crate::analysis::{model_distribution, top_picks};
use crate::config::ReportConfig;
use crate::models::{Digest, DigestSummary, RankedEntry, Recommendation, UsageReport};
use anyhow::Result;

/// Rendering options shared by all digest formats.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Characters of each analysis shown as key points.
    pub excerpt_chars: usize,
    /// Include the analysis excerpt for each entry.
    pub include_analysis: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            excerpt_chars: 500,
            include_analysis: true,
        }
    }
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            excerpt_chars: config.excerpt_chars,
            include_analysis: config.include_analysis,
        }
    }
}

/// Digest subject line, e.g. for an email.
pub fn digest_title(digest: &Digest) -> String {
    format!(
        "Auction Triage - {} Items - {}",
        digest.entries.len(),
        digest.generated_at.format("%Y-%m-%d")
    )
}

/// Generate a complete Markdown digest.
pub fn generate_markdown_report(digest: &Digest, options: &ReportOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", digest_title(digest)));
    output.push_str(&format!(
        "*Generated {}*\n\n",
        digest.generated_at.format("%B %d, %Y %H:%M UTC")
    ));

    output.push_str(&generate_summary_section(&digest.summary, &digest.entries));
    output.push_str(&generate_usage_section(&digest.usage));
    output.push_str(&generate_entries_section(&digest.entries, options));
    output.push_str(&generate_footer());

    output
}

/// Generate the summary section.
fn generate_summary_section(summary: &DigestSummary, entries: &[RankedEntry]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!("- **Items Processed:** {}\n", summary.items_total));
    section.push_str(&format!("- **Items Analyzed:** {}\n", summary.evaluated));
    if summary.failed() > 0 {
        section.push_str(&format!(
            "- **Failed:** {} (no images: {}, rate limited: {}, errors: {}, skipped: {})\n",
            summary.failed(),
            summary.no_images,
            summary.rate_limited,
            summary.provider_errors,
            summary.skipped
        ));
    }
    section.push_str(&format!("- **Top Picks:** {}\n\n", top_picks(entries).len()));

    section.push_str("| Recommendation | Count |\n");
    section.push_str("|:---|:---:|\n");
    for (rec, count) in [
        (Recommendation::StrongBuy, summary.strong_buy),
        (Recommendation::Buy, summary.buy),
        (Recommendation::Maybe, summary.maybe),
        (Recommendation::Pass, summary.pass),
        (Recommendation::StrongPass, summary.strong_pass),
        (Recommendation::Unknown, summary.unknown),
    ] {
        section.push_str(&format!("| {} {} | {} |\n", rec.emoji(), rec, count));
    }
    section.push('\n');

    let models = model_distribution(entries);
    if !models.is_empty() {
        let mut models: Vec<_> = models.into_iter().collect();
        models.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        section.push_str("| Model | Evaluations |\n");
        section.push_str("|:---|:---:|\n");
        for (model, count) in models {
            section.push_str(&format!("| `{}` | {} |\n", model, count));
        }
        section.push('\n');
    }

    section
}

/// Generate the API usage section.
fn generate_usage_section(usage: &UsageReport) -> String {
    let mut section = String::new();

    section.push_str("## API Usage\n\n");
    section.push_str("```\n");
    section.push_str(&usage.to_string());
    section.push_str("```\n\n");
    section.push_str("*Per-key limits are configured estimates, not provider quotas.*\n\n");

    section
}

/// Generate the ranked recommendations section.
fn generate_entries_section(entries: &[RankedEntry], options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("## Recommendations\n\n");

    if entries.is_empty() {
        section.push_str("No items were analyzed successfully.\n\n");
        return section;
    }

    for (i, entry) in entries.iter().enumerate() {
        section.push_str(&generate_entry_block(i + 1, entry, options));
    }

    section
}

/// Generate a single ranked entry block.
fn generate_entry_block(rank: usize, entry: &RankedEntry, options: &ReportOptions) -> String {
    let mut block = String::new();

    block.push_str(&format!("### #{}. {}\n\n", rank, entry.title));
    block.push_str(&format!(
        "**Price:** ${} | **Recommendation:** {} {}\n\n",
        entry.price,
        entry.recommendation.emoji(),
        entry.recommendation
    ));
    block.push_str(&format!("**{}**\n\n", entry.estimated_value));

    if !entry.url.is_empty() {
        block.push_str(&format!("[View Listing]({})\n\n", entry.url));
    }

    if options.include_analysis {
        block.push_str("<details>\n<summary>Key Analysis</summary>\n\n");
        block.push_str(&excerpt(&entry.analysis, options.excerpt_chars));
        block.push_str("\n</details>\n\n");
    }

    block.push_str("---\n\n");

    block
}

/// First `max_chars` characters, with an ellipsis when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("*Appraisals are AI-generated estimates. Verify before bidding.*\n");

    footer
}

/// Generate a JSON digest.
pub fn generate_json_report(digest: &Digest) -> Result<String> {
    serde_json::to_string_pretty(digest).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_digest as create_test_digest;

    #[test]
    fn test_generate_markdown_report() {
        let digest = create_test_digest();
        let markdown = generate_markdown_report(&digest, &ReportOptions::default());

        assert!(markdown.contains("# Auction Triage - 2 Items - 2026-03-14"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("- **Items Analyzed:** 2"));
        assert!(markdown.contains("no images: 1"));
        assert!(markdown.contains("Total Requests: 2/80"));
        assert!(markdown.contains("### #1. Binder"));
        assert!(markdown.contains("### #2. Shoebox"));
        assert!(markdown.contains("**Price:** $24.99"));
        assert!(markdown.contains("| `gemini-2.0-flash` | 2 |"));
    }

    #[test]
    fn test_analysis_can_be_omitted() {
        let digest = create_test_digest();
        let options = ReportOptions {
            include_analysis: false,
            ..ReportOptions::default()
        };
        let markdown = generate_markdown_report(&digest, &options);
        assert!(!markdown.contains("Key Analysis"));
    }

    #[test]
    fn test_empty_digest() {
        let mut digest = create_test_digest();
        digest.entries.clear();
        let markdown = generate_markdown_report(&digest, &ReportOptions::default());
        assert!(markdown.contains("No items were analyzed successfully."));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("ééééé", 2), "éé...");
    }

    #[test]
    fn test_generate_json_report() {
        let digest = create_test_digest();
        let json = generate_json_report(&digest).unwrap();

        assert!(json.contains("\"entries\""));
        assert!(json.contains("\"usage\""));
        assert!(json.contains("\"STRONG_BUY\""));
    }
}
