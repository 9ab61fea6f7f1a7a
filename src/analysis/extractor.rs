//! Recommendation extraction from free-form appraisal text.
//!
//! Matching is line-based and first-match: the first line mentioning any
//! verdict keyword decides, and the first line mentioning a total value or
//! estimate becomes the value snippet. Keywords match as substrings, so
//! words like "BUYER" count as BUY.

use crate::models::Recommendation;
use serde::{Deserialize, Serialize};

/// Any of these on a line makes it the verdict line.
const VERDICT_KEYWORDS: [&str; 6] = [
    "RECOMMENDATION",
    "STRONG BUY",
    "STRONG PASS",
    "BUY",
    "PASS",
    "MAYBE",
];

/// Snippet used when no value line is found.
pub const UNKNOWN_VALUE: &str = "Unknown";

/// Structured result of parsing one appraisal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub recommendation: Recommendation,
    pub estimated_value: String,
}

/// Extract the verdict and value snippet. Never fails.
pub fn extract(text: &str) -> Extraction {
    Extraction {
        recommendation: extract_recommendation(text),
        estimated_value: extract_estimated_value(text),
    }
}

/// Verdict from the first line carrying any verdict keyword.
pub fn extract_recommendation(text: &str) -> Recommendation {
    for line in text.lines() {
        let upper = line.to_uppercase();
        if !VERDICT_KEYWORDS.iter().any(|kw| upper.contains(kw)) {
            continue;
        }
        return classify_line(&upper);
    }
    Recommendation::Unknown
}

/// PASS wins over BUY on the same line; a bare "RECOMMENDATION" is unknown.
fn classify_line(upper: &str) -> Recommendation {
    if upper.contains("STRONG BUY") {
        Recommendation::StrongBuy
    } else if upper.contains("STRONG PASS") {
        Recommendation::StrongPass
    } else if upper.contains("BUY") && !upper.contains("PASS") {
        Recommendation::Buy
    } else if upper.contains("PASS") {
        Recommendation::Pass
    } else if upper.contains("MAYBE") {
        Recommendation::Maybe
    } else {
        Recommendation::Unknown
    }
}

/// First line mentioning a total value or estimate, trimmed.
pub fn extract_estimated_value(text: &str) -> String {
    text.lines()
        .find(|line| {
            let upper = line.to_uppercase();
            upper.contains("TOTAL") && (upper.contains("VALUE") || upper.contains("ESTIMATE"))
        })
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| UNKNOWN_VALUE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_keywords() {
        let extraction = extract("Nice cards.\nSome wear on the corners.");
        assert_eq!(extraction.recommendation, Recommendation::Unknown);
        assert_eq!(extraction.estimated_value, "Unknown");
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(
            extract(""),
            Extraction {
                recommendation: Recommendation::Unknown,
                estimated_value: UNKNOWN_VALUE.to_string(),
            }
        );
    }

    #[test]
    fn test_strong_buy_first_line_wins() {
        let text = "**STRONG BUY**: $140 profit expected\nOtherwise I would PASS on the bulk.";
        assert_eq!(extract_recommendation(text), Recommendation::StrongBuy);
    }

    #[test]
    fn test_earlier_pass_line_wins() {
        let text = "PASS: $5 profit expected\nA STRONG BUY only if under $10.";
        assert_eq!(extract_recommendation(text), Recommendation::Pass);
    }

    #[test]
    fn test_pass_overrides_buy_on_same_line() {
        assert_eq!(
            extract_recommendation("Do not BUY this, PASS."),
            Recommendation::Pass
        );
    }

    #[test]
    fn test_strong_buy_over_strong_pass_on_same_line() {
        assert_eq!(
            extract_recommendation("STRONG BUY or STRONG PASS? strong buy."),
            Recommendation::StrongBuy
        );
    }

    #[test]
    fn test_case_insensitive_keywords() {
        assert_eq!(extract_recommendation("maybe: $30"), Recommendation::Maybe);
        assert_eq!(
            extract_recommendation("strong pass - obvious reprints"),
            Recommendation::StrongPass
        );
        assert_eq!(extract_recommendation("Buy: $60 profit"), Recommendation::Buy);
    }

    #[test]
    fn test_bare_recommendation_line_stops_scan() {
        let text = "4. RECOMMENDATION (see below)\nSTRONG BUY: $120 profit expected";
        assert_eq!(extract_recommendation(text), Recommendation::Unknown);
    }

    #[test]
    fn test_substring_match_is_kept() {
        // "BUYERS" contains BUY.
        assert_eq!(
            extract_recommendation("Few buyers for this set."),
            Recommendation::Buy
        );
    }

    #[test]
    fn test_value_snippet_first_match_trimmed() {
        let text = "STRONG BUY\n   Total Estimated Value: $450  \nTOTAL VALUE: $999";
        assert_eq!(extract_estimated_value(text), "Total Estimated Value: $450");
    }

    #[test]
    fn test_value_requires_total_and_value_or_estimate() {
        assert_eq!(extract_estimated_value("Value: $40\nTotal: $50"), UNKNOWN_VALUE);
        assert_eq!(
            extract_estimated_value("total estimate around $80"),
            "total estimate around $80"
        );
    }

    #[test]
    fn test_value_pass_independent_of_verdict_line() {
        let text = "Total value: $200 (RECOMMENDATION below)\nBUY";
        let extraction = extract(text);
        assert_eq!(extraction.recommendation, Recommendation::Unknown);
        assert_eq!(extraction.estimated_value, "Total value: $200 (RECOMMENDATION below)");
    }

    #[test]
    fn test_deterministic() {
        let text = "[BUY]: $70 profit expected\nTotal value ~ $300";
        assert_eq!(extract(text), extract(text));
    }
}
