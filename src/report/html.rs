//! HTML digest generation, suitable as an email body.

use crate::models::{Digest, RankedEntry};
use crate::report::generator::{digest_title, excerpt, ReportOptions};

const STYLE: &str = r#"body { font-family: Arial, sans-serif; }
.strong-buy { background-color: #d4edda; border-left: 4px solid #28a745; }
.buy { background-color: #d1ecf1; border-left: 4px solid #17a2b8; }
.maybe { background-color: #fff3cd; border-left: 4px solid #ffc107; }
.pass { background-color: #f8d7da; border-left: 4px solid #dc3545; }
.strong-pass { background-color: #e2e3e5; border-left: 4px solid #6c757d; }
.unknown { background-color: #ffffff; border-left: 4px solid #adb5bd; }
.item { margin: 20px 0; padding: 15px; border-radius: 5px; }
.header { background-color: #007bff; color: white; padding: 20px; text-align: center; }
.stats { background-color: #f8f9fa; padding: 15px; margin: 20px 0; }"#;

/// Generate a complete HTML digest.
pub fn generate_html_report(digest: &Digest, options: &ReportOptions) -> String {
    let mut html = String::new();

    html.push_str("<html>\n<head>\n");
    html.push_str(&format!("<title>{}</title>\n", escape(&digest_title(digest))));
    html.push_str(&format!("<style>\n{}\n</style>\n", STYLE));
    html.push_str("</head>\n<body>\n");

    html.push_str(&format!(
        "<div class=\"header\"><h1>Daily Auction Triage</h1><p>{}</p></div>\n",
        digest.generated_at.format("%B %d, %Y")
    ));

    html.push_str("<div class=\"stats\">\n<h2>Summary</h2>\n");
    html.push_str(&format!(
        "<p><strong>Items Analyzed:</strong> {}</p>\n",
        digest.summary.evaluated
    ));
    if digest.summary.failed() > 0 {
        html.push_str(&format!(
            "<p><strong>Failed:</strong> {}</p>\n",
            digest.summary.failed()
        ));
    }
    html.push_str(&format!(
        "<p>{}</p>\n</div>\n",
        escape(&digest.usage.to_string()).trim_end().replace('\n', "<br>")
    ));

    html.push_str("<h2>Recommendations</h2>\n");
    for (i, entry) in digest.entries.iter().enumerate() {
        html.push_str(&generate_entry_block(i + 1, entry, options));
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn generate_entry_block(rank: usize, entry: &RankedEntry, options: &ReportOptions) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "<div class=\"item {}\">\n",
        entry.recommendation.css_class()
    ));
    block.push_str(&format!("<h3>#{}. {}</h3>\n", rank, escape(&entry.title)));
    block.push_str(&format!(
        "<p><strong>Price:</strong> ${} | <strong>Recommendation:</strong> {}</p>\n",
        entry.price, entry.recommendation
    ));
    block.push_str(&format!(
        "<p><strong>{}</strong></p>\n",
        escape(&entry.estimated_value)
    ));
    if !entry.url.is_empty() {
        block.push_str(&format!(
            "<p><a href=\"{}\">View Listing &rarr;</a></p>\n",
            escape(&entry.url)
        ));
    }
    if options.include_analysis {
        let key_points = escape(&excerpt(&entry.analysis, options.excerpt_chars)).replace('\n', "<br>");
        block.push_str(&format!(
            "<details><summary>Key Analysis</summary><p>{}</p></details>\n",
            key_points
        ));
    }
    block.push_str("</div>\n");

    block
}

/// Escape text for HTML bodies and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
