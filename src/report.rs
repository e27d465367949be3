//! Line-oriented rendering of the Markdown report.
//!
//! Only the handful of constructs the auditor prompt asks for are recognised;
//! everything else is a paragraph.

use std::fmt::Write as _;

pub const NO_RESULT_NOTICE: &str = "No analysis result.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    Heading(String),
    Subheading(String),
    Emphasis(String),
    Bullet(String),
    Paragraph(String),
}

impl ReportLine {
    /// Classify a single line. `###` is tested before `##`.
    pub fn classify(line: &str) -> Self {
        if let Some(rest) = line.strip_prefix("###") {
            Self::Subheading(rest.trim_start().to_string())
        } else if let Some(rest) = line.strip_prefix("##") {
            Self::Heading(rest.trim_start().to_string())
        } else if line.starts_with("**") {
            Self::Emphasis(line.replace("**", ""))
        } else if let Some(rest) = line.strip_prefix("- ") {
            Self::Bullet(rest.to_string())
        } else {
            Self::Paragraph(line.to_string())
        }
    }
}

pub fn parse(markdown: &str) -> Vec<ReportLine> {
    markdown.lines().map(ReportLine::classify).collect()
}

/// Plain-text rendering for a terminal.
pub fn render_plain(lines: &[ReportLine]) -> String {
    if lines.iter().all(|l| matches!(l, ReportLine::Paragraph(p) if p.trim().is_empty())) {
        return format!("{}\n", NO_RESULT_NOTICE);
    }

    let mut out = String::new();
    for line in lines {
        // writing to a String cannot fail
        let _ = match line {
            ReportLine::Heading(text) => {
                writeln!(out, "\n{}\n{}", text, "=".repeat(text.chars().count().max(1)))
            }
            ReportLine::Subheading(text) => {
                writeln!(out, "\n{}\n{}", text, "-".repeat(text.chars().count().max(1)))
            }
            ReportLine::Emphasis(text) => writeln!(out, "\n{}", text.to_uppercase()),
            ReportLine::Bullet(text) => writeln!(out, "  • {}", text),
            ReportLine::Paragraph(text) => writeln!(out, "{}", text),
        };
    }
    out
}
