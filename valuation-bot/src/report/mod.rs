//! Report assembly.
//!
//! A report is a list of lines: a title, a date line, a blank line, the
//! body, and a footer. How the lines are joined is chosen per variant
//! because DingTalk markdown collapses single newlines:
//!
//! - [`JoinPolicy::ParagraphBreak`] joins with a blank line between lines.
//! - [`JoinPolicy::HardLineBreak`] joins with single newlines, and content
//!   lines end in two spaces (a markdown hard break).

pub mod formatter;
pub mod indicator;

pub use formatter::ValuationFormatter;
pub use indicator::IndicatorFormatter;

use crate::valuation::TierBands;

/// How report lines are joined into the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    ParagraphBreak,
    HardLineBreak,
}

impl JoinPolicy {
    pub fn separator(&self) -> &'static str {
        match self {
            Self::ParagraphBreak => "\n\n",
            Self::HardLineBreak => "\n",
        }
    }

    /// Terminate a content line for this policy.
    pub fn content_line(&self, line: String) -> String {
        match self {
            Self::ParagraphBreak => line,
            Self::HardLineBreak => line + "  ",
        }
    }
}

/// One assembled report. Built once per run and only rendered afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    title_line: String,
    date_line: String,
    body_lines: Vec<String>,
    footer_lines: Vec<String>,
    join: JoinPolicy,
}

impl Report {
    pub fn new(
        title_line: impl Into<String>,
        date_line: impl Into<String>,
        body_lines: Vec<String>,
        footer_lines: Vec<String>,
        join: JoinPolicy,
    ) -> Self {
        Self {
            title_line: title_line.into(),
            date_line: date_line.into(),
            body_lines,
            footer_lines,
            join,
        }
    }

    pub fn title_line(&self) -> &str {
        &self.title_line
    }

    pub fn date_line(&self) -> &str {
        &self.date_line
    }

    pub fn body_lines(&self) -> &[String] {
        &self.body_lines
    }

    pub fn footer_lines(&self) -> &[String] {
        &self.footer_lines
    }

    /// Message text.
    pub fn render(&self) -> String {
        let header = [self.title_line.as_str(), self.date_line.as_str(), ""];
        header
            .into_iter()
            .chain(self.body_lines.iter().map(String::as_str))
            .chain(self.footer_lines.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(self.join.separator())
    }
}

/// `📅 **日期**: 2024-12-20`
pub(crate) fn date_line(date: chrono::NaiveDate) -> String {
    format!("📅 **日期**: {}", date)
}

/// The valuation legend, generated from the bands in use.
pub fn valuation_legend(bands: &TierBands, join: JoinPolicy) -> Vec<String> {
    let mut lines: Vec<String> = [
        "",
        "---",
        "",
        "💡 **估值说明**",
        "",
        "百分位越低表示估值越便宜：",
        "",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    lines.extend(bands.ranges().iter().map(|(lower, upper, tier)| {
        join.content_line(format!(
            "{} **{}-{}%**: {}",
            tier.emoji(),
            lower,
            upper,
            tier.zone()
        ))
    }));

    lines
}
