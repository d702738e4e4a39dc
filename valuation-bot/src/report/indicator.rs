//! Macro indicator report formatter.

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{date_line, JoinPolicy, Report};
use crate::data::{IndicatorEntry, IndicatorOutcome, IndicatorSnapshot, IndicatorValue};

const HEADING: &str = "📊 **股票指标数据播报**";
const FAILURE_SENTENCE: &str = "📊 股票指标数据获取失败";

/// Formats an indicator snapshot into report text.
pub struct IndicatorFormatter<'a> {
    notes: &'a [String],
}

impl<'a> IndicatorFormatter<'a> {
    /// `notes` are the explanation lines of the footer.
    pub fn new(notes: &'a [String]) -> Self {
        Self { notes }
    }

    pub fn format(&self, snapshot: Option<&IndicatorSnapshot>, date: NaiveDate) -> String {
        let message = match snapshot {
            Some(snapshot) if !snapshot.entries().is_empty() => self.build(snapshot, date).render(),
            _ => {
                warn!("Indicator data is empty");
                FAILURE_SENTENCE.to_string()
            }
        };
        debug!(message = %message, "Final message");
        message
    }

    pub fn build(&self, snapshot: &IndicatorSnapshot, date: NaiveDate) -> Report {
        let body_lines = snapshot.entries().iter().flat_map(section_lines).collect();

        let mut footer_lines: Vec<String> = ["---", "", "💡 **数据说明**", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        footer_lines.extend(self.notes.iter().cloned());

        Report::new(
            HEADING,
            date_line(date),
            body_lines,
            footer_lines,
            JoinPolicy::ParagraphBreak,
        )
    }
}

/// Heading, one line per value (or the failure reason), then a blank line.
fn section_lines(entry: &IndicatorEntry) -> Vec<String> {
    let mut lines = vec![format!("{} **{}**", entry.emoji, entry.name)];

    match &entry.outcome {
        IndicatorOutcome::Latest(values) => {
            lines.extend(values.iter().map(|(label, value)| value_line(label, value)));
        }
        IndicatorOutcome::Empty => lines.push("❌ 数据为空".to_string()),
        IndicatorOutcome::MissingFields => lines.push("❌ 指定字段不存在".to_string()),
        IndicatorOutcome::Failed(reason) => lines.push(format!("❌ 获取失败: {}", reason)),
    }

    lines.push(String::new());
    lines
}

fn value_line(label: &str, value: &IndicatorValue) -> String {
    match value {
        IndicatorValue::Date(date) => format!("📅 {}: {}", label, date),
        IndicatorValue::Value(value) => {
            format!("📊 {}: {}", label, crate::data::plain_text(value))
        }
        IndicatorValue::Percentile(fraction) => format!("📊 {}: {:.1}%", label, fraction * 100.0),
    }
}
