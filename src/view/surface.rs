//! Adapters between render instructions and a concrete UI.

use std::collections::BTreeMap;

use super::{Alignment, Frame, RenderOp, Tone};
use crate::record::types::format_amount;

/// A target that applies render instructions, e.g. one feed widget.
pub trait Surface {
    fn apply(&mut self, ops: &[RenderOp]);
}

/// Receives the derived chart series. Rendering is entirely the sink's job.
pub trait ChartSink: Send + Sync {
    fn expense_series(&self, series: &BTreeMap<String, f64>);
    fn mood_series(&self, series: &[Option<u8>; 7]);
}

/// Receives one frame per snapshot.
pub trait ViewSink: Send + Sync {
    fn present(&self, frame: &Frame);
}

/// Plain-text surface: one line per rendered element.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextSurface {
    lines: Vec<String>,
    width: usize,
}

impl TextSurface {
    /// `width` is used to push right-aligned bubbles to the right edge.
    pub fn new(width: usize) -> Self {
        Self {
            lines: Vec::new(),
            width,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl Surface for TextSurface {
    fn apply(&mut self, ops: &[RenderOp]) {
        for op in ops {
            match op {
                RenderOp::Clear => self.lines.clear(),
                RenderOp::Placeholder(text) => self.lines.push(format!("  ({text})")),
                RenderOp::Bubble {
                    alignment,
                    tone,
                    text,
                } => {
                    let marker = match tone {
                        Tone::User => "you",
                        Tone::Assistant => "saathi",
                    };
                    let line = format!("[{marker}] {text}");
                    let line = match alignment {
                        Alignment::Left => line,
                        Alignment::Right => format!("{line:>width$}", width = self.width),
                    };
                    self.lines.push(line);
                }
                RenderOp::Row { icon, text } => self.lines.push(format!("{icon}  {text}")),
            }
        }
    }
}

/// Text bars for the two charts.
pub fn chart_lines(expense: &BTreeMap<String, f64>, mood: &[Option<u8>; 7]) -> Vec<String> {
    let mut lines = Vec::new();
    let max = expense.values().cloned().fold(0.0_f64, f64::max);
    for (category, amount) in expense {
        let bar = if max > 0.0 {
            ((amount / max) * 20.0).round() as usize
        } else {
            0
        };
        lines.push(format!(
            "{category:<10} {:<20} ₹{}",
            "█".repeat(bar),
            format_amount(*amount)
        ));
    }
    for (day, value) in crate::aggregate::WEEK.iter().zip(mood) {
        let cell = value
            .map(|v| "●".repeat(v as usize))
            .unwrap_or_else(|| "·".into());
        lines.push(format!("{day} {cell}"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ActivityRecord, RecordType, Snapshot, Timestamp};
    use crate::view::{conversation, feed};
    use chrono::{TimeZone, Utc};

    fn snapshot(n: i64) -> Snapshot {
        Snapshot::from_records(
            (1..=n)
                .map(|seq| ActivityRecord {
                    id: seq.to_string(),
                    record_type: if seq % 2 == 1 { RecordType::User } else { RecordType::Note },
                    text: format!("message {seq}"),
                    icon: None,
                    details: None,
                    timestamp: Timestamp::Resolved(Utc.timestamp_opt(seq, 0).unwrap()),
                    sequence: seq,
                })
                .collect(),
        )
    }

    #[test]
    fn reapplying_a_render_does_not_duplicate() {
        let snap = snapshot(4);
        let mut surface = TextSurface::new(40);
        surface.apply(&conversation(&snap));
        let once = surface.clone();
        surface.apply(&conversation(&snap));
        assert_eq!(surface, once);
        assert_eq!(surface.lines().len(), 4);
    }

    #[test]
    fn feed_surface_shows_at_most_three() {
        let mut surface = TextSurface::new(40);
        surface.apply(&feed(&snapshot(5), 3));
        assert_eq!(surface.lines().len(), 3);
        assert!(surface.lines()[0].ends_with("message 5"));
    }

    #[test]
    fn new_snapshot_replaces_placeholder() {
        let mut surface = TextSurface::new(40);
        surface.apply(&feed(&Snapshot::default(), 3));
        assert_eq!(surface.lines().len(), 1);
        surface.apply(&feed(&snapshot(1), 3));
        assert_eq!(surface.lines(), ["👩  message 1"]);
    }

    #[test]
    fn user_bubbles_are_right_aligned() {
        let mut surface = TextSurface::new(30);
        surface.apply(&conversation(&snapshot(2)));
        assert_eq!(surface.lines()[0].len(), 30);
        assert!(surface.lines()[1].starts_with("[saathi]"));
    }

    #[test]
    fn chart_lines_cover_every_weekday() {
        let mut expense = BTreeMap::new();
        expense.insert("Food".to_string(), 150.0);
        let lines = chart_lines(&expense, &[None, Some(2), None, None, None, None, None]);
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("Food"));
        assert_eq!(lines[2], "Mon ●●");
    }
}
