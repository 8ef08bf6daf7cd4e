//! Snapshot → render instructions.
//!
//! Every projection is a pure function of one snapshot and starts with
//! [`RenderOp::Clear`], so applying the same projection twice leaves a surface
//! exactly as applying it once. Adapters in [`surface`] turn instructions into
//! output for a concrete UI.

pub mod surface;

use std::collections::BTreeMap;

use crate::aggregate::Summary;
use crate::record::types::format_amount;
use crate::record::{ActivityRecord, RecordType, Snapshot};

pub use surface::{ChartSink, Surface, TextSurface, ViewSink};

pub const CONVERSATION_PLACEHOLDER: &str = "Your conversation starts here.";
pub const FEED_PLACEHOLDER: &str = "No recent activities.";
pub const NO_MOOD: &str = "---";

/// Rows shown in the activity feed unless configured otherwise.
pub const DEFAULT_FEED_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    /// Discard everything previously rendered on the surface.
    Clear,
    Placeholder(&'static str),
    Bubble {
        alignment: Alignment,
        tone: Tone,
        text: String,
    },
    Row {
        icon: String,
        text: String,
    },
}

/// Full history, oldest first, one bubble per record.
pub fn conversation(snapshot: &Snapshot) -> Vec<RenderOp> {
    let mut ops = vec![RenderOp::Clear];
    if snapshot.is_empty() {
        ops.push(RenderOp::Placeholder(CONVERSATION_PLACEHOLDER));
        return ops;
    }
    ops.extend(snapshot.chronological().map(bubble));
    ops
}

/// Newest first, at most `limit` icon rows, top row first.
pub fn feed(snapshot: &Snapshot, limit: usize) -> Vec<RenderOp> {
    let mut ops = vec![RenderOp::Clear];
    if snapshot.is_empty() {
        ops.push(RenderOp::Placeholder(FEED_PLACEHOLDER));
        return ops;
    }
    ops.extend(snapshot.newest_first().take(limit).map(|record| RenderOp::Row {
        icon: icon_for(record).to_string(),
        text: record.text.clone(),
    }));
    ops
}

fn bubble(record: &ActivityRecord) -> RenderOp {
    let alignment = if record.record_type.is_outbound() {
        Alignment::Right
    } else {
        Alignment::Left
    };
    let tone = if record.record_type == RecordType::User {
        Tone::User
    } else {
        Tone::Assistant
    };
    RenderOp::Bubble {
        alignment,
        tone,
        text: record.text.clone(),
    }
}

fn icon_for(record: &ActivityRecord) -> &str {
    match (&record.icon, &record.record_type) {
        (Some(icon), _) if !icon.is_empty() => icon.as_str(),
        (_, RecordType::User) => "👩",
        _ => "🤖",
    }
}

/// Headline figures for the dashboard cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    /// e.g. `₹150`
    pub expense_total: String,
    /// Capitalized latest emotion, or `---`.
    pub mood: String,
}

pub fn dashboard(summary: &Summary) -> Dashboard {
    Dashboard {
        expense_total: format!("₹{}", format_amount(summary.total_expense())),
        mood: summary
            .latest_mood
            .as_deref()
            .map(capitalize)
            .unwrap_or_else(|| NO_MOOD.to_string()),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => NO_MOOD.to_string(),
    }
}

/// Everything one snapshot renders to.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub conversation: Vec<RenderOp>,
    pub feed: Vec<RenderOp>,
    pub dashboard: Dashboard,
    pub expense_series: BTreeMap<String, f64>,
    pub mood_series: [Option<u8>; 7],
}

pub fn materialize(snapshot: &Snapshot, summary: &Summary, feed_limit: usize) -> Frame {
    Frame {
        conversation: conversation(snapshot),
        feed: feed(snapshot, feed_limit),
        dashboard: dashboard(summary),
        expense_series: summary.expense_by_category.clone(),
        mood_series: summary.weekly_mood(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Timestamp;
    use chrono::{TimeZone, Utc};

    fn record(seq: i64, record_type: RecordType, text: &str) -> ActivityRecord {
        ActivityRecord {
            id: format!("r{seq}"),
            record_type,
            text: text.into(),
            icon: None,
            details: None,
            timestamp: Timestamp::Resolved(Utc.timestamp_opt(1_700_000_000 + seq, 0).unwrap()),
            sequence: seq,
        }
    }

    fn texts(ops: &[RenderOp]) -> Vec<&str> {
        ops.iter()
            .filter_map(|op| match op {
                RenderOp::Bubble { text, .. } | RenderOp::Row { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn sample() -> Snapshot {
        Snapshot::from_records(vec![
            record(1, RecordType::User, "kal 500 ki grocery"),
            record(2, RecordType::Expense, "Got it. Added ₹500 to Groceries."),
            record(3, RecordType::User, "thak gayi hoon"),
            record(4, RecordType::Mood, "Thanks for sharing that you're feeling tired."),
            record(5, RecordType::AiSuggestion, "Sab theek hai?"),
        ])
    }

    #[test]
    fn conversation_is_chronological_and_complete() {
        let ops = conversation(&sample());
        assert_eq!(ops[0], RenderOp::Clear);
        assert_eq!(
            texts(&ops),
            [
                "kal 500 ki grocery",
                "Got it. Added ₹500 to Groceries.",
                "thak gayi hoon",
                "Thanks for sharing that you're feeling tired.",
                "Sab theek hai?"
            ]
        );
    }

    #[test]
    fn bubbles_align_by_author() {
        let ops = conversation(&sample());
        let alignments: Vec<Alignment> = ops
            .iter()
            .filter_map(|op| match op {
                RenderOp::Bubble { alignment, .. } => Some(*alignment),
                _ => None,
            })
            .collect();
        use Alignment::*;
        assert_eq!(alignments, [Right, Left, Right, Left, Right]);

        match &ops[5] {
            RenderOp::Bubble { tone, .. } => assert_eq!(*tone, Tone::Assistant),
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn feed_is_capped_and_newest_first() {
        let ops = feed(&sample(), DEFAULT_FEED_LIMIT);
        assert_eq!(
            texts(&ops),
            [
                "Sab theek hai?",
                "Thanks for sharing that you're feeling tired.",
                "thak gayi hoon"
            ]
        );
    }

    #[test]
    fn short_feed_shows_everything() {
        let snap = Snapshot::from_records(vec![record(1, RecordType::User, "hi")]);
        assert_eq!(texts(&feed(&snap, DEFAULT_FEED_LIMIT)), ["hi"]);
    }

    #[test]
    fn feed_icons_default_by_author() {
        let mut with_icon = record(3, RecordType::Task, "Reminder set");
        with_icon.icon = Some("✅".into());
        let snap = Snapshot::from_records(vec![
            record(1, RecordType::User, "u"),
            record(2, RecordType::Unknown("legacy".into()), "?"),
            with_icon,
        ]);
        let ops = feed(&snap, 3);
        let icons: Vec<&str> = ops
            .iter()
            .filter_map(|op| match op {
                RenderOp::Row { icon, .. } => Some(icon.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(icons, ["✅", "🤖", "👩"]);
    }

    #[test]
    fn empty_snapshot_renders_placeholders() {
        let empty = Snapshot::default();
        assert_eq!(
            conversation(&empty),
            [RenderOp::Clear, RenderOp::Placeholder(CONVERSATION_PLACEHOLDER)]
        );
        assert_eq!(
            feed(&empty, 3),
            [RenderOp::Clear, RenderOp::Placeholder(FEED_PLACEHOLDER)]
        );
    }

    #[test]
    fn dashboard_formats_totals_and_mood() {
        let mut summary = Summary::default();
        assert_eq!(
            dashboard(&summary),
            Dashboard {
                expense_total: "₹0".into(),
                mood: NO_MOOD.into()
            }
        );

        summary.expense_by_category.insert("Food".into(), 150.0);
        summary.latest_mood = Some("excited".into());
        let d = dashboard(&summary);
        assert_eq!(d.expense_total, "₹150");
        assert_eq!(d.mood, "Excited");
    }
}
