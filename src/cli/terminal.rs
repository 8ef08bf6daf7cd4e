//! Terminal adapter for the view and chart sinks.

use std::collections::BTreeMap;
use std::sync::Mutex;

use saathi::view::surface::chart_lines;
use saathi::view::{Dashboard, Frame, RenderOp, Surface, TextSurface};
use saathi::view::{ChartSink, ViewSink};

/// Keeps the latest rendering of every widget. With `echo`, conversation
/// lines that have not been printed yet go to stdout as frames arrive.
pub struct TerminalView {
    echo: bool,
    state: Mutex<TerminalState>,
}

struct TerminalState {
    conversation: TextSurface,
    feed: TextSurface,
    dashboard: Option<Dashboard>,
    expense: BTreeMap<String, f64>,
    mood: [Option<u8>; 7],
    printed: usize,
    greeted: bool,
}

impl TerminalView {
    pub fn new(width: usize, echo: bool) -> Self {
        Self {
            echo,
            state: Mutex::new(TerminalState {
                conversation: TextSurface::new(width),
                feed: TextSurface::new(width),
                dashboard: None,
                expense: BTreeMap::new(),
                mood: [None; 7],
                printed: 0,
                greeted: false,
            }),
        }
    }

    /// The activity feed as last rendered.
    pub fn feed_lines(&self) -> Vec<String> {
        self.lock().feed.lines().to_vec()
    }

    /// Dashboard cards and charts as last rendered.
    pub fn summary_lines(&self) -> Vec<String> {
        let state = self.lock();
        let mut lines = Vec::new();
        if let Some(ref dashboard) = state.dashboard {
            lines.push(format!("Spent:  {}", dashboard.expense_total));
            lines.push(format!("Mood:   {}", dashboard.mood));
            lines.push(String::new());
        }
        lines.extend(chart_lines(&state.expense, &state.mood));
        lines
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TerminalState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ViewSink for TerminalView {
    fn present(&self, frame: &Frame) {
        let mut state = self.lock();
        state.conversation.apply(&frame.conversation);
        state.feed.apply(&frame.feed);
        state.dashboard = Some(frame.dashboard.clone());

        if !self.echo {
            return;
        }

        let bubbles = frame
            .conversation
            .iter()
            .filter(|op| matches!(op, RenderOp::Bubble { .. }))
            .count();
        // A shorter conversation means a different collection: start over.
        if bubbles < state.printed {
            state.printed = 0;
            state.greeted = false;
        }
        if bubbles == 0 {
            if !state.greeted {
                state.conversation.lines().iter().for_each(|l| println!("{l}"));
                state.greeted = true;
            }
            return;
        }
        for line in &state.conversation.lines()[state.printed..] {
            println!("{line}");
        }
        state.printed = bubbles;
    }
}

impl ChartSink for TerminalView {
    fn expense_series(&self, series: &BTreeMap<String, f64>) {
        self.lock().expense = series.clone();
    }

    fn mood_series(&self, series: &[Option<u8>; 7]) {
        self.lock().mood = *series;
    }
}
