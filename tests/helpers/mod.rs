#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use saathi::error::{Result, SaathiError};
use saathi::inference::InferenceService;
use saathi::record::{NewRecord, Snapshot};
use saathi::store::{CollectionPath, DocumentStore, SqliteStore, Subscription};
use saathi::view::{ChartSink, Frame, RenderOp, ViewSink};
use tokio::sync::{mpsc, Notify};

pub const APP_ID: &str = "test-app";

pub fn test_path(uid: &str) -> CollectionPath {
    CollectionPath::new(APP_ID, uid)
}

/// A fresh in-memory store with schema and migrations applied.
pub fn test_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::in_memory().unwrap())
}

/// Inference stand-in that plays back queued replies in order.
///
/// With a gate, every call waits for one `notify_one` before replying.
#[derive(Default)]
pub struct FakeInference {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl FakeInference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(SaathiError::Classification(message.to_string())));
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for FakeInference {
    async fn generate(&self, prompt: &str, _schema: Option<&serde_json::Value>) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SaathiError::Classification("no reply queued".into())))
    }
}

/// Store whose subscriptions are fed by the test through [`ScriptedStore::feed`].
#[derive(Default)]
pub struct ScriptedStore {
    feeds: Mutex<Vec<mpsc::Sender<Result<Snapshot>>>>,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver one item to every open subscription.
    pub async fn feed(&self, item: impl Fn() -> Result<Snapshot>) {
        let feeds = self.feeds.lock().unwrap().clone();
        for tx in feeds {
            let _ = tx.send(item()).await;
        }
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    async fn append(&self, _path: &CollectionPath, _record: NewRecord) -> Result<String> {
        Err(SaathiError::Connectivity("read-only store".into()))
    }

    async fn subscribe(&self, _path: &CollectionPath) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(8);
        self.feeds.lock().unwrap().push(tx);
        Ok(Subscription::from_receiver(rx))
    }
}

/// Records every frame and chart push it receives.
#[derive(Default)]
pub struct RecordingView {
    frames: Mutex<Vec<Frame>>,
    expense: Mutex<Vec<BTreeMap<String, f64>>>,
    mood: Mutex<Vec<[Option<u8>; 7]>>,
}

impl RecordingView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.frames.lock().unwrap().last().cloned()
    }

    pub fn expense_pushes(&self) -> Vec<BTreeMap<String, f64>> {
        self.expense.lock().unwrap().clone()
    }

    pub fn mood_pushes(&self) -> usize {
        self.mood.lock().unwrap().len()
    }
}

impl ViewSink for RecordingView {
    fn present(&self, frame: &Frame) {
        self.frames.lock().unwrap().push(frame.clone());
    }
}

impl ChartSink for RecordingView {
    fn expense_series(&self, series: &BTreeMap<String, f64>) {
        self.expense.lock().unwrap().push(series.clone());
    }

    fn mood_series(&self, series: &[Option<u8>; 7]) {
        self.mood.lock().unwrap().push(*series);
    }
}

/// Bubble texts of a frame's conversation, oldest first.
pub fn conversation_texts(frame: &Frame) -> Vec<String> {
    frame
        .conversation
        .iter()
        .filter_map(|op| match op {
            RenderOp::Bubble { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 2s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
