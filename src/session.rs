//! Session context: one identity, one live subscription, one render loop.
//!
//! [`Session::connect`] releases any previous subscription before opening the
//! next, so at most one listener renders at a time. Each snapshot flows through
//! aggregation, materialization, the view and chart sinks, and the pattern
//! monitor.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{Datelike, Local};
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::aggregate::aggregate;
use crate::error::{Result, SaathiError};
use crate::identity::{Identity, IdentityProvider};
use crate::inference::InferenceService;
use crate::intent::{IntentPipeline, Submission};
use crate::monitor::{self, PatternMonitor};
use crate::notify::Notifier;
use crate::record::Snapshot;
use crate::store::{CollectionPath, DocumentStore, Subscription};
use crate::view::{materialize, ChartSink, ViewSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    /// The subscription reported a transport failure. Clears on the next snapshot.
    SyncError,
    /// A service failed to initialize. Persistent.
    ConfigError,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::SyncError => "Sync Error",
            Self::ConfigError => "Config Error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared connection status.
///
/// `ConfigError` is terminal: once published, later updates are ignored.
#[derive(Clone)]
pub struct StatusBoard {
    sender: Arc<watch::Sender<ConnectionStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ConnectionStatus::Connecting);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> ConnectionStatus {
        *self.sender.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.sender.subscribe()
    }

    pub fn set(&self, status: ConnectionStatus) {
        self.sender.send_if_modified(|current| {
            if *current == status || *current == ConnectionStatus::ConfigError {
                false
            } else {
                tracing::debug!(from = %current, to = %status, "connection status");
                *current = status;
                true
            }
        });
    }

    /// Publish a failed initialization and hand the error back for propagation.
    pub fn fail_configuration(&self, error: SaathiError) -> SaathiError {
        tracing::error!(error = %error, "initialization failed");
        self.set(ConnectionStatus::ConfigError);
        error
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// The collaborators a session is wired to.
pub struct SessionServices {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub inference: Arc<dyn InferenceService>,
    pub notifier: Arc<dyn Notifier>,
    pub view: Arc<dyn ViewSink>,
    pub charts: Arc<dyn ChartSink>,
}

pub struct Session {
    app_id: String,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    inference: Arc<dyn InferenceService>,
    notifier: Arc<dyn Notifier>,
    pipeline: IntentPipeline,
    renderer: Arc<Renderer>,
    status: StatusBoard,
    active: Mutex<Option<ActiveSubscription>>,
}

struct ActiveSubscription {
    path: CollectionPath,
    listener: JoinHandle<()>,
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        // Aborting the listener drops its Subscription, which releases the store side.
        self.listener.abort();
    }
}

impl Session {
    pub fn new(app_id: impl Into<String>, feed_limit: usize, services: SessionServices) -> Self {
        Self::with_status_board(app_id, feed_limit, services, StatusBoard::new())
    }

    /// Like [`Session::new`], publishing on a board the caller already holds.
    pub fn with_status_board(
        app_id: impl Into<String>,
        feed_limit: usize,
        services: SessionServices,
        status: StatusBoard,
    ) -> Self {
        let pipeline = IntentPipeline::new(
            Arc::clone(&services.store),
            Arc::clone(&services.inference),
            Arc::clone(&services.notifier),
        );
        let monitor = Arc::new(PatternMonitor::new(
            Arc::clone(&services.store),
            Arc::clone(&services.inference),
            Arc::clone(&services.notifier),
        ));
        let renderer = Arc::new(Renderer {
            view: services.view,
            charts: services.charts,
            monitor,
            feed_limit,
            status: status.clone(),
            pending: Mutex::new(Vec::new()),
        });

        Self {
            app_id: app_id.into(),
            identity: services.identity,
            store: services.store,
            inference: services.inference,
            notifier: services.notifier,
            pipeline,
            renderer,
            status,
            active: Mutex::new(None),
        }
    }

    /// Bound each classification call by `timeout`.
    pub fn with_pipeline_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline = self.pipeline.with_timeout(timeout);
        self
    }

    /// Ensure an identity exists, then connect to its collection.
    ///
    /// With no current identity, signs in with `initial_token` (falling back
    /// to anonymous) or anonymously.
    pub async fn start(&self, initial_token: Option<&str>) -> Result<Identity> {
        let identity = match self.identity.current() {
            Some(identity) => identity,
            None => match initial_token {
                Some(token) => self.identity.sign_in_with_token_or_anonymous(token).await?,
                None => self.identity.sign_in_anonymously().await?,
            },
        };
        self.connect(&identity).await?;
        Ok(identity)
    }

    /// Subscribe to `identity`'s collection, replacing any current subscription.
    pub async fn connect(&self, identity: &Identity) -> Result<()> {
        let path = CollectionPath::new(&self.app_id, identity.uid());

        self.disconnect();
        self.set_status(ConnectionStatus::Connecting);

        let subscription = match self.store.subscribe(&path).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!(collection = %path, error = %e, "subscribe failed");
                self.set_status(ConnectionStatus::SyncError);
                return Err(e);
            }
        };

        tracing::info!(collection = %path, "connected");
        let listener = tokio::spawn(listen(
            subscription,
            path.clone(),
            Arc::clone(&self.renderer),
        ));

        // A concurrent connect may have slipped in; whichever lands last wins.
        let previous = self
            .lock_active()
            .replace(ActiveSubscription { path, listener });
        drop(previous);
        Ok(())
    }

    /// Release the current subscription, if any.
    pub fn disconnect(&self) {
        if let Some(previous) = self.lock_active().take() {
            tracing::debug!(collection = %previous.path, "disconnected");
        }
    }

    /// Reconnect whenever the identity provider reports a different identity.
    ///
    /// The task holds only a weak reference and ends with the session.
    pub fn follow_identity(self: &Arc<Self>) -> JoinHandle<()> {
        let session: Weak<Self> = Arc::downgrade(self);
        let mut changes = self.identity.watch();

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let next = changes.borrow_and_update().clone();
                let Some(session) = session.upgrade() else {
                    break;
                };
                match next {
                    Some(identity) if session.connected_uid().as_deref() != Some(identity.uid()) => {
                        if let Err(e) = session.connect(&identity).await {
                            tracing::warn!(error = %e, "reconnect after identity change failed");
                        }
                    }
                    Some(_) => {}
                    None => session.disconnect(),
                }
            }
        })
    }

    /// Submit free-form text through the intent pipeline.
    pub async fn submit(&self, text: &str) -> Result<Submission> {
        let path = self.collection();
        self.pipeline.submit(path.as_ref(), text).await
    }

    pub async fn translate(&self, text: &str) -> Option<String> {
        crate::translate::translate_to_hindi(self.inference.as_ref(), self.notifier.as_ref(), text)
            .await
    }

    /// The collection of the current identity.
    pub fn collection(&self) -> Option<CollectionPath> {
        self.identity
            .current()
            .map(|identity| CollectionPath::new(&self.app_id, identity.uid()))
    }

    /// The current snapshot of the current identity's collection.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let path = self
            .collection()
            .ok_or(SaathiError::NotAuthenticated)?;
        crate::store::current_snapshot(self.store.as_ref(), &path).await
    }

    /// Run the check-in for the current snapshot now, then wait for any
    /// check-in the render loop already started.
    ///
    /// Short-lived callers use this before exiting so a due check-in is not
    /// cancelled with the runtime. Returns the id this call wrote, if any.
    pub async fn settle(&self) -> Option<String> {
        let written = match self.snapshot().await {
            Ok(snapshot) => match self.collection() {
                Some(path) => {
                    let summary = aggregate(&snapshot, &Local);
                    let today = Local::now().weekday();
                    self.renderer
                        .monitor
                        .observe(&path, &snapshot, &summary, today)
                        .await
                }
                None => None,
            },
            Err(e) => {
                tracing::debug!(error = %e, "nothing to settle");
                None
            }
        };
        self.renderer.wait_for_check_ins().await;
        written
    }

    pub fn pipeline(&self) -> &IntentPipeline {
        &self.pipeline
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.current()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.current()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.watch()
    }

    fn connected_uid(&self) -> Option<String> {
        self.lock_active().as_ref().map(|a| a.path.user_id.clone())
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status.set(status);
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveSubscription>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Everything a snapshot is rendered to.
struct Renderer {
    view: Arc<dyn ViewSink>,
    charts: Arc<dyn ChartSink>,
    monitor: Arc<PatternMonitor>,
    feed_limit: usize,
    status: StatusBoard,
    /// Check-ins spawned from the render loop that may still be running.
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Renderer {
    fn on_snapshot(&self, path: &CollectionPath, snapshot: Snapshot) {
        let summary = aggregate(&snapshot, &Local);
        let frame = materialize(&snapshot, &summary, self.feed_limit);

        self.view.present(&frame);
        self.charts.expense_series(&frame.expense_series);
        self.charts.mood_series(&frame.mood_series);

        let today = Local::now().weekday();
        if monitor::evaluate(&snapshot, &summary, today).is_some() {
            let monitor = Arc::clone(&self.monitor);
            let path = path.clone();
            let check_in = tokio::spawn(async move {
                monitor.observe(&path, &snapshot, &summary, today).await;
            });
            let mut pending = self.lock_pending();
            pending.retain(|task| !task.is_finished());
            pending.push(check_in);
        }
    }

    async fn wait_for_check_ins(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.lock_pending());
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::debug!(error = %e, "check-in task ended early");
                }
            }
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn listen(mut subscription: Subscription, path: CollectionPath, renderer: Arc<Renderer>) {
    while let Some(next) = subscription.next().await {
        match next {
            Ok(snapshot) => {
                renderer.status.set(ConnectionStatus::Connected);
                tracing::debug!(collection = %path, records = snapshot.len(), "snapshot received");
                renderer.on_snapshot(&path, snapshot);
            }
            Err(e) => {
                tracing::warn!(collection = %path, error = %e, "subscription error");
                renderer.status.set(ConnectionStatus::SyncError);
            }
        }
    }
    tracing::debug!(collection = %path, "snapshot stream ended");
}
