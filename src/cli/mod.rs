pub mod chat;
pub mod doctor;
pub mod feed;
pub mod say;
pub mod summary;
pub mod terminal;
pub mod translate;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use saathi::config::SaathiConfig;
use saathi::identity::LocalIdentityProvider;
use saathi::notify::{ChannelNotifier, Notice, NoticeLevel};
use saathi::error::SaathiError;
use saathi::session::{Session, SessionServices, StatusBoard};
use saathi::store::SqliteStore;

use terminal::TerminalView;

/// Width used to right-align outgoing bubbles.
const TERMINAL_WIDTH: usize = 72;

/// A started session plus the terminal ends of its sinks.
pub struct Runtime {
    pub session: Arc<Session>,
    pub view: Arc<TerminalView>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
}

/// Wire the configured services into a session and connect it.
pub async fn start(config: &SaathiConfig, echo: bool) -> Result<Runtime> {
    let status = StatusBoard::new();

    let inference = saathi::inference::create_service(&config.inference)
        .map_err(|e| configuration_failed(&status, e))
        .context("failed to initialize inference service")?;

    let db_path = config.resolved_db_path();
    let store = SqliteStore::open(&db_path)
        .map_err(|e| configuration_failed(&status, e))
        .with_context(|| format!("failed to open activity store at {}", db_path.display()))?;
    let identity = LocalIdentityProvider::persistent(config.resolved_identity_path());

    let (notifier, notices) = ChannelNotifier::new();
    let view = Arc::new(TerminalView::new(TERMINAL_WIDTH, echo));

    let session = Session::with_status_board(
        config.app.app_id.clone(),
        config.view.feed_limit,
        SessionServices {
            identity: Arc::new(identity),
            store: Arc::new(store),
            inference,
            notifier: Arc::new(notifier),
            view: view.clone(),
            charts: view.clone(),
        },
        status,
    )
    .with_pipeline_timeout(Duration::from_secs(config.inference.classify_timeout_secs));
    let session = Arc::new(session);

    let identity = session
        .start(config.identity.initial_token.as_deref())
        .await
        .context("failed to start session")?;
    tracing::info!(uid = %identity.uid(), "session started");

    Ok(Runtime {
        session,
        view,
        notices,
    })
}

fn configuration_failed(status: &StatusBoard, error: SaathiError) -> SaathiError {
    let error = status.fail_configuration(error);
    eprintln!("Status: {}", status.current());
    error
}

pub fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Alert => eprintln!("! {}", notice.message),
        NoticeLevel::Info => eprintln!("* {}", notice.message),
    }
}

/// Print every notice queued so far.
pub fn drain_notices(notices: &mut mpsc::UnboundedReceiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        print_notice(&notice);
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
