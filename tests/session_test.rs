mod helpers;

use std::sync::Arc;
use std::time::Duration;

use saathi::error::SaathiError;
use saathi::identity::{IdentityProvider, LocalIdentityProvider};
use saathi::notify::RecordingNotifier;
use saathi::record::{NewRecord, Snapshot};
use saathi::session::{ConnectionStatus, Session, SessionServices, StatusBoard};
use saathi::store::{DocumentStore, SqliteStore};
use saathi::view::{RenderOp, CONVERSATION_PLACEHOLDER};

use helpers::{
    conversation_texts, test_path, test_store, wait_until, FakeInference, RecordingView,
    ScriptedStore, APP_ID,
};

struct Harness {
    session: Arc<Session>,
    store: Arc<SqliteStore>,
    identity: Arc<LocalIdentityProvider>,
    view: Arc<RecordingView>,
}

fn services(
    store: Arc<dyn DocumentStore>,
    identity: Arc<LocalIdentityProvider>,
    inference: FakeInference,
    view: Arc<RecordingView>,
) -> SessionServices {
    SessionServices {
        identity,
        store,
        inference: Arc::new(inference),
        notifier: Arc::new(RecordingNotifier::new()),
        view: view.clone(),
        charts: view,
    }
}

fn harness(inference: FakeInference) -> Harness {
    let store = test_store();
    let identity = Arc::new(LocalIdentityProvider::new());
    let view = RecordingView::new();
    let session = Arc::new(Session::new(
        APP_ID,
        3,
        services(store.clone(), identity.clone(), inference, view.clone()),
    ));
    Harness {
        session,
        store,
        identity,
        view,
    }
}

fn shows_placeholder(view: &RecordingView) -> bool {
    view.last_frame().is_some_and(|f| {
        f.conversation == [RenderOp::Clear, RenderOp::Placeholder(CONVERSATION_PLACEHOLDER)]
    })
}

#[tokio::test]
async fn start_signs_in_and_renders_empty_collection() {
    let h = harness(FakeInference::new());
    assert!(h.session.collection().is_none());

    let identity = h.session.start(None).await.unwrap();
    assert!(identity.is_anonymous());
    assert_eq!(h.session.collection(), Some(test_path(identity.uid())));

    wait_until(|| shows_placeholder(&h.view)).await;
    assert_eq!(h.session.status(), ConnectionStatus::Connected);
    assert_eq!(h.view.mood_pushes(), h.view.frame_count());
}

#[tokio::test]
async fn start_prefers_a_valid_token() {
    let h = harness(FakeInference::new());
    let identity = h.session.start(Some("family-device-7")).await.unwrap();
    assert_eq!(identity.uid(), "family-device-7");
    assert!(!identity.is_anonymous());

    let h = harness(FakeInference::new());
    let identity = h.session.start(Some("not a token!")).await.unwrap();
    assert!(identity.is_anonymous());
}

#[tokio::test]
async fn every_write_rerenders_all_widgets() {
    let h = harness(FakeInference::new().reply(r#"{"intent":"expense","category":"Food","amount":100}"#));
    h.session.start(Some("asha")).await.unwrap();

    h.session.submit("100 ka lunch").await.unwrap();

    wait_until(|| {
        h.view
            .last_frame()
            .is_some_and(|f| conversation_texts(&f).len() == 2)
    })
    .await;

    let frame = h.view.last_frame().unwrap();
    assert_eq!(
        conversation_texts(&frame),
        ["100 ka lunch", "Got it. Added ₹100 to Food."]
    );
    assert_eq!(frame.dashboard.expense_total, "₹100");
    assert_eq!(frame.expense_series["Food"], 100.0);
    assert_eq!(
        h.view.expense_pushes().last().unwrap()["Food"],
        100.0
    );

    // Every frame is a complete rendering starting from a clear.
    for frame in h.view.frames() {
        assert_eq!(frame.conversation[0], RenderOp::Clear);
        assert_eq!(frame.feed[0], RenderOp::Clear);
    }
}

#[tokio::test]
async fn switching_identity_drops_the_old_subscription() {
    let h = harness(FakeInference::new());
    h.session.start(Some("asha")).await.unwrap();
    let asha = test_path("asha");

    h.store.append(&asha, NewRecord::user("asha's first")).await.unwrap();
    wait_until(|| {
        h.view
            .last_frame()
            .is_some_and(|f| conversation_texts(&f) == ["asha's first"])
    })
    .await;

    let bela = h.identity.sign_in_with_token("bela").await.unwrap();
    h.session.connect(&bela).await.unwrap();
    wait_until(|| shows_placeholder(&h.view)).await;
    wait_until(|| h.store.listener_count() == 1).await;

    let frames_before = h.view.frame_count();
    h.store.append(&asha, NewRecord::user("asha's second")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stale = h.view.frames()[frames_before..]
        .iter()
        .any(|f| conversation_texts(f).iter().any(|t| t.starts_with("asha")));
    assert!(!stale, "frame from the previous identity rendered after switching");
}

#[tokio::test]
async fn following_identity_reconnects_automatically() {
    let h = harness(FakeInference::new());
    h.session.start(Some("asha")).await.unwrap();
    let _follower = h.session.follow_identity();

    h.store
        .append(&test_path("bela"), NewRecord::user("bela was here"))
        .await
        .unwrap();

    h.identity.sign_in_with_token("bela").await.unwrap();
    wait_until(|| {
        h.view
            .last_frame()
            .is_some_and(|f| conversation_texts(&f) == ["bela was here"])
    })
    .await;
    assert_eq!(h.session.collection(), Some(test_path("bela")));
}

#[tokio::test]
async fn disconnect_releases_the_subscription() {
    let h = harness(FakeInference::new());
    h.session.start(None).await.unwrap();
    wait_until(|| h.store.listener_count() == 1).await;

    h.session.disconnect();
    wait_until(|| h.store.listener_count() == 0).await;

    let frames = h.view.frame_count();
    let path = h.session.collection().unwrap();
    h.store.append(&path, NewRecord::note()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.view.frame_count(), frames);
}

#[tokio::test]
async fn translation_goes_through_the_session() {
    let h = harness(FakeInference::new().reply("  नमस्ते  ").fail("offline"));

    assert_eq!(h.session.translate("hello").await.as_deref(), Some("नमस्ते"));
    assert!(h.session.translate("hello again").await.is_none());
    assert!(h.session.translate("   ").await.is_none());
}

#[tokio::test]
async fn transport_error_flags_sync_error_until_next_snapshot() {
    let store = ScriptedStore::new();
    let view = RecordingView::new();
    let session = Session::new(
        APP_ID,
        3,
        services(
            store.clone(),
            Arc::new(LocalIdentityProvider::new()),
            FakeInference::new(),
            view.clone(),
        ),
    );
    session.start(Some("asha")).await.unwrap();
    let mut status = session.watch_status();

    store.feed(|| Ok(Snapshot::default())).await;
    status
        .wait_for(|s| *s == ConnectionStatus::Connected)
        .await
        .unwrap();

    store
        .feed(|| Err(SaathiError::Connectivity("network unreachable".into())))
        .await;
    status
        .wait_for(|s| *s == ConnectionStatus::SyncError)
        .await
        .unwrap();
    // An error item renders nothing.
    assert_eq!(view.frame_count(), 1);

    store.feed(|| Ok(Snapshot::default())).await;
    status
        .wait_for(|s| *s == ConnectionStatus::Connected)
        .await
        .unwrap();
    wait_until(|| view.frame_count() == 2).await;
}

#[tokio::test]
async fn configuration_error_is_persistent() {
    let board = StatusBoard::new();
    let config = saathi::config::InferenceConfig {
        provider: "unconfigured".into(),
        ..Default::default()
    };
    let err = saathi::inference::create_service(&config)
        .map_err(|e| board.fail_configuration(e))
        .err()
        .unwrap();
    assert!(matches!(err, SaathiError::Configuration(_)));
    assert_eq!(board.current(), ConnectionStatus::ConfigError);

    // A session sharing the board cannot clear it by connecting and rendering.
    let store = test_store();
    let view = RecordingView::new();
    let session = Session::with_status_board(
        APP_ID,
        3,
        services(
            store,
            Arc::new(LocalIdentityProvider::new()),
            FakeInference::new(),
            view.clone(),
        ),
        board.clone(),
    );
    session.start(None).await.unwrap();
    wait_until(|| view.frame_count() == 1).await;

    assert_eq!(session.status(), ConnectionStatus::ConfigError);
    board.set(ConnectionStatus::Connected);
    assert_eq!(board.current(), ConnectionStatus::ConfigError);
}
