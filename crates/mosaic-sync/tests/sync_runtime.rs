//! End-to-end tests for the sync loop against the in-process service.
//!
//! Tokio time is paused, so poll and inactivity timers fire as soon as the
//! loop is otherwise idle.

use mosaic_core::{DraftSource, GameState, PositionKey, SelectionElement, TileColor, TileMultiset};
use mosaic_sync::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;

fn start_state() -> GameState {
    GameState::from_notation(&["BBYR", "KKTT", "RRYY"], 2, "g1")
}

fn launch(remote: &Arc<InMemoryRemote>) -> SyncHandle {
    init_tracing();
    let remote: Arc<dyn RemoteGame> = remote.clone();
    spawn(GameStateStore::new(SyncConfig::default()), remote)
}

async fn wait_for<F>(rx: &mut watch::Receiver<StoreSnapshot>, what: &str, pred: F) -> StoreSnapshot
where
    F: FnMut(&StoreSnapshot) -> bool,
{
    match time::timeout(Duration::from_secs(300), rx.wait_for(pred)).await {
        Ok(Ok(snapshot)) => snapshot.clone(),
        Ok(Err(_)) => panic!("sync loop closed while waiting for {}", what),
        Err(_) => panic!("timed out waiting for {}", what),
    }
}

async fn connected(handle: &SyncHandle) -> StoreSnapshot {
    let mut rx = handle.subscribe();
    wait_for(&mut rx, "connection", |s| {
        s.connection == ConnectionState::Connected { stable: true }
    })
    .await
}

#[tokio::test(start_paused = true)]
async fn test_session_loads_saved_state() {
    let remote = InMemoryRemote::new(start_state());
    let handle = launch(&remote);

    let snapshot = connected(&handle).await;
    assert_eq!(snapshot.state, Some(start_state()));
    assert!(snapshot.session.is_some());

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_session_falls_back_to_initial() {
    let remote = InMemoryRemote::new(start_state());
    remote.forget(StateVariant::Saved);
    let handle = launch(&remote);

    let snapshot = connected(&handle).await;
    assert_eq!(snapshot.state, Some(start_state()));
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_session_init_failure_is_terminal() {
    let remote = InMemoryRemote::new(start_state());
    remote.set_fail_fetch(StateVariant::Saved, true);
    remote.set_fail_fetch(StateVariant::Initial, true);
    let handle = launch(&remote);

    let mut rx = handle.subscribe();
    let snapshot = wait_for(&mut rx, "init error", |s| {
        matches!(s.connection, ConnectionState::Error(_))
    })
    .await;
    assert!(snapshot.state.is_none());
    assert_eq!(snapshot.status.map(|s| s.level), Some(StatusLevel::Warning));

    // no retry, even across many poll intervals
    remote.set_fail_fetch(StateVariant::Saved, false);
    time::sleep(Duration::from_secs(120)).await;
    assert!(matches!(handle.snapshot().connection, ConnectionState::Error(_)));
    assert_eq!(remote.fetch_count(), 2);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_poll_picks_up_remote_change() {
    let remote = InMemoryRemote::new(start_state());
    let handle = launch(&remote);
    connected(&handle).await;

    let mut changed = start_state();
    changed.factories[2].tiles = TileMultiset::parse("TTTT");
    remote.seed(StateVariant::Saved, changed.clone());

    let mut rx = handle.subscribe();
    let snapshot = wait_for(&mut rx, "polled state", |s| s.state.as_ref() == Some(&changed)).await;
    assert!(!snapshot.unsynced);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_edit_mode_shields_local_state_from_poll() {
    let remote = InMemoryRemote::new(start_state());
    let handle = launch(&remote);
    connected(&handle).await;

    handle.send(StoreEvent::SetEditMode(true)).unwrap();
    let mut changed = start_state();
    changed.factories[0].tiles.clear();
    remote.seed(StateVariant::Saved, changed);

    time::sleep(Duration::from_secs(90)).await;
    assert_eq!(handle.snapshot().state, Some(start_state()));
    assert_eq!(remote.fetch_count(), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_activity_defers_poll_until_quiet() {
    let remote = InMemoryRemote::new(start_state());
    let handle = launch(&remote);
    connected(&handle).await;

    handle.send(StoreEvent::UserActivity).unwrap();
    time::sleep(Duration::from_secs(20)).await;
    // a tick at 15s was skipped while the user was active
    assert_eq!(remote.fetch_count(), 1);

    time::sleep(Duration::from_secs(40)).await;
    assert!(remote.fetch_count() > 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_edit_is_applied_then_persisted() {
    let remote = InMemoryRemote::new(start_state());
    let handle = launch(&remote);
    connected(&handle).await;

    handle.send(StoreEvent::SetEditMode(true)).unwrap();
    handle
        .send(StoreEvent::Select {
            element: SelectionElement::FactoryTile { factory: 1 },
            additive: false,
        })
        .unwrap();
    handle.send(StoreEvent::ApplyColor(TileColor::Red)).unwrap();

    let mut rx = handle.subscribe();
    let snapshot = wait_for(&mut rx, "persisted edit", |s| {
        !s.unsynced
            && s.state
                .as_ref()
                .is_some_and(|st| st.factories[1].tiles.len() == 5)
    })
    .await;

    let saved = remote.saved().unwrap();
    assert_eq!(saved.factories[1].tiles, TileMultiset::parse("KKTTR"));
    assert_eq!(snapshot.state.unwrap().position_key, PositionKey::new("g1"));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failed_persist_keeps_edit_and_warns() {
    let remote = InMemoryRemote::new(start_state());
    remote.set_fail_persist(true);
    let handle = launch(&remote);
    connected(&handle).await;

    handle.send(StoreEvent::SetEditMode(true)).unwrap();
    handle
        .send(StoreEvent::Select {
            element: SelectionElement::FactoryTile { factory: 0 },
            additive: false,
        })
        .unwrap();
    handle.send(StoreEvent::RemoveSelected).unwrap();

    let mut rx = handle.subscribe();
    let snapshot = wait_for(&mut rx, "persist warning", |s| {
        s.status
            .as_ref()
            .is_some_and(|st| st.level == StatusLevel::Warning)
    })
    .await;

    let state = snapshot.state.unwrap();
    assert!(state.factories[0].tiles.is_empty());
    assert!(snapshot.unsynced);
    assert_eq!(remote.saved().unwrap(), start_state());

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_draft_is_executed_and_refetched() {
    let remote = InMemoryRemote::new(start_state());
    let handle = launch(&remote);
    connected(&handle).await;

    handle
        .send(StoreEvent::Draft {
            source: DraftSource::Factory(0),
            color: TileColor::Blue,
            row: 1,
        })
        .unwrap();

    let mut rx = handle.subscribe();
    let snapshot = wait_for(&mut rx, "authoritative state", |s| {
        s.state.as_ref().is_some_and(|st| st.current_player == 1)
    })
    .await;

    let state = snapshot.state.unwrap();
    assert_eq!(state.position_key, PositionKey::new("g1~1"));
    assert!(state.factories[0].tiles.is_empty());
    assert_eq!(state.center.tiles, TileMultiset::parse("YR"));
    assert_eq!(
        state.player(0).unwrap().pattern_lines[1].tiles,
        vec![TileColor::Blue; 2]
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_engine_rejection_reaches_status_line() {
    let remote = InMemoryRemote::new(start_state());
    remote.set_reject_moves(Some("position has moved on"));
    let handle = launch(&remote);
    connected(&handle).await;

    handle
        .send(StoreEvent::Draft {
            source: DraftSource::Factory(1),
            color: TileColor::Black,
            row: 3,
        })
        .unwrap();

    let mut rx = handle.subscribe();
    let snapshot = wait_for(&mut rx, "rejection", |s| {
        s.status
            .as_ref()
            .is_some_and(|st| st.level == StatusLevel::Error)
    })
    .await;
    assert!(snapshot.status.unwrap().text.contains("position has moved on"));
    assert_eq!(snapshot.state, Some(start_state()));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_snapshot_channel() {
    let remote = InMemoryRemote::new(start_state());
    let handle = launch(&remote);
    connected(&handle).await;

    let snapshots = handle.subscribe();
    handle.shutdown().await.unwrap();
    assert!(snapshots.has_changed().is_err());
}
