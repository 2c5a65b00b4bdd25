//! Event loop driving a `GameStateStore`.
//!
//! One task owns the store. It listens on the command channel, the poll
//! interval, and the set of in-flight network calls and timers, and feeds
//! everything through `GameStateStore::handle` one event at a time.
//! Responses are applied in arrival order, not request order.

use crate::remote::{fetch_with_fallback, RemoteGame};
use crate::protocol::{MoveRequest, StateVariant};
use crate::store::{Effect, FetchPurpose, GameStateStore, StoreEvent, StoreSnapshot, SyncError};
use mosaic_core::fingerprint;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Handle held by the UI layer
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<StoreEvent>,
    snapshots: watch::Receiver<StoreSnapshot>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Deliver an event to the store
    pub fn send(&self, event: StoreEvent) -> Result<(), SyncError> {
        self.commands.send(event).map_err(|_| SyncError::Closed)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes on every published change
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshots.clone()
    }

    /// End the session and wait for the loop to release its timers
    pub async fn shutdown(self) -> anyhow::Result<()> {
        // The loop may already be gone; joining still reports how it ended.
        let _ = self.commands.send(StoreEvent::Shutdown);
        self.task.await?;
        Ok(())
    }
}

/// Spawn the event loop and start the session.
pub fn spawn(store: GameStateStore, remote: Arc<dyn RemoteGame>) -> SyncHandle {
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshots) = watch::channel(store.snapshot());
    let _ = commands.send(StoreEvent::Start);

    let task = tokio::spawn(run(store, remote, command_rx, snapshot_tx));
    SyncHandle {
        commands,
        snapshots,
        task,
    }
}

/// Timers that restart on re-arm
#[derive(Default)]
struct Timers {
    inactivity: Option<AbortHandle>,
    grace: Option<AbortHandle>,
}

impl Timers {
    fn cancel_all(&mut self) {
        for handle in [self.inactivity.take(), self.grace.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}

async fn run(
    mut store: GameStateStore,
    remote: Arc<dyn RemoteGame>,
    mut command_rx: mpsc::UnboundedReceiver<StoreEvent>,
    snapshot_tx: watch::Sender<StoreSnapshot>,
) {
    info!("Sync loop started");

    let mut poll = time::interval(store.config().poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately; the first real poll is one interval out.
    poll.tick().await;

    let mut tasks: JoinSet<StoreEvent> = JoinSet::new();
    let mut timers = Timers::default();
    let mut published = store.revision();

    loop {
        let event = tokio::select! {
            command = command_rx.recv() => match command {
                Some(event) => event,
                None => {
                    info!("Command channel closed");
                    StoreEvent::Shutdown
                }
            },
            _ = poll.tick() => StoreEvent::PollTick,
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => match joined {
                Ok(event) => event,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => {
                    error!("Sync task failed: {}", e);
                    continue;
                }
            },
        };

        let effects = store.handle(event);
        let mut teardown = false;
        for effect in effects {
            match effect {
                Effect::Teardown => teardown = true,
                effect => dispatch(effect, &remote, &mut tasks, &mut timers),
            }
        }

        if store.revision() != published {
            published = store.revision();
            let _ = snapshot_tx.send(store.snapshot());
        }

        if teardown {
            break;
        }
    }

    timers.cancel_all();
    tasks.abort_all();
    info!("Sync loop stopped");
}

fn dispatch(
    effect: Effect,
    remote: &Arc<dyn RemoteGame>,
    tasks: &mut JoinSet<StoreEvent>,
    timers: &mut Timers,
) {
    match effect {
        Effect::Fetch { purpose, key } => {
            debug!(?purpose, ?key, "Fetching");
            let remote = Arc::clone(remote);
            tasks.spawn(async move {
                let result = match (purpose, key) {
                    (FetchPurpose::AfterMove, Some(key)) => {
                        remote.fetch_state(StateVariant::Saved, Some(key)).await
                    }
                    (_, key) => fetch_with_fallback(remote.as_ref(), key).await,
                };
                StoreEvent::FetchCompleted { purpose, result }
            });
        }
        Effect::Persist(state) => {
            let remote = Arc::clone(remote);
            let fp = fingerprint(&state);
            tasks.spawn(async move {
                let result = remote.persist_state(state).await;
                StoreEvent::PersistCompleted {
                    fingerprint: fp,
                    result,
                }
            });
        }
        Effect::ExecuteMove {
            key,
            mv,
            player,
            predicted,
        } => {
            let remote = Arc::clone(remote);
            tasks.spawn(async move {
                let result = remote
                    .execute_move(MoveRequest {
                        position_key: key,
                        mv,
                        player_index: player,
                    })
                    .await;
                StoreEvent::MoveCompleted { predicted, result }
            });
        }
        Effect::ArmInactivityTimer { generation, after } => {
            if let Some(previous) = timers.inactivity.take() {
                previous.abort();
            }
            timers.inactivity = Some(tasks.spawn(async move {
                time::sleep(after).await;
                StoreEvent::InactivityElapsed { generation }
            }));
        }
        Effect::ArmGraceTimer { generation, after } => {
            if let Some(previous) = timers.grace.take() {
                previous.abort();
            }
            timers.grace = Some(tasks.spawn(async move {
                time::sleep(after).await;
                StoreEvent::GraceElapsed { generation }
            }));
        }
        Effect::Teardown => warn!("Teardown dispatched outside the loop"),
    }
}
