//! The remote game service seam.
//!
//! Transport and encoding belong to the implementor. The store only needs
//! three calls: fetch a state, persist a state, and execute a move.

use crate::protocol::{MoveRequest, MoveResponse, StateVariant};
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use mosaic_core::{construct, predict, GameState, PositionKey};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("No {0} state available")]
    NotFound(StateVariant),

    #[error("Unknown position: {0}")]
    UnknownPosition(PositionKey),
}

/// Remote collaborator owning the authoritative game.
pub trait RemoteGame: Send + Sync + 'static {
    /// Fetch a stored state, optionally for a specific position
    fn fetch_state(
        &self,
        variant: StateVariant,
        key: Option<PositionKey>,
    ) -> BoxFuture<'_, Result<GameState, RemoteError>>;

    /// Store a state; best-effort
    fn persist_state(&self, state: GameState) -> BoxFuture<'_, Result<(), RemoteError>>;

    /// Ask the engine to validate and apply a move
    fn execute_move(&self, request: MoveRequest) -> BoxFuture<'_, Result<MoveResponse, RemoteError>>;
}

/// Fetch the saved state, falling back to the initial one.
pub async fn fetch_with_fallback(
    remote: &dyn RemoteGame,
    key: Option<PositionKey>,
) -> Result<GameState, RemoteError> {
    match remote.fetch_state(StateVariant::Saved, key.clone()).await {
        Ok(state) => Ok(state),
        Err(e) => {
            debug!("Saved state unavailable ({}), trying initial", e);
            remote.fetch_state(StateVariant::Initial, key).await
        }
    }
}

/// In-process game service.
///
/// Keeps every position it has seen in a table keyed by position key and
/// judges moves with the same draft rules the client predicts with. Each
/// call can be made to fail for testing.
#[derive(Default)]
pub struct InMemoryRemote {
    positions: DashMap<PositionKey, GameState>,
    variants: DashMap<StateVariant, PositionKey>,
    next_key: AtomicU64,
    fail_saved: AtomicBool,
    fail_initial: AtomicBool,
    fail_persist: AtomicBool,
    reject_moves: Mutex<Option<String>>,
    fetches: AtomicUsize,
    persists: AtomicUsize,
}

impl InMemoryRemote {
    /// A service whose initial and saved states are both `state`
    pub fn new(state: GameState) -> Arc<Self> {
        let remote = Self::default();
        remote.seed(StateVariant::Initial, state.clone());
        remote.seed(StateVariant::Saved, state);
        Arc::new(remote)
    }

    /// Replace one variant's state
    pub fn seed(&self, variant: StateVariant, state: GameState) {
        self.variants.insert(variant, state.position_key.clone());
        self.positions.insert(state.position_key.clone(), state);
    }

    /// Drop one variant, so fetching it reports `NotFound`
    pub fn forget(&self, variant: StateVariant) {
        self.variants.remove(&variant);
    }

    /// The current saved state, if any
    pub fn saved(&self) -> Option<GameState> {
        let key = self.variants.get(&StateVariant::Saved)?.clone();
        self.positions.get(&key).map(|s| s.clone())
    }

    pub fn set_fail_fetch(&self, variant: StateVariant, fail: bool) {
        match variant {
            StateVariant::Saved => self.fail_saved.store(fail, Ordering::SeqCst),
            StateVariant::Initial => self.fail_initial.store(fail, Ordering::SeqCst),
        }
    }

    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    /// Make the engine refuse every move with `reason`
    pub fn set_reject_moves(&self, reason: Option<&str>) {
        if let Ok(mut guard) = self.reject_moves.lock() {
            *guard = reason.map(str::to_string);
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn persist_count(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }

    fn fetch_now(
        &self,
        variant: StateVariant,
        key: Option<PositionKey>,
    ) -> Result<GameState, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let failing = match variant {
            StateVariant::Saved => &self.fail_saved,
            StateVariant::Initial => &self.fail_initial,
        };
        if failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Network(format!("{} fetch refused", variant)));
        }

        let key = match key {
            Some(key) => key,
            None => self
                .variants
                .get(&variant)
                .map(|k| k.clone())
                .ok_or(RemoteError::NotFound(variant))?,
        };
        self.positions
            .get(&key)
            .map(|s| s.clone())
            .ok_or(RemoteError::UnknownPosition(key))
    }

    fn persist_now(&self, state: GameState) -> Result<(), RemoteError> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("persist refused".to_string()));
        }
        self.seed(StateVariant::Saved, state);
        Ok(())
    }

    fn execute_now(&self, request: MoveRequest) -> Result<MoveResponse, RemoteError> {
        if let Some(reason) = self.reject_moves.lock().ok().and_then(|g| g.clone()) {
            return Ok(MoveResponse::rejected(reason));
        }

        let state = self
            .positions
            .get(&request.position_key)
            .map(|s| s.clone())
            .ok_or_else(|| RemoteError::UnknownPosition(request.position_key.clone()))?;

        if request.player_index != state.current_player {
            return Ok(MoveResponse::rejected("Not your turn"));
        }

        let mv = request.mv;
        match construct(&state, mv.source, mv.color, mv.row) {
            Ok(expected) if expected == mv => {}
            Ok(_) => return Ok(MoveResponse::rejected("Tile split does not match the position")),
            Err(e) => return Ok(MoveResponse::rejected(e.to_string())),
        }

        let mut next = predict(&state, &mv);
        next.current_player = (next.current_player + 1) % next.player_count().max(1);
        let n = self.next_key.fetch_add(1, Ordering::SeqCst) + 1;
        next.position_key = PositionKey::new(format!("{}~{}", request.position_key, n));

        let game_over = next.tiles_on_offer() == 0;
        let new_key = next.position_key.clone();
        self.seed(StateVariant::Saved, next);

        Ok(MoveResponse {
            game_over: Some(game_over),
            ..MoveResponse::accepted(new_key)
        })
    }
}

impl RemoteGame for InMemoryRemote {
    fn fetch_state(
        &self,
        variant: StateVariant,
        key: Option<PositionKey>,
    ) -> BoxFuture<'_, Result<GameState, RemoteError>> {
        Box::pin(async move { self.fetch_now(variant, key) })
    }

    fn persist_state(&self, state: GameState) -> BoxFuture<'_, Result<(), RemoteError>> {
        Box::pin(async move { self.persist_now(state) })
    }

    fn execute_move(&self, request: MoveRequest) -> BoxFuture<'_, Result<MoveResponse, RemoteError>> {
        Box::pin(async move { self.execute_now(request) })
    }
}
