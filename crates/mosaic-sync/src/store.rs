//! Game-state store: session lifecycle, background sync, and arbitration
//! between local edits and remote refreshes.
//!
//! The store is a plain state machine. It never awaits; `handle` takes an
//! event and returns the effects (network calls, timers) the runtime must
//! carry out. Their completions come back as further events.

use crate::config::{GraceRelease, SyncConfig};
use crate::protocol::MoveResponse;
use crate::remote::RemoteError;
use mosaic_core::{
    construct, fingerprint, predict, DraftSource, EditOutcome, EditOverlay, Fingerprint,
    GameState, Move, MoveRejection, PositionKey, SelectionElement, TileColor,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// `stable` becomes true once the first state has been applied
    Connected { stable: bool },
    /// Session init failed; not retried automatically
    Error(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

/// Why a fetch was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPurpose {
    Init,
    Poll,
    Manual,
    AfterMove,
}

impl FetchPurpose {
    /// Only background polls are filtered by fingerprint
    pub fn forces_apply(self) -> bool {
        !matches!(self, FetchPurpose::Poll)
    }
}

/// Errors surfaced on the status line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("{0}")]
    Rejected(#[from] MoveRejection),

    #[error("{0}")]
    Network(#[from] RemoteError),

    #[error("Move rejected by engine: {0}")]
    ValidationRejected(String),

    #[error("Edit kept locally but not saved: {0}")]
    PersistDesync(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Waiting for a pending save or move")]
    Busy,

    #[error("Store is shut down")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// The single user-visible status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            text: text.into(),
        }
    }
}

impl From<&SyncError> for StatusMessage {
    fn from(err: &SyncError) -> Self {
        let level = match err {
            SyncError::Rejected(_) | SyncError::Busy => StatusLevel::Info,
            SyncError::Network(_) | SyncError::PersistDesync(_) | SyncError::NotConnected => {
                StatusLevel::Warning
            }
            SyncError::ValidationRejected(_) | SyncError::Closed => StatusLevel::Error,
        };
        Self {
            level,
            text: err.to_string(),
        }
    }
}

/// Everything the background poll must check before touching local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncGate {
    pub connected: bool,
    pub stable: bool,
    pub mutation_in_flight: bool,
    pub edit_mode: bool,
    pub just_loaded: bool,
    pub user_active: bool,
    pub auto_sync: bool,
}

/// Whether a poll tick may fetch and apply remote state
pub fn should_sync(gate: &SyncGate) -> bool {
    gate.connected
        && gate.stable
        && !gate.mutation_in_flight
        && !gate.edit_mode
        && !gate.just_loaded
        && !gate.user_active
        && gate.auto_sync
}

/// Inputs to the store
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Start,
    PollTick,
    ManualRefresh,
    UserActivity,
    InactivityElapsed { generation: u64 },
    GraceElapsed { generation: u64 },
    SetEditMode(bool),
    SetAutoSync(bool),
    /// A position loaded from the library or an import
    LoadPosition(GameState),
    Select { element: SelectionElement, additive: bool },
    ClearSelection,
    ApplyColor(TileColor),
    RemoveSelected,
    CopySelection,
    Paste,
    Draft { source: DraftSource, color: TileColor, row: usize },
    FetchCompleted {
        purpose: FetchPurpose,
        result: Result<GameState, RemoteError>,
    },
    PersistCompleted {
        fingerprint: Fingerprint,
        result: Result<(), RemoteError>,
    },
    /// `predicted` is the move applied to the state it was built from
    MoveCompleted {
        predicted: GameState,
        result: Result<MoveResponse, RemoteError>,
    },
    Shutdown,
}

impl StoreEvent {
    /// UI interactions that count as user activity
    pub fn is_gesture(&self) -> bool {
        matches!(
            self,
            StoreEvent::SetEditMode(_)
                | StoreEvent::LoadPosition(_)
                | StoreEvent::Select { .. }
                | StoreEvent::ClearSelection
                | StoreEvent::ApplyColor(_)
                | StoreEvent::RemoveSelected
                | StoreEvent::CopySelection
                | StoreEvent::Paste
                | StoreEvent::Draft { .. }
        )
    }
}

/// Work the runtime must perform on the store's behalf
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch {
        purpose: FetchPurpose,
        key: Option<PositionKey>,
    },
    Persist(GameState),
    ExecuteMove {
        key: PositionKey,
        mv: Move,
        player: usize,
        predicted: GameState,
    },
    ArmInactivityTimer { generation: u64, after: Duration },
    ArmGraceTimer { generation: u64, after: Duration },
    Teardown,
}

/// Read-only view published to the UI
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub session: Option<Uuid>,
    pub connection: ConnectionState,
    pub state: Option<GameState>,
    pub status: Option<StatusMessage>,
    pub edit_mode: bool,
    pub selection: Vec<SelectionElement>,
    pub unsynced: bool,
    pub revision: u64,
}

pub struct GameStateStore {
    config: SyncConfig,
    session: Option<Uuid>,
    connection: ConnectionState,
    state: Option<GameState>,
    last_fingerprint: Option<Fingerprint>,
    overlay: EditOverlay,
    mutations_in_flight: usize,
    user_active: bool,
    activity_generation: u64,
    just_loaded: bool,
    grace_generation: u64,
    auto_sync: bool,
    unsynced: bool,
    status: Option<StatusMessage>,
    revision: u64,
}

impl GameStateStore {
    pub fn new(config: SyncConfig) -> Self {
        let auto_sync = config.auto_sync;
        Self {
            config,
            session: None,
            connection: ConnectionState::Disconnected,
            state: None,
            last_fingerprint: None,
            overlay: EditOverlay::new(),
            mutations_in_flight: 0,
            user_active: false,
            activity_generation: 0,
            just_loaded: false,
            grace_generation: 0,
            auto_sync,
            unsynced: false,
            status: None,
            revision: 0,
        }
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn last_fingerprint(&self) -> Option<Fingerprint> {
        self.last_fingerprint
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn is_unsynced(&self) -> bool {
        self.unsynced
    }

    pub fn is_just_loaded(&self) -> bool {
        self.just_loaded
    }

    pub fn is_user_active(&self) -> bool {
        self.user_active
    }

    pub fn mutations_in_flight(&self) -> usize {
        self.mutations_in_flight
    }

    /// Bumped on every change a reader could observe
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn gate(&self) -> SyncGate {
        SyncGate {
            connected: self.connection.is_connected(),
            stable: self.connection == ConnectionState::Connected { stable: true },
            mutation_in_flight: self.mutations_in_flight > 0,
            edit_mode: self.overlay.edit_mode(),
            just_loaded: self.just_loaded,
            user_active: self.user_active,
            auto_sync: self.auto_sync,
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            session: self.session,
            connection: self.connection.clone(),
            state: self.state.clone(),
            status: self.status.clone(),
            edit_mode: self.overlay.edit_mode(),
            selection: self.overlay.selection().to_vec(),
            unsynced: self.unsynced,
            revision: self.revision,
        }
    }

    /// Process one event
    pub fn handle(&mut self, event: StoreEvent) -> Vec<Effect> {
        let gesture = event.is_gesture();
        let mut effects = match event {
            StoreEvent::Start => self.start(),
            StoreEvent::PollTick => self.poll_tick(),
            StoreEvent::ManualRefresh => self.manual_refresh(),
            StoreEvent::UserActivity => self.user_activity(),
            StoreEvent::InactivityElapsed { generation } => {
                if generation == self.activity_generation {
                    self.user_active = false;
                }
                Vec::new()
            }
            StoreEvent::GraceElapsed { generation } => {
                if generation == self.grace_generation && self.just_loaded {
                    debug!("Grace window over");
                    self.just_loaded = false;
                }
                Vec::new()
            }
            StoreEvent::SetEditMode(enabled) => {
                self.overlay.set_edit_mode(enabled);
                self.touch();
                Vec::new()
            }
            StoreEvent::SetAutoSync(enabled) => {
                self.auto_sync = enabled;
                Vec::new()
            }
            StoreEvent::LoadPosition(state) => self.load_position(state),
            StoreEvent::Select { element, additive } => {
                self.overlay.select(element, additive);
                self.touch();
                Vec::new()
            }
            StoreEvent::ClearSelection => {
                self.overlay.clear_selection();
                self.touch();
                Vec::new()
            }
            StoreEvent::ApplyColor(color) => self.edit(|overlay, state| overlay.apply_color(state, color)),
            StoreEvent::RemoveSelected => self.edit(|overlay, state| overlay.remove_selected(state)),
            StoreEvent::Paste => self.edit(|overlay, state| overlay.paste_into(state)),
            StoreEvent::CopySelection => {
                if let Some(state) = self.state.as_ref() {
                    let copied = self.overlay.copy_selection(state);
                    if copied > 0 {
                        self.set_status(StatusMessage::info(format!("Copied {} item(s)", copied)));
                    }
                }
                Vec::new()
            }
            StoreEvent::Draft { source, color, row } => self.draft(source, color, row),
            StoreEvent::FetchCompleted { purpose, result } => self.fetch_completed(purpose, result),
            StoreEvent::PersistCompleted { fingerprint, result } => {
                self.persist_completed(fingerprint, result);
                Vec::new()
            }
            StoreEvent::MoveCompleted { predicted, result } => self.move_completed(predicted, result),
            StoreEvent::Shutdown => {
                info!("Session {:?} ending", self.session);
                self.session = None;
                self.connection = ConnectionState::Disconnected;
                self.touch();
                vec![Effect::Teardown]
            }
        };

        if gesture {
            effects.extend(self.user_activity());
        }
        effects
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn set_status(&mut self, status: StatusMessage) {
        self.status = Some(status);
        self.touch();
    }

    fn report(&mut self, err: SyncError) {
        self.set_status(StatusMessage::from(&err));
    }

    fn start(&mut self) -> Vec<Effect> {
        if matches!(
            self.connection,
            ConnectionState::Connecting | ConnectionState::Connected { .. }
        ) {
            return Vec::new();
        }
        let session = Uuid::new_v4();
        info!("Starting session {}", session);
        self.session = Some(session);
        self.connection = ConnectionState::Connecting;
        self.touch();
        vec![Effect::Fetch {
            purpose: FetchPurpose::Init,
            key: None,
        }]
    }

    fn poll_tick(&mut self) -> Vec<Effect> {
        let gate = self.gate();
        if !should_sync(&gate) {
            debug!(?gate, "Poll skipped");
            return Vec::new();
        }
        vec![Effect::Fetch {
            purpose: FetchPurpose::Poll,
            key: None,
        }]
    }

    fn manual_refresh(&mut self) -> Vec<Effect> {
        if !self.connection.is_connected() {
            self.report(SyncError::NotConnected);
            return Vec::new();
        }
        if self.mutations_in_flight > 0 {
            self.report(SyncError::Busy);
            return Vec::new();
        }
        if self.config.grace == GraceRelease::OnManualRefresh {
            self.just_loaded = false;
        }
        vec![Effect::Fetch {
            purpose: FetchPurpose::Manual,
            key: None,
        }]
    }

    fn user_activity(&mut self) -> Vec<Effect> {
        self.user_active = true;
        self.activity_generation += 1;
        vec![Effect::ArmInactivityTimer {
            generation: self.activity_generation,
            after: self.config.inactivity_threshold,
        }]
    }

    /// Replace local state with a remote one and remember its fingerprint
    fn apply_remote(&mut self, state: GameState, fp: Fingerprint) {
        self.state = Some(state);
        self.last_fingerprint = Some(fp);
        self.unsynced = false;
        self.touch();
    }

    /// Install a locally produced state and persist it if the backend can address it
    fn apply_local(&mut self, state: GameState) -> Vec<Effect> {
        let persistable = state.position_key.is_persistable() && self.connection.is_connected();
        self.state = Some(state.clone());
        self.unsynced = true;
        self.touch();

        if !persistable {
            self.set_status(StatusMessage::info("Local position; changes are not saved"));
            return Vec::new();
        }
        self.mutations_in_flight += 1;
        vec![Effect::Persist(state)]
    }

    fn fetch_completed(
        &mut self,
        purpose: FetchPurpose,
        result: Result<GameState, RemoteError>,
    ) -> Vec<Effect> {
        if self.session.is_none() {
            debug!(?purpose, "Dropping fetch result for a closed session");
            return Vec::new();
        }

        let state = match result {
            Ok(state) => state,
            Err(e) if purpose == FetchPurpose::Init => {
                warn!("Session init failed: {}", e);
                self.connection = ConnectionState::Error(e.to_string());
                self.report(SyncError::Network(e));
                return Vec::new();
            }
            Err(e) => {
                warn!(?purpose, "Fetch failed: {}", e);
                self.report(SyncError::Network(e));
                return Vec::new();
            }
        };

        let fp = fingerprint(&state);
        if !purpose.forces_apply() && self.last_fingerprint == Some(fp) {
            debug!(fingerprint = %fp, "Remote state unchanged");
            return Vec::new();
        }

        info!(?purpose, fingerprint = %fp, key = %state.position_key, "Applying remote state");
        self.apply_remote(state, fp);

        if purpose == FetchPurpose::Init {
            self.connection = ConnectionState::Connected { stable: false };
            debug!("First state applied, sync loop armed");
            self.connection = ConnectionState::Connected { stable: true };
            self.set_status(StatusMessage::info("Connected"));
        }
        Vec::new()
    }

    fn persist_completed(&mut self, fp: Fingerprint, result: Result<(), RemoteError>) {
        self.mutations_in_flight = self.mutations_in_flight.saturating_sub(1);
        match result {
            Ok(()) => {
                // The remote now matches this edit; a poll returning it is not news.
                self.last_fingerprint = Some(fp);
                if self.mutations_in_flight == 0 {
                    self.unsynced = false;
                    self.touch();
                }
            }
            Err(e) => {
                // Local edit is kept; the user sees that it was not saved.
                warn!("Persist failed: {}", e);
                self.report(SyncError::PersistDesync(e.to_string()));
            }
        }
    }

    fn load_position(&mut self, state: GameState) -> Vec<Effect> {
        if !self.connection.is_connected() {
            self.report(SyncError::NotConnected);
            return Vec::new();
        }
        info!(key = %state.position_key, "Loading position");
        self.overlay.clear_selection();
        self.just_loaded = true;
        self.grace_generation += 1;

        let mut effects = self.apply_local(state);
        if let GraceRelease::AfterWindow(after) = self.config.grace {
            effects.push(Effect::ArmGraceTimer {
                generation: self.grace_generation,
                after,
            });
        }
        effects
    }

    fn edit<F>(&mut self, op: F) -> Vec<Effect>
    where
        F: FnOnce(&EditOverlay, &GameState) -> EditOutcome,
    {
        let Some(state) = self.state.as_ref() else {
            return Vec::new();
        };
        match op(&self.overlay, state) {
            EditOutcome::Unchanged => Vec::new(),
            EditOutcome::Rejected(message) => {
                self.set_status(StatusMessage::info(message));
                Vec::new()
            }
            EditOutcome::Mutated(next) => self.apply_local(next),
        }
    }

    fn draft(&mut self, source: DraftSource, color: TileColor, row: usize) -> Vec<Effect> {
        let Some(state) = self.state.as_ref() else {
            return Vec::new();
        };
        let mv = match construct(state, source, color, row) {
            Ok(mv) => mv,
            Err(rejection) => {
                debug!(%source, ?color, row, "Draft refused: {}", rejection);
                self.report(SyncError::Rejected(rejection));
                return Vec::new();
            }
        };

        let predicted = predict(state, &mv);
        if !state.position_key.is_persistable() || !self.connection.is_connected() {
            self.state = Some(predicted);
            self.unsynced = true;
            self.set_status(StatusMessage::info("Move applied locally only"));
            return Vec::new();
        }

        self.mutations_in_flight += 1;
        vec![Effect::ExecuteMove {
            key: state.position_key.clone(),
            mv,
            player: state.current_player,
            predicted,
        }]
    }

    fn move_completed(
        &mut self,
        predicted: GameState,
        result: Result<MoveResponse, RemoteError>,
    ) -> Vec<Effect> {
        self.mutations_in_flight = self.mutations_in_flight.saturating_sub(1);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Move submission failed: {}", e);
                self.report(SyncError::Network(e));
                return Vec::new();
            }
        };

        if !response.success {
            let reason = response
                .error
                .unwrap_or_else(|| "no reason given".to_string());
            info!("Engine rejected move: {}", reason);
            self.report(SyncError::ValidationRejected(reason));
            return Vec::new();
        }

        let Some(new_key) = response.new_position_key else {
            self.report(SyncError::ValidationRejected(
                "engine accepted the move without a position key".to_string(),
            ));
            return Vec::new();
        };

        // Edits made while the move was in flight are superseded by the engine's position.
        let mut next = predicted;
        next.position_key = new_key.clone();
        self.state = Some(next);
        self.touch();
        if response.game_over == Some(true) {
            self.set_status(StatusMessage::info("Game over"));
        }

        vec![Effect::Fetch {
            purpose: FetchPurpose::AfterMove,
            key: Some(new_key),
        }]
    }
}
