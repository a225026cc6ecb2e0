//! Per-connection mutable state, shared between the inbound event handlers
//! and the action loop. Callers wrap a [`Session`] in their own lock; every
//! method here replaces whole records so readers never observe a half-applied
//! snapshot.

use crate::action::PlayerAction;
use crate::world::{GameObject, GameState, ObjectType, Position};

/// Size and speed the runner assigns a freshly spawned ship.
const SPAWN_SIZE: i32 = 10;
const SPAWN_SPEED: i32 = 20;

#[derive(Debug, Default)]
pub struct Session {
    bot_id: Option<String>,
    bot: Option<GameObject>,
    game_state: GameState,
    last_action: Option<PlayerAction>,
    closed: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the id assigned by the runner and seeds the controlled ship
    /// with its spawn defaults. Registration can race the first snapshot;
    /// whichever `apply_game_state` comes next refreshes the seed with real
    /// data.
    pub fn register(&mut self, id: String) {
        if self.closed {
            return;
        }
        self.bot = Some(GameObject {
            id: id.clone(),
            size: SPAWN_SIZE,
            speed: SPAWN_SPEED,
            current_heading: 0,
            position: Position::ORIGIN,
            object_type: ObjectType::Player,
        });
        self.bot_id = Some(id);
    }

    /// Replaces the snapshot wholesale and refreshes the cached controlled
    /// ship. A snapshot that does not contain our id leaves the previous
    /// copy in place as the last known state; that is a fallback, not an
    /// error.
    pub fn apply_game_state(&mut self, game_state: GameState) {
        if self.closed {
            return;
        }
        if let Some(id) = &self.bot_id {
            if let Some(me) = game_state.find(id) {
                self.bot = Some(me.clone());
            }
        }
        self.game_state = game_state;
    }

    pub fn record_action(&mut self, action: PlayerAction) {
        if self.closed {
            return;
        }
        self.last_action = Some(action);
    }

    /// Terminal. After this every mutation is ignored.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn bot(&self) -> Option<&GameObject> {
        self.bot.as_ref()
    }

    pub fn bot_id(&self) -> Option<&str> {
        self.bot_id.as_deref()
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn last_action(&self) -> Option<&PlayerAction> {
        self.last_action.as_ref()
    }
}
