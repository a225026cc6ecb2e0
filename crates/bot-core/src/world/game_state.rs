use std::collections::HashMap;

use super::game_object::{GameObject, Position};

/// Arena description, refreshed with every snapshot. `current_tick` is
/// server-authoritative and strictly increasing across snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct World {
    pub center_point: Position,
    pub radius: f64,
    pub current_tick: u64,
}

/// One full point-in-time snapshot of the observable world. A new snapshot
/// replaces the previous one wholesale; there is no incremental merge.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameState {
    pub world: World,
    /// All objects keyed by id. Player objects are inserted after world
    /// objects, so on an id collision the player entry wins.
    pub objects: HashMap<String, GameObject>,
}

impl GameState {
    pub fn find(&self, id: &str) -> Option<&GameObject> {
        self.objects.get(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
