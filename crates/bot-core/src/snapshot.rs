//! Decodes the untyped `ReceiveGameState` payload into a typed [`GameState`].
//!
//! The runner sends per-object state as a fixed-order tuple with no field
//! names, so the expected order is written down in exactly one place
//! ([`STATE_TUPLE`]) and the tuple length is validated before any index is
//! touched. Decoding never touches session state; a malformed snapshot is
//! reported to the caller and the previous snapshot stays in effect.

use std::collections::HashMap;
use std::{error::Error, fmt};

use serde_json::Value;

use crate::world::{GameObject, GameState, ObjectType, Position, World};

/// Wire order of the per-object state tuple.
pub const STATE_TUPLE: [&str; 6] = [
    "size",
    "speed",
    "currentHeading",
    "gameObjectType",
    "x",
    "y",
];

const IDX_SIZE: usize = 0;
const IDX_SPEED: usize = 1;
const IDX_HEADING: usize = 2;
const IDX_TYPE: usize = 3;
const IDX_X: usize = 4;
const IDX_Y: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// The outer payload was not the expected single-element argument list.
    BadEnvelope(usize),
    MissingKey(&'static str),
    InvalidValue(&'static str),
    BadStateTuple { id: String, actual: usize },
    UnknownObjectType { id: String, code: i64 },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::BadEnvelope(n) => {
                write!(f, "expected a single snapshot argument, got {n}")
            }
            SnapshotError::MissingKey(key) => write!(f, "missing key: {key}"),
            SnapshotError::InvalidValue(key) => write!(f, "invalid value for {key}"),
            SnapshotError::BadStateTuple { id, actual } => write!(
                f,
                "object {id}: state tuple has {actual} elements, expected {}",
                STATE_TUPLE.len()
            ),
            SnapshotError::UnknownObjectType { id, code } => {
                write!(f, "object {id}: unknown type code {code}")
            }
        }
    }
}

impl Error for SnapshotError {}

/// Decodes the full `ReceiveGameState` argument list: a single-element array
/// wrapping one snapshot map.
pub fn decode_snapshot(arguments: &[Value]) -> Result<GameState, SnapshotError> {
    match arguments {
        [payload] => decode_game_state(payload),
        other => Err(SnapshotError::BadEnvelope(other.len())),
    }
}

/// Decodes one snapshot map: `world` plus the two object sections. Both
/// sections use the same tuple shape and land in one id-keyed collection,
/// player objects last.
pub fn decode_game_state(payload: &Value) -> Result<GameState, SnapshotError> {
    let world = decode_world(require_key(payload, "world")?)?;

    let mut objects = HashMap::new();
    decode_section(require_key(payload, "gameObjects")?, "gameObjects", &mut objects)?;
    decode_section(require_key(payload, "playerObjects")?, "playerObjects", &mut objects)?;

    Ok(GameState { world, objects })
}

fn decode_world(world: &Value) -> Result<World, SnapshotError> {
    let center = require_key(world, "centerPoint")?;
    Ok(World {
        center_point: Position {
            x: require_f64(center, "x")?,
            y: require_f64(center, "y")?,
        },
        radius: require_f64(world, "radius")?,
        current_tick: require_u64(world, "currentTick")?,
    })
}

fn decode_section(
    section: &Value,
    key: &'static str,
    out: &mut HashMap<String, GameObject>,
) -> Result<(), SnapshotError> {
    let map = section.as_object().ok_or(SnapshotError::InvalidValue(key))?;
    for (id, state) in map {
        let object = decode_object(id, state)?;
        // Last write wins on duplicate ids across sections.
        out.insert(id.clone(), object);
    }
    Ok(())
}

fn decode_object(id: &str, state: &Value) -> Result<GameObject, SnapshotError> {
    let tuple = state
        .as_array()
        .ok_or(SnapshotError::InvalidValue("object state"))?;
    if tuple.len() != STATE_TUPLE.len() {
        return Err(SnapshotError::BadStateTuple {
            id: id.to_string(),
            actual: tuple.len(),
        });
    }

    let code = tuple[IDX_TYPE]
        .as_i64()
        .ok_or(SnapshotError::InvalidValue(STATE_TUPLE[IDX_TYPE]))?;
    let object_type = ObjectType::from_code(code).ok_or_else(|| SnapshotError::UnknownObjectType {
        id: id.to_string(),
        code,
    })?;

    Ok(GameObject {
        id: id.to_string(),
        size: tuple_i32(tuple, IDX_SIZE)?,
        speed: tuple_i32(tuple, IDX_SPEED)?,
        current_heading: tuple_i32(tuple, IDX_HEADING)?,
        position: Position {
            x: tuple_f64(tuple, IDX_X)?,
            y: tuple_f64(tuple, IDX_Y)?,
        },
        object_type,
    })
}

fn require_key<'a>(value: &'a Value, key: &'static str) -> Result<&'a Value, SnapshotError> {
    value.get(key).ok_or(SnapshotError::MissingKey(key))
}

fn require_f64(value: &Value, key: &'static str) -> Result<f64, SnapshotError> {
    require_key(value, key)?
        .as_f64()
        .ok_or(SnapshotError::InvalidValue(key))
}

fn require_u64(value: &Value, key: &'static str) -> Result<u64, SnapshotError> {
    require_key(value, key)?
        .as_u64()
        .ok_or(SnapshotError::InvalidValue(key))
}

fn tuple_i32(tuple: &[Value], idx: usize) -> Result<i32, SnapshotError> {
    tuple[idx]
        .as_i64()
        .map(|v| v as i32)
        .ok_or(SnapshotError::InvalidValue(STATE_TUPLE[idx]))
}

fn tuple_f64(tuple: &[Value], idx: usize) -> Result<f64, SnapshotError> {
    tuple[idx]
        .as_f64()
        .ok_or(SnapshotError::InvalidValue(STATE_TUPLE[idx]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(game_objects: Value, player_objects: Value) -> Value {
        json!({
            "world": {
                "centerPoint": {"x": 0, "y": 0},
                "radius": 1000,
                "currentTick": 42,
            },
            "gameObjects": game_objects,
            "playerObjects": player_objects,
        })
    }

    #[test]
    fn decodes_world_and_both_object_sections() {
        let payload = snapshot(
            json!({
                "f1": [3, 0, 0, 2, 10, 20],
                "f2": [3, 0, 0, 2, -10, -20],
            }),
            json!({
                "p1": [12, 18, 90, 1, 5, 5],
            }),
        );

        let state = decode_game_state(&payload).expect("decodes");
        assert_eq!(state.len(), 3);
        assert_eq!(state.world.radius, 1000.0);
        assert_eq!(state.world.current_tick, 42);
        assert_eq!(state.find("p1").expect("p1").object_type, ObjectType::Player);
    }

    #[test]
    fn decodes_the_documented_example() {
        let payload = json!({
            "world": {"centerPoint": {"x": 0, "y": 0}, "radius": 100, "currentTick": 5},
            "gameObjects": {"e1": [10, 2, 90, 1, 3, 4]},
            "playerObjects": {},
        });

        let state = decode_game_state(&payload).expect("decodes");
        assert_eq!(state.world.current_tick, 5);

        let e1 = state.find("e1").expect("e1");
        assert_eq!(e1.id, "e1");
        assert_eq!(e1.size, 10);
        assert_eq!(e1.speed, 2);
        assert_eq!(e1.current_heading, 90);
        assert_eq!(e1.object_type, ObjectType::Player);
        assert_eq!(e1.position, Position::new(3.0, 4.0));
    }

    #[test]
    fn missing_world_key_is_rejected() {
        let payload = json!({
            "gameObjects": {},
            "playerObjects": {},
        });
        assert_eq!(
            decode_game_state(&payload),
            Err(SnapshotError::MissingKey("world"))
        );
    }

    #[test]
    fn missing_world_field_is_rejected() {
        let payload = json!({
            "world": {"centerPoint": {"x": 0, "y": 0}, "radius": 100},
            "gameObjects": {},
            "playerObjects": {},
        });
        assert_eq!(
            decode_game_state(&payload),
            Err(SnapshotError::MissingKey("currentTick"))
        );
    }

    #[test]
    fn unknown_type_code_is_rejected() {
        let payload = snapshot(json!({"x1": [1, 1, 0, 9, 0, 0]}), json!({}));
        assert_eq!(
            decode_game_state(&payload),
            Err(SnapshotError::UnknownObjectType {
                id: "x1".to_string(),
                code: 9,
            })
        );
    }

    #[test]
    fn short_state_tuple_is_rejected() {
        let payload = snapshot(json!({"x1": [1, 1, 0, 2]}), json!({}));
        assert_eq!(
            decode_game_state(&payload),
            Err(SnapshotError::BadStateTuple {
                id: "x1".to_string(),
                actual: 4,
            })
        );
    }

    #[test]
    fn non_numeric_tuple_element_is_rejected() {
        let payload = snapshot(json!({"x1": [1, 1, "east", 2, 0, 0]}), json!({}));
        assert_eq!(
            decode_game_state(&payload),
            Err(SnapshotError::InvalidValue("currentHeading"))
        );
    }

    #[test]
    fn player_section_wins_duplicate_ids() {
        let payload = snapshot(
            json!({"dup": [3, 0, 0, 2, 1, 1]}),
            json!({"dup": [12, 18, 0, 1, 2, 2]}),
        );

        let state = decode_game_state(&payload).expect("decodes");
        assert_eq!(state.len(), 1);
        assert_eq!(state.find("dup").expect("dup").object_type, ObjectType::Player);
    }

    #[test]
    fn envelope_must_be_a_single_argument() {
        let payload = snapshot(json!({}), json!({}));
        assert!(decode_snapshot(std::slice::from_ref(&payload)).is_ok());
        assert_eq!(decode_snapshot(&[]), Err(SnapshotError::BadEnvelope(0)));
        assert_eq!(
            decode_snapshot(&[payload.clone(), payload]),
            Err(SnapshotError::BadEnvelope(2))
        );
    }
}
