//! Passive world model: arena geometry, dynamic objects and the controlled
//! ship. Pure data; decoding lives in [`crate::snapshot`].

pub mod game_object;
pub mod game_state;

pub use game_object::{GameObject, ObjectType, Position};
pub use game_state::{GameState, World};
