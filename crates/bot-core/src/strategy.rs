//! Decision computation for the controlled ship.
//!
//! The reference policy is deliberately trivial; anything smarter plugs in
//! behind [`Strategy`] without touching the session loop or the transport.

use std::time::Duration;

use rand::Rng;

use crate::action::{PlayerAction, PlayerActions};
use crate::world::GameObject;

/// Minimum spacing between two decisions. The runner samples input at a
/// fixed cadence; sending faster than it reads only fills its queue. Callers
/// wait this out *before* computing, not after, so the first decision goes
/// out immediately.
pub const MIN_ACTION_INTERVAL: Duration = Duration::from_millis(20);

pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    /// Computes the next command from the latest known state of our ship and
    /// the previously sent command.
    fn compute_next(&mut self, bot: &GameObject, previous: Option<&PlayerAction>) -> PlayerAction;
}

/// Reference policy: full speed ahead on a uniformly random heading.
#[derive(Debug, Default)]
pub struct RandomHeadingStrategy;

impl Strategy for RandomHeadingStrategy {
    fn name(&self) -> &'static str {
        "random_heading"
    }

    fn compute_next(&mut self, bot: &GameObject, _previous: Option<&PlayerAction>) -> PlayerAction {
        PlayerAction {
            player_id: bot.id.clone(),
            action: PlayerActions::Forward,
            heading: rand::thread_rng().gen_range(0..360),
        }
    }
}
