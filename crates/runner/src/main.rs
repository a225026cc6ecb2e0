//! Galaxio match client: connects to the runner hub, registers, and streams
//! one action per tick until the runner ends the session.

mod config;
mod hub;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use galaxio_bot_core::session::Session;
use galaxio_bot_core::snapshot::decode_snapshot;
use galaxio_bot_core::strategy::{RandomHeadingStrategy, Strategy, MIN_ACTION_INTERVAL};

use crate::config::{registration_token, BotConfig};
use crate::hub::{HubConnection, HubEvent, HubState};

/// The runner needs a moment after the hub handshake before it accepts
/// `Register` calls.
const REGISTRATION_SETTLE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::load().context("load bot configuration")?;
    let url = config.runner_url();
    info!(%url, nickname = %config.nickname, "connecting to runner");

    // A failed connect is fatal; there is no retry policy.
    let (hub, events) = HubConnection::connect(&url).await?;
    info!("connection established with runner");

    let session = Arc::new(Mutex::new(Session::new()));
    tokio::spawn(dispatch_events(events, Arc::clone(&session), hub.clone()));

    tokio::time::sleep(REGISTRATION_SETTLE).await;
    info!("registering with the runner");
    hub.best_effort(
        "Register",
        vec![json!(registration_token()), json!(config.nickname)],
    );

    tokio::spawn(run_action_loop(
        hub.clone(),
        Arc::clone(&session),
        Box::new(RandomHeadingStrategy),
    ));

    // Stay alive until the transport reaches its terminal state, whichever
    // path gets there first.
    hub.closed().await;
    session.lock().await.close();
    info!("session over, shutting down");
    Ok(())
}

/// Applies inbound hub events to the session. Payloads with an unexpected
/// shape are logged and dropped; they never take the session down.
async fn dispatch_events(
    mut events: mpsc::UnboundedReceiver<HubEvent>,
    session: Arc<Mutex<Session>>,
    hub: HubConnection,
) {
    while let Some(event) = events.recv().await {
        match event.target.as_str() {
            "Registered" => match event.arguments.first().and_then(Value::as_str) {
                Some(id) => {
                    info!(id, "registered with the runner");
                    session.lock().await.register(id.to_string());
                }
                None => warn!("Registered event without an id"),
            },
            "ReceiveGameState" => match decode_snapshot(&event.arguments) {
                Ok(game_state) => session.lock().await.apply_game_state(game_state),
                Err(error) => warn!(%error, "discarding malformed game state"),
            },
            "ReceiveGameComplete" => {
                info!(payload = ?event.arguments, "game complete");
            }
            "Disconnect" => {
                info!("runner requested disconnect");
                hub.stop();
            }
            other => debug!(event = other, "unhandled hub event"),
        }
    }
}

/// The tick-response cycle: wait out the minimum interval, then compute and
/// dispatch one action. Exits as soon as the connection leaves `Connected`.
async fn run_action_loop(
    hub: HubConnection,
    session: Arc<Mutex<Session>>,
    mut strategy: Box<dyn Strategy>,
) {
    let mut tick = tokio::time::interval(MIN_ACTION_INTERVAL);
    // Coalesce missed ticks instead of bursting to catch up.
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tick.tick().await;
        if hub.state() != HubState::Connected {
            break;
        }

        let action = {
            let mut session = session.lock().await;
            let Some(bot) = session.bot().cloned() else {
                // Not registered yet; the first snapshot may also still be
                // in flight.
                continue;
            };
            let action = strategy.compute_next(&bot, session.last_action());
            session.record_action(action.clone());
            action
        };

        hub.best_effort("SendPlayerAction", vec![action.to_wire()]);
    }
    debug!("action loop stopped");
}
