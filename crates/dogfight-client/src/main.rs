//! Headless dogfight client.
//!
//! Connects to a peer over WebSocket (or flies offline against a local
//! bot), drives the local plane with a scripted pilot, and logs the game
//! events the sync layer produces.
//!
//! Run with: `cargo run -p dogfight-client -- --server 127.0.0.1 --port 8080`

mod pilot;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use dogfight_config::{CliArgs, Config, ConfigError, default_config_dir};
use dogfight_multiplayer::{GameEvent, Session, SimEvent};
use dogfight_net::{EntityId, NotificationLevel, WsConnector};
use glam::Vec3;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use crate::pilot::CirclePilot;

/// Simulation rate of the client loop.
const TICK_RATE_HZ: f64 = 60.0;

/// Time spent as a wreck before the local player respawns.
const RESPAWN_DELAY: Duration = Duration::from_secs(3);

/// Id of the offline sparring bot.
const BOT_ID: &str = "bot-1";

/// CLI arguments for the client binary.
#[derive(Parser, Debug)]
#[command(name = "dogfight-client", about = "Headless dogfight multiplayer client")]
struct ClientArgs {
    #[command(flatten)]
    cli: CliArgs,

    /// Fly offline against a local bot instead of connecting.
    #[arg(long)]
    offline: bool,

    /// Seconds to fly before disconnecting.
    #[arg(long, default_value_t = 30)]
    seconds: u64,

    /// Directory for JSON log files (debug builds only).
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = ClientArgs::parse();

    // Load config from disk (or defaults), then apply CLI overrides.
    let (mut config, config_error) = load_config(&args.cli);
    config.apply_cli_overrides(&args.cli);

    let json_log =
        dogfight_log::init_logging(args.log_dir.as_deref(), cfg!(debug_assertions), Some(&config));
    if let Some(path) = json_log {
        debug!(path = %path.display(), "JSON event log enabled");
    }
    if let Some(e) = config_error {
        warn!(error = %e, "Falling back to default configuration");
    }

    info!("Dogfight client");
    info!(
        "Peer: {} | Update rate: {} Hz | Offline: {}",
        config.network.server_url(),
        config.network.update_rate_hz,
        args.offline
    );

    let connector = match WsConnector::current() {
        Ok(connector) => connector,
        Err(e) => {
            error!(error = %e, "Cannot create WebSocket connector");
            return;
        }
    };
    let mut session = Session::new(&config, Box::new(connector));
    session.mark_scene_ready();

    let pilot = CirclePilot::new(Vec3::new(0.0, 300.0, 0.0), 400.0, 80.0, 0.0);
    let bot_pilot = CirclePilot::new(Vec3::new(0.0, 300.0, 0.0), 400.0, 60.0, std::f32::consts::PI);
    let bot_id = EntityId::new(BOT_ID);

    session.local_mut().transform = pilot.transform_at(0.0);
    if args.offline {
        session.spawn_bot(bot_id.clone(), bot_pilot.transform_at(0.0));
    } else if let Err(e) = session.connect(None, None) {
        error!(error = %e, "Could not start connection");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / TICK_RATE_HZ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let run_for = Duration::from_secs(args.seconds);
    let start = Instant::now();
    let mut last = Duration::ZERO;
    let mut respawn_at: Option<Duration> = None;

    loop {
        ticker.tick().await;
        let now = start.elapsed();
        let dt = (now - last).as_secs_f32();
        last = now;
        let t = now.as_secs_f32();

        if session.local().vitals.is_alive() {
            pilot.fly(session.local_mut(), t);
            if pilot.wants_fire(t) {
                session.fire();
            }
        } else if respawn_at.is_none() {
            respawn_at = Some(now + RESPAWN_DELAY);
        }
        if let Some(at) = respawn_at
            && now >= at
        {
            session.respawn_local(pilot.transform_at(t));
            respawn_at = None;
        }

        if args.offline {
            if session.state().bot(&bot_id).is_none() {
                session.spawn_bot(bot_id.clone(), bot_pilot.transform_at(t));
            }
            if let Some(bot) = session.bot_mut(&bot_id)
                && bot.vitals.is_alive()
            {
                bot_pilot.fly(bot, t);
                if bot_pilot.wants_fire(t) {
                    session.handle_sim_event(SimEvent::Fire {
                        shooter: Some(bot_id.clone()),
                    });
                }
            }
        }

        session.tick(now, dt);
        for event in session.drain_events() {
            log_event(&event);
        }

        if now >= run_for {
            break;
        }
    }

    session.disconnect();
    for event in session.drain_events() {
        log_event(&event);
    }
    info!("Shutting down");
}

/// Load `config.ron` from `--config` or the platform directory. Errors are
/// returned alongside defaults so they can be logged once logging is up.
fn load_config(cli: &CliArgs) -> (Config, Option<ConfigError>) {
    let loaded = match &cli.config_dir {
        Some(dir) => Config::load_or_create(dir),
        None => default_config_dir().and_then(|dir| Config::load_or_create(&dir)),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::Notification { message, level } => match level {
            NotificationLevel::Info => info!("{message}"),
            NotificationLevel::Warning => warn!("{message}"),
            NotificationLevel::Error => error!("{message}"),
        },
        GameEvent::Explosion { id, position } => {
            info!(id = %id, ?position, "Explosion");
        }
        GameEvent::HitEffect { .. } | GameEvent::SoundPlay { .. } | GameEvent::WeaponHeat { .. } => {
            trace!(event = event.name(), "Game event");
        }
        _ => debug!(event = event.name(), ?event, "Game event"),
    }
}
