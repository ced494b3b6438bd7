//! Connection lifecycle and the per-tick driver.
//!
//! A [`Session`] owns the transport, the message router, and the
//! [`SyncState`]. It is ticked from the game loop with the current
//! simulation time; all inbound traffic, delayed tasks, combat, and outbound
//! traffic happen inside [`Session::tick`].

use std::time::Duration;

use dogfight_combat::{DamageReport, FireOutcome, TargetKind, Transform};
use dogfight_config::{Config, NetworkConfig};
use dogfight_net::{
    ConnectionState, ConnectionStateWatch, Connector, Destroyed, EntityId, Init, LeaderboardEntry,
    Message, MessageRouter, NotificationLevel, Transport, TransportError, TransportEvent,
    encode_message,
};
use rand::Rng;
use tokio::sync::watch;

use crate::entity::Entity;
use crate::events::{GameEvent, SimEvent};
use crate::handlers::build_router;
use crate::interpolation::interpolate_remotes;
use crate::publisher::StatePublisher;
use crate::registry::EntityRegistry;
use crate::sync::SyncState;

/// Errors returned by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The transport could not be opened.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// Address that was dialled.
        address: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
}

/// Client side of one multiplayer match.
pub struct Session {
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    router: MessageRouter<SyncState>,
    sync: SyncState,
    publisher: StatePublisher,
    connection: ConnectionStateWatch,
    network: NetworkConfig,
}

impl Session {
    /// Offline session that will dial through `connector`.
    pub fn new(config: &Config, connector: Box<dyn Connector>) -> Self {
        let router = build_router();
        tracing::debug!(
            handlers = router.registered_tags().count(),
            "Message router ready"
        );
        Self {
            connector,
            transport: None,
            router,
            sync: SyncState::new(config),
            publisher: StatePublisher::new(config.network.update_rate_hz),
            connection: ConnectionStateWatch::new(),
            network: config.network.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open a connection. Does nothing if already connecting or connected.
    ///
    /// `address` defaults to the configured server; a bare `host:port` gets
    /// a `ws://` scheme. The callsign falls back to the configured one, then
    /// to a generated `Pilot-NNNN`.
    pub fn connect(
        &mut self,
        address: Option<&str>,
        callsign: Option<&str>,
    ) -> Result<(), SessionError> {
        let state = self.connection.current();
        if state != ConnectionState::Disconnected {
            tracing::debug!(?state, "Connect ignored, session already active");
            return Ok(());
        }

        let address = address.map_or_else(|| self.network.server_url(), normalize_address);
        let callsign = callsign
            .map(str::to_string)
            .or_else(|| self.network.callsign.clone())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(generate_callsign);
        self.sync.local.callsign = callsign;

        match self.connector.open(&address) {
            Ok(transport) => {
                tracing::info!(address = %address, callsign = %self.sync.local.callsign, "Connecting");
                self.transport = Some(transport);
                self.connection.set(ConnectionState::Connecting);
                Ok(())
            }
            Err(source) => {
                tracing::warn!(address = %address, error = %source, "Connect failed");
                self.sync
                    .notify(format!("Connection failed: {source}"), NotificationLevel::Error);
                Err(SessionError::Connect { address, source })
            }
        }
    }

    /// Close the connection and drop all network state. The local player
    /// and bots stay.
    pub fn disconnect(&mut self) {
        if self.transport.is_none() && self.connection.current() == ConnectionState::Disconnected {
            return;
        }
        self.teardown("Disconnected".into(), NotificationLevel::Info);
    }

    fn on_opened(&mut self) {
        tracing::info!("Connection open, sending init");
        self.connection.set(ConnectionState::Connected);
        self.sync.set_connected(true);
        let local = &self.sync.local;
        let init = Message::Init(Init {
            callsign: local.callsign.clone(),
            position: local.transform.position.into(),
            rotation: local.transform.rotation.into(),
            health: local.vitals.health(),
        });
        self.sync.outbox.push(init);
        self.flush_outbox();
    }

    fn teardown(&mut self, reason: String, level: NotificationLevel) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        let was = self.connection.set(ConnectionState::Disconnected);
        self.publisher.reset();
        self.sync.outbox.clear();
        self.sync.reset_network_state();
        tracing::info!(?was, reason = %reason, "Session closed");
        if was != ConnectionState::Disconnected {
            self.sync.notify(reason, level);
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance one frame. `now` is the simulation clock, `dt` the frame
    /// time in seconds.
    pub fn tick(&mut self, now: Duration, dt: f32) {
        self.sync.now = now;
        self.pump_transport();
        self.sync.run_due_tasks();

        self.sync.ballistics.step(now, dt);
        self.sync.forward_heat_events();
        self.sync.resolve_hits();
        self.sync.step_wrecks(dt);
        interpolate_remotes(&mut self.sync.registry);
        self.sync.effects.expire(now);

        if self.connection.current() == ConnectionState::Connected
            && self.sync.registry.local_id().is_some()
            && self.publisher.poll(now)
        {
            let update = self.sync.local_update(self.sync.local.is_respawned);
            self.sync.outbox.push(update);
        }
        self.flush_outbox();
    }

    fn pump_transport(&mut self) {
        while let Some(event) = self.transport.as_mut().and_then(|t| t.poll()) {
            match event {
                TransportEvent::Opened => self.on_opened(),
                TransportEvent::Text(text) => {
                    self.router.route_text(&mut self.sync, &text);
                }
                TransportEvent::Closed { reason } => {
                    let reason = reason.map_or_else(
                        || "Disconnected from server".to_string(),
                        |r| format!("Disconnected from server: {r}"),
                    );
                    self.teardown(reason, NotificationLevel::Warning);
                }
                TransportEvent::Error(error) => {
                    tracing::warn!(error = %error, "Transport error");
                    self.teardown(format!("Connection error: {error}"), NotificationLevel::Error);
                }
            }
        }
    }

    fn flush_outbox(&mut self) {
        let outbox = std::mem::take(&mut self.sync.outbox);
        if outbox.is_empty() {
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            tracing::trace!(dropped = outbox.len(), "No transport, dropping outbound messages");
            return;
        };
        for msg in &outbox {
            let text = match encode_message(msg) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, tag = ?msg.tag(), "Failed to encode message");
                    continue;
                }
            };
            if let Err(e) = transport.send(text) {
                tracing::debug!(error = %e, "Send failed, dropping remaining messages");
                break;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Simulation input
    // -----------------------------------------------------------------------

    /// Feed an event from the local simulation.
    pub fn handle_sim_event(&mut self, event: SimEvent) {
        tracing::trace!(event = event.name(), "Simulation event");
        match event {
            SimEvent::Fire { shooter } => {
                self.sync.fire(shooter);
            }
            SimEvent::Damage {
                target,
                amount,
                position,
                source,
            } => {
                let position = position
                    .or_else(|| self.entity(&target).map(|e| e.transform.position))
                    .unwrap_or_default();
                self.sync.arbitrate_damage(DamageReport {
                    target,
                    source,
                    amount,
                    position,
                });
            }
            SimEvent::Destroyed { id, source } => self.sim_destroyed(id, source),
        }
        self.flush_outbox();
    }

    fn sim_destroyed(&mut self, id: EntityId, source: Option<EntityId>) {
        match self.sync.target_kind(&id) {
            Some(TargetKind::LocalPlayer) if self.sync.is_connected() => {
                if let Some(player_id) = self.sync.registry.local_id().cloned() {
                    self.sync.outbox.push(Message::Destroyed(Destroyed {
                        player_id,
                        source_id: source,
                    }));
                }
            }
            Some(TargetKind::Remote) => {
                tracing::debug!(id = %id, "Remote destruction is decided by the peer");
            }
            Some(kind) => self.sync.destroy_vehicle(kind, &id),
            None => tracing::debug!(id = %id, "Destruction of unknown vehicle ignored"),
        }
    }

    /// Fire the local player's guns. `None` if the local player is
    /// destroyed.
    pub fn fire(&mut self) -> Option<FireOutcome> {
        let outcome = self.sync.fire(None);
        self.flush_outbox();
        outcome
    }

    /// Respawn the local player at `transform` and announce it.
    pub fn respawn_local(&mut self, transform: Transform) {
        self.sync.respawn_local(transform);
        self.flush_outbox();
    }

    /// Add a locally simulated bot. Returns `false` if the id is taken.
    pub fn spawn_bot(&mut self, id: impl Into<EntityId>, transform: Transform) -> bool {
        self.sync.spawn_bot(id.into(), transform)
    }

    /// Signal that the scene can show remote players. Flushes a roster
    /// held back until now.
    pub fn mark_scene_ready(&mut self) {
        self.sync.mark_scene_ready();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Take every game event produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.sync.events.drain()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.current()
    }

    /// Subscribe to connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Synchronized world state.
    pub fn state(&self) -> &SyncState {
        &self.sync
    }

    /// The local player.
    pub fn local(&self) -> &Entity {
        &self.sync.local
    }

    /// The local player, for the flight model to drive.
    pub fn local_mut(&mut self) -> &mut Entity {
        &mut self.sync.local
    }

    /// Local bot `id`, for its pilot to drive.
    pub fn bot_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.sync.bots.get_mut(id)
    }

    /// Mirrored remote players.
    pub fn registry(&self) -> &EntityRegistry {
        &self.sync.registry
    }

    /// Last player count announced by the peer.
    pub fn player_count(&self) -> Option<u32> {
        self.sync.player_count()
    }

    /// Last leaderboard announced by the peer.
    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        self.sync.leaderboard()
    }

    fn entity(&self, id: &EntityId) -> Option<&Entity> {
        if *id == self.sync.local.id {
            return Some(&self.sync.local);
        }
        self.sync
            .bots
            .get(id)
            .or_else(|| self.sync.registry.get(id).map(|r| &r.entity))
    }
}

/// Prefix a bare `host:port` with the WebSocket scheme.
fn normalize_address(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("ws://{address}")
    }
}

fn generate_callsign() -> String {
    format!("Pilot-{:04}", rand::rng().random_range(0..10_000))
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
