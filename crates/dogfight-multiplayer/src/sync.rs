//! Synchronized world state and the rules that change it.
//!
//! [`SyncState`] owns everything a tick touches: the local player, local
//! bots, mirrored remotes, the ballistics engine, hit effects, delayed tasks,
//! and the outbound message queue. Message handlers and the session drive
//! it; it never touches the transport directly.

use std::collections::BTreeMap;
use std::time::Duration;

use dogfight_combat::{
    Arbitration, BallisticsEngine, CollisionTarget, DamageArbitrationPolicy, DamageOutcome,
    DamageReport, FireOutcome, FreeFallTuning, HeatEvent, HitEffectPool, LocalAuthoritative,
    PeerAuthoritative, ProtectionZone, TargetKind, Transform, Vitals, random_tumble,
};
use dogfight_config::Config;
use dogfight_net::{
    self as net, EntityId, LeaderboardEntry, Message, NotificationLevel, PlayerData, Update,
};
use glam::Vec3;

use crate::entity::{Entity, LOCAL_PLAYER_ID, RemoteEntity};
use crate::events::{EventQueue, GameEvent, Sound};
use crate::publisher::player_snapshot;
use crate::registry::{EntityRegistry, RemoteDefaults, SceneGate};
use crate::scheduler::Scheduler;

/// Peak tumble rate of a fresh wreck (radians/s per axis).
const WRECK_TUMBLE_RATE: f32 = 2.0;

/// Owner id given to mirrored volleys that arrive without a shooter.
const UNKNOWN_SHOOTER_ID: &str = "remote";

// ---------------------------------------------------------------------------
// Delayed tasks
// ---------------------------------------------------------------------------

/// Work deferred to a later tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTask {
    /// Drop a destroyed remote's wreck.
    RemoveRemote(EntityId),
    /// Drop a destroyed bot's wreck.
    RemoveBot(EntityId),
    /// Re-announce the local respawn. `last` ends the respawn window.
    ResendRespawn { last: bool },
}

impl SyncTask {
    /// Whether the task belongs to the connection and dies with it.
    pub fn is_network(&self) -> bool {
        !matches!(self, Self::RemoveBot(_))
    }
}

#[derive(Debug, Clone)]
struct SyncTuning {
    damage_per_hit: f32,
    removal_delay: Duration,
    resend_delays: Vec<Duration>,
    free_fall: FreeFallTuning,
    max_health: f32,
    max_speed: f32,
}

impl SyncTuning {
    fn from_config(config: &Config) -> Self {
        let mut resend_delays: Vec<_> = config
            .sync
            .respawn_resend_delays_ms
            .iter()
            .map(|&ms| Duration::from_millis(ms))
            .collect();
        resend_delays.sort();
        Self {
            damage_per_hit: config.combat.damage_per_hit,
            removal_delay: config.sync.removal_delay(),
            resend_delays,
            free_fall: FreeFallTuning::from(&config.combat),
            max_health: config.combat.max_health,
            max_speed: config.sync.max_speed,
        }
    }
}

fn wreck_tumble() -> Vec3 {
    random_tumble(&mut rand::rng(), WRECK_TUMBLE_RATE)
}

// ---------------------------------------------------------------------------
// SyncState
// ---------------------------------------------------------------------------

/// World state shared by the message handlers and the session tick.
pub struct SyncState {
    pub(crate) local: Entity,
    pub(crate) bots: BTreeMap<EntityId, Entity>,
    pub(crate) registry: EntityRegistry,
    pub(crate) ballistics: BallisticsEngine,
    pub(crate) effects: HitEffectPool,
    pub(crate) scheduler: Scheduler<SyncTask>,
    pub(crate) events: EventQueue,
    pub(crate) outbox: Vec<Message>,
    pub(crate) zone: Option<ProtectionZone>,
    pub(crate) player_count: Option<u32>,
    pub(crate) leaderboard: Vec<LeaderboardEntry>,
    pub(crate) now: Duration,
    policy: Box<dyn DamageArbitrationPolicy>,
    connected: bool,
    tuning: SyncTuning,
}

impl SyncState {
    /// Offline state with the local player at the origin.
    pub fn new(config: &Config) -> Self {
        let tuning = SyncTuning::from_config(config);
        let gate = if config.sync.defer_roster_until_scene_ready {
            SceneGate::Pending
        } else {
            SceneGate::Ready
        };
        let local = Entity::new(
            LOCAL_PLAYER_ID,
            Transform::default(),
            tuning.max_health,
            tuning.max_speed,
        );
        Self {
            local,
            bots: BTreeMap::new(),
            registry: EntityRegistry::new(
                RemoteDefaults::from_config(&config.combat, &config.sync),
                gate,
            ),
            ballistics: BallisticsEngine::new(&config.combat),
            effects: HitEffectPool::new(
                config.sync.hit_effect_capacity,
                config.sync.hit_effect_lifetime(),
            ),
            scheduler: Scheduler::new(),
            events: EventQueue::new(),
            outbox: Vec::new(),
            zone: None,
            player_count: None,
            leaderboard: Vec::new(),
            now: Duration::ZERO,
            policy: Box::new(LocalAuthoritative),
            connected: false,
            tuning,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The local player.
    pub fn local(&self) -> &Entity {
        &self.local
    }

    /// Local bot with id `id`.
    pub fn bot(&self, id: &EntityId) -> Option<&Entity> {
        self.bots.get(id)
    }

    /// Every local bot, ordered by id.
    pub fn bots(&self) -> impl Iterator<Item = &Entity> {
        self.bots.values()
    }

    /// Mirrored remote players.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Projectiles and weapon heat.
    pub fn ballistics(&self) -> &BallisticsEngine {
        &self.ballistics
    }

    /// Visible hit effects.
    pub fn effects(&self) -> &HitEffectPool {
        &self.effects
    }

    /// Active protection zone.
    pub fn zone(&self) -> Option<&ProtectionZone> {
        self.zone.as_ref()
    }

    /// Last player count announced by the peer.
    pub fn player_count(&self) -> Option<u32> {
        self.player_count
    }

    /// Last leaderboard announced by the peer.
    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    /// Name of the damage policy in force.
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Whether the peer connection is open.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Number of delayed tasks waiting to run.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    /// Switch between offline and connected rules.
    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        self.policy = if connected {
            Box::new(PeerAuthoritative)
        } else {
            Box::new(LocalAuthoritative)
        };
        tracing::info!(policy = self.policy.name(), "Damage arbitration policy changed");
    }

    /// Adopt the id the peer assigned to the local player.
    pub(crate) fn assign_local_id(&mut self, id: EntityId) {
        if let Some(shadowed) = self.registry.set_local_id(id.clone(), &mut self.events)
            && let Some(handle) = shadowed.pending_removal
        {
            self.scheduler.cancel(handle);
        }
        let previous = std::mem::replace(&mut self.local.id, id);
        self.ballistics.reassign_owner(&previous, &self.local.id);
        tracing::info!(id = %self.local.id, "Local player id assigned");
    }

    /// Ingest a roster of players already in the match.
    pub(crate) fn ingest_roster(&mut self, roster: Vec<PlayerData>) {
        tracing::debug!(players = roster.len(), "Ingesting roster");
        for player in &roster {
            self.apply_player_data(player);
        }
    }

    /// Open the scene gate and ingest a roster held back while it was shut.
    pub(crate) fn mark_scene_ready(&mut self) {
        if let Some(roster) = self.registry.mark_scene_ready() {
            self.ingest_roster(roster);
        }
    }

    /// Drop everything tied to the peer connection.
    pub(crate) fn reset_network_state(&mut self) {
        self.set_connected(false);
        for removed in self.registry.clear(&mut self.events) {
            if let Some(handle) = removed.pending_removal {
                self.scheduler.cancel(handle);
            }
        }
        let cancelled = self.scheduler.cancel_where(SyncTask::is_network);
        self.registry.discard_pending_roster();
        self.registry.clear_local_id();
        let released = self.ballistics.release_where(|p| p.cosmetic);
        self.local.is_respawned = false;
        self.zone = None;
        self.player_count = None;
        self.leaderboard.clear();
        tracing::debug!(cancelled, released, "Network state cleared");
    }

    // -----------------------------------------------------------------------
    // Player state
    // -----------------------------------------------------------------------

    /// Apply one player entry from a roster, join, or update.
    ///
    /// Entries for the local player only carry authoritative health and
    /// destruction. An `isRespawned` entry counts as a respawn only when the
    /// mirror is unknown, destroyed, or awaiting removal.
    pub(crate) fn apply_player_data(&mut self, data: &PlayerData) {
        if self.registry.is_local(&data.id) {
            self.apply_vitals(TargetKind::LocalPlayer, data);
            return;
        }
        let respawning = data.is_respawned == Some(true)
            && self
                .registry
                .get(&data.id)
                .is_none_or(RemoteEntity::awaits_respawn);
        if respawning {
            self.respawn_remote(data);
            return;
        }

        let now = self.now;
        let Some(remote) = self.registry.get_or_create(data, &mut self.events) else {
            return;
        };
        remote.apply_update(data, now);
        self.apply_vitals(TargetKind::Remote, data);
    }

    fn apply_vitals(&mut self, kind: TargetKind, data: &PlayerData) {
        if let Some(health) = data.health {
            self.set_health(kind, &data.id, health);
        }
        if data.is_destroyed == Some(true) {
            self.destroy_vehicle(kind, &data.id);
        }
    }

    /// Bring a remote back to life at the reported state.
    pub(crate) fn respawn_remote(&mut self, data: &PlayerData) {
        if self.registry.is_local(&data.id) {
            self.revive_local(data);
            return;
        }
        let now = self.now;
        let Some(remote) = self.registry.get_or_create(data, &mut self.events) else {
            return;
        };
        remote.respawn(data, now);
        if let Some(handle) = remote.pending_removal.take() {
            self.scheduler.cancel(handle);
        }
        tracing::info!(id = %data.id, "Remote player respawned");
        self.events.push(GameEvent::PlaneRespawned {
            id: data.id.clone(),
        });
    }

    /// Apply a respawn the peer announced for the local player.
    fn revive_local(&mut self, data: &PlayerData) {
        let transform = Transform::new(
            data.position
                .map(Vec3::from)
                .unwrap_or(self.local.transform.position),
            data.rotation
                .map(Vec3::from)
                .unwrap_or(self.local.transform.rotation),
        );
        self.reset_local(transform, data.health);
    }

    fn reset_local(&mut self, transform: Transform, health: Option<f32>) {
        self.local.vitals.revive(health);
        self.local.transform = transform;
        self.local.velocity = Vec3::ZERO;
        self.local.speed = 0.0;
        self.events.push(GameEvent::PlaneRespawned {
            id: self.local.id.clone(),
        });
    }

    /// Respawn the local player at `transform`.
    ///
    /// While connected the respawn is announced at once and re-announced
    /// after each configured delay; the respawn flag clears after the last.
    /// A second respawn cancels the previous announcements.
    pub(crate) fn respawn_local(&mut self, transform: Transform) {
        self.reset_local(transform, None);
        self.scheduler
            .cancel_where(|task| matches!(task, SyncTask::ResendRespawn { .. }));

        if !self.connected || self.registry.local_id().is_none() {
            self.local.is_respawned = false;
            return;
        }
        self.local.is_respawned = !self.tuning.resend_delays.is_empty();
        self.outbox.push(self.local_update(true));
        let count = self.tuning.resend_delays.len();
        for (i, delay) in self.tuning.resend_delays.iter().enumerate() {
            self.scheduler.schedule(
                self.now + *delay,
                SyncTask::ResendRespawn {
                    last: i + 1 == count,
                },
            );
        }
        tracing::info!(resends = count, "Local respawn announced");
    }

    /// Single-player update carrying the local snapshot.
    pub(crate) fn local_update(&self, respawned: bool) -> Message {
        Message::Update(Update::single(player_snapshot(&self.local, respawned)))
    }

    /// Remove a remote and cancel its pending removal.
    pub(crate) fn remove_remote(&mut self, id: &EntityId) -> Option<RemoteEntity> {
        let removed = self.registry.remove(id, &mut self.events)?;
        if let Some(handle) = removed.pending_removal {
            self.scheduler.cancel(handle);
        }
        Some(removed)
    }

    /// Add a locally simulated bot. Fails if the id is taken.
    pub(crate) fn spawn_bot(&mut self, id: EntityId, transform: Transform) -> bool {
        if id == self.local.id || self.bots.contains_key(&id) || self.registry.contains(&id) {
            return false;
        }
        let bot = Entity::new(
            id.clone(),
            transform,
            self.tuning.max_health,
            self.tuning.max_speed,
        );
        tracing::debug!(id = %id, "Spawned bot");
        self.bots.insert(id, bot);
        true
    }

    // -----------------------------------------------------------------------
    // Combat
    // -----------------------------------------------------------------------

    /// Who simulates `id`.
    pub(crate) fn target_kind(&self, id: &EntityId) -> Option<TargetKind> {
        if *id == self.local.id {
            Some(TargetKind::LocalPlayer)
        } else if self.bots.contains_key(id) {
            Some(TargetKind::LocalBot)
        } else if self.registry.contains(id) {
            Some(TargetKind::Remote)
        } else {
            None
        }
    }

    fn vitals_mut(&mut self, kind: TargetKind, id: &EntityId) -> Option<&mut Vitals> {
        match kind {
            TargetKind::LocalPlayer => Some(&mut self.local.vitals),
            TargetKind::LocalBot => self.bots.get_mut(id).map(|b| &mut b.vitals),
            TargetKind::Remote => self.registry.get_mut(id).map(|r| &mut r.entity.vitals),
        }
    }

    /// Remove health without consulting the policy.
    pub(crate) fn apply_damage(&mut self, kind: TargetKind, id: &EntityId, amount: f32) {
        let tumble = wreck_tumble();
        let Some(vitals) = self.vitals_mut(kind, id) else {
            return;
        };
        if vitals.apply_damage(amount, tumble) == DamageOutcome::Destroyed {
            self.on_vehicle_destroyed(kind, id);
        }
    }

    /// Overwrite health with an authoritative value.
    pub(crate) fn set_health(&mut self, kind: TargetKind, id: &EntityId, health: f32) {
        let tumble = wreck_tumble();
        let Some(vitals) = self.vitals_mut(kind, id) else {
            return;
        };
        if vitals.set_health(health, tumble) == DamageOutcome::Destroyed {
            self.on_vehicle_destroyed(kind, id);
        }
    }

    /// Destroy a vehicle outright.
    pub(crate) fn destroy_vehicle(&mut self, kind: TargetKind, id: &EntityId) {
        let tumble = wreck_tumble();
        let Some(vitals) = self.vitals_mut(kind, id) else {
            return;
        };
        if vitals.destroy(tumble) {
            self.on_vehicle_destroyed(kind, id);
        }
    }

    fn on_vehicle_destroyed(&mut self, kind: TargetKind, id: &EntityId) {
        let position = match kind {
            TargetKind::LocalPlayer => Some(self.local.transform.position),
            TargetKind::LocalBot => self.bots.get(id).map(|b| b.transform.position),
            TargetKind::Remote => self.registry.get(id).map(|r| r.entity.transform.position),
        };
        let Some(position) = position else {
            return;
        };
        tracing::info!(id = %id, ?kind, "Vehicle destroyed");
        self.events.push(GameEvent::Explosion {
            id: id.clone(),
            position,
        });
        self.play_sound(Sound::Explosion, position);

        let due = self.now + self.tuning.removal_delay;
        match kind {
            TargetKind::LocalPlayer => {}
            TargetKind::LocalBot => {
                self.scheduler.schedule(due, SyncTask::RemoveBot(id.clone()));
            }
            TargetKind::Remote => {
                let handle = self
                    .scheduler
                    .schedule(due, SyncTask::RemoveRemote(id.clone()));
                if let Some(remote) = self.registry.get_mut(id)
                    && let Some(stale) = remote.pending_removal.replace(handle)
                {
                    self.scheduler.cancel(stale);
                }
            }
        }
    }

    /// Run damage through the active policy.
    pub(crate) fn arbitrate_damage(&mut self, report: DamageReport) {
        let Some(kind) = self.target_kind(&report.target) else {
            tracing::debug!(target_id = %report.target, "Damage for unknown vehicle ignored");
            return;
        };
        let target = report.target.clone();
        match self.policy.arbitrate(report, kind) {
            Arbitration::Apply { amount } => self.apply_damage(kind, &target, amount),
            Arbitration::Report(report) => {
                tracing::debug!(target_id = %report.target, amount = report.amount, "Reporting hit to peer");
                self.outbox.push(Message::Damage(net::Damage {
                    target_id: report.target,
                    amount: report.amount,
                    position: Some(report.position.into()),
                    source_id: report.source,
                }));
            }
            Arbitration::Ignore => {
                tracing::trace!(target_id = %target, "Hit left to the peer");
            }
        }
    }

    /// Fire for `shooter` (the local player when `None`). Returns `None`
    /// when the shooter is unknown or destroyed.
    pub(crate) fn fire(&mut self, shooter: Option<EntityId>) -> Option<FireOutcome> {
        let shooter = shooter.unwrap_or_else(|| self.local.id.clone());
        let vehicle = if shooter == self.local.id {
            &self.local
        } else {
            self.bots.get(&shooter)?
        };
        if !vehicle.vitals.is_alive() {
            return None;
        }
        let (origin, velocity) = (vehicle.transform, vehicle.velocity);

        let outcome = self.ballistics.fire(&shooter, &origin, velocity, self.now);
        if !outcome.fired() {
            tracing::trace!(shooter = %shooter, ?outcome, "Fire request refused");
            return Some(outcome);
        }
        self.play_sound(Sound::Fire, origin.position);
        if shooter == self.local.id && self.connected {
            self.outbox.push(Message::Fire(net::Fire {
                position: origin.position.into(),
                rotation: origin.rotation.into(),
                velocity: velocity.into(),
                player_id: self.registry.local_id().cloned(),
            }));
        }
        Some(outcome)
    }

    /// Mirror a volley fired by a remote player. Echoes of our own fire
    /// are ignored.
    pub(crate) fn mirror_fire(&mut self, fire: &net::Fire) {
        if fire
            .player_id
            .as_ref()
            .is_some_and(|id| self.registry.is_local(id))
        {
            return;
        }
        let owner = fire
            .player_id
            .clone()
            .unwrap_or_else(|| EntityId::new(UNKNOWN_SHOOTER_ID));
        let origin = Transform::new(fire.position.into(), fire.rotation.into());
        let outcome =
            self.ballistics
                .fire_cosmetic(&owner, &origin, fire.velocity.into(), self.now);
        if outcome.fired() {
            self.play_sound(Sound::Fire, origin.position);
        }
    }

    /// Detect this tick's projectile hits and arbitrate each one.
    pub(crate) fn resolve_hits(&mut self) {
        let targets = self.collision_targets();
        let hits = self.ballistics.detect_hits(&targets, self.zone.as_ref());
        for hit in hits {
            self.show_hit(hit.position, true);
            self.arbitrate_damage(DamageReport::from_hit(&hit, self.tuning.damage_per_hit));
        }
    }

    fn collision_targets(&self) -> Vec<CollisionTarget> {
        let mut remotes: Vec<_> = self.registry.iter().map(|r| &r.entity).collect();
        remotes.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        std::iter::once(&self.local)
            .chain(self.bots.values())
            .chain(remotes)
            .map(|e| CollisionTarget {
                id: e.id.clone(),
                position: e.transform.position,
                alive: e.vitals.is_alive(),
            })
            .collect()
    }

    /// Turn the local weapon's heat transitions into game events.
    pub(crate) fn forward_heat_events(&mut self) {
        for (owner, event) in self.ballistics.drain_heat_events() {
            if owner != self.local.id {
                continue;
            }
            self.events.push(match event {
                HeatEvent::Heat { level, max } => GameEvent::WeaponHeat { level, max },
                HeatEvent::Overheated => GameEvent::WeaponOverheat,
                HeatEvent::Cooled => GameEvent::WeaponCooled,
            });
        }
    }

    /// Integrate every wreck for one tick.
    pub(crate) fn step_wrecks(&mut self, dt: f32) {
        let tuning = self.tuning.free_fall;
        let step = |e: &mut Entity| {
            e.vitals
                .step_free_fall(&mut e.transform, &mut e.velocity, &tuning, dt);
        };
        step(&mut self.local);
        self.bots.values_mut().for_each(step);
        self.registry.iter_mut().map(|r| &mut r.entity).for_each(step);
    }

    /// Run every delayed task that has come due.
    pub(crate) fn run_due_tasks(&mut self) {
        for (handle, task) in self.scheduler.drain_due(self.now) {
            match task {
                SyncTask::RemoveRemote(id) => {
                    let current = self
                        .registry
                        .get(&id)
                        .is_some_and(|r| r.pending_removal == Some(handle));
                    if current {
                        self.remove_remote(&id);
                    }
                }
                SyncTask::RemoveBot(id) => {
                    if self.bots.get(&id).is_some_and(Entity::is_destroyed) {
                        self.bots.remove(&id);
                        self.ballistics.remove_weapon(&id);
                        self.events.push(GameEvent::PlaneRemoved { id });
                    }
                }
                SyncTask::ResendRespawn { last } => {
                    if self.connected {
                        self.outbox.push(self.local_update(true));
                    }
                    if last {
                        self.local.is_respawned = false;
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Presentation
    // -----------------------------------------------------------------------

    /// Show an impact, optionally with its sound.
    pub(crate) fn show_hit(&mut self, position: Vec3, play_sound: bool) {
        if let Some(evicted) = self.effects.spawn(position, self.now) {
            tracing::trace!(position = ?evicted.position, "Hit effect evicted");
        }
        self.events.push(GameEvent::HitEffect { position });
        if play_sound {
            self.play_sound(Sound::Hit, position);
        }
    }

    pub(crate) fn play_sound(&mut self, sound: Sound, position: Vec3) {
        self.events.push(GameEvent::SoundPlay { sound, position });
    }

    /// Queue a text notification.
    pub(crate) fn notify(&mut self, message: impl Into<String>, level: NotificationLevel) {
        let message = message.into();
        tracing::info!(?level, "{}", message);
        self.events.push(GameEvent::Notification { message, level });
    }

    /// Display name for `id`, falling back to the id itself.
    pub(crate) fn display_name(&self, id: &EntityId) -> String {
        if *id == self.local.id {
            return self.local.display_name().to_string();
        }
        self.registry
            .get(id)
            .map(|r| r.entity.display_name())
            .or_else(|| self.bots.get(id).map(Entity::display_name))
            .unwrap_or(id.as_str())
            .to_string()
    }
}
