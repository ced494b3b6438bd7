//! Remote player registry.
//!
//! Maps peer-assigned ids to mirrored [`RemoteEntity`]s. The local player's
//! own id never gets a remote entry. Entities are created lazily the first
//! time any message mentions them.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use dogfight_config::{CombatConfig, SyncConfig};
use dogfight_net::{EntityId, PlayerData};

use crate::entity::RemoteEntity;
use crate::events::{EventQueue, GameEvent};

/// Settings given to every newly mirrored remote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteDefaults {
    /// Per-tick blend factor toward the reported transform.
    pub interpolation_factor: f32,
    /// Health at full strength.
    pub max_health: f32,
    /// Upper bound for inferred speed.
    pub max_speed: f32,
}

impl RemoteDefaults {
    /// Defaults taken from configuration.
    pub fn from_config(combat: &CombatConfig, sync: &SyncConfig) -> Self {
        Self {
            interpolation_factor: sync.interpolation_factor.clamp(0.0, 1.0),
            max_health: combat.max_health,
            max_speed: sync.max_speed,
        }
    }
}

/// Whether the scene can receive remote entities yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneGate {
    /// Rosters are held back until the scene reports ready.
    Pending,
    /// Rosters are ingested on arrival.
    Ready,
}

/// Id to entity table for remote players.
#[derive(Debug)]
pub struct EntityRegistry {
    entities: HashMap<EntityId, RemoteEntity>,
    local_id: Option<EntityId>,
    gate: SceneGate,
    pending_roster: Option<Vec<PlayerData>>,
    defaults: RemoteDefaults,
}

impl EntityRegistry {
    /// Empty registry.
    pub fn new(defaults: RemoteDefaults, gate: SceneGate) -> Self {
        Self {
            entities: HashMap::new(),
            local_id: None,
            gate,
            pending_roster: None,
            defaults,
        }
    }

    // -----------------------------------------------------------------------
    // Local identity
    // -----------------------------------------------------------------------

    /// Id the peer assigned to the local player, once known.
    pub fn local_id(&self) -> Option<&EntityId> {
        self.local_id.as_ref()
    }

    /// Whether `id` is the local player.
    pub fn is_local(&self, id: &EntityId) -> bool {
        self.local_id.as_ref() == Some(id)
    }

    /// Record the local player's id. A remote mirror already registered
    /// under that id is removed and returned.
    pub fn set_local_id(&mut self, id: EntityId, events: &mut EventQueue) -> Option<RemoteEntity> {
        let shadowed = self.remove(&id, events);
        self.local_id = Some(id);
        shadowed
    }

    /// Forget the local player's id.
    pub fn clear_local_id(&mut self) {
        self.local_id = None;
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// The remote for `data.id`, created from `data` if unknown. Returns
    /// `None` for the local player's id.
    pub fn get_or_create(
        &mut self,
        data: &PlayerData,
        events: &mut EventQueue,
    ) -> Option<&mut RemoteEntity> {
        if self.is_local(&data.id) {
            return None;
        }
        match self.entities.entry(data.id.clone()) {
            Entry::Occupied(entry) => Some(entry.into_mut()),
            Entry::Vacant(entry) => {
                tracing::debug!(id = %data.id, "Mirroring new remote player");
                events.push(GameEvent::PlaneCreated {
                    id: data.id.clone(),
                    callsign: data.callsign.clone(),
                });
                Some(entry.insert(RemoteEntity::spawn(data, &self.defaults)))
            }
        }
    }

    /// Drop the remote for `id`. The caller owns any pending removal task
    /// on the returned entity.
    pub fn remove(&mut self, id: &EntityId, events: &mut EventQueue) -> Option<RemoteEntity> {
        let removed = self.entities.remove(id)?;
        tracing::debug!(id = %id, "Removed remote player");
        events.push(GameEvent::PlaneRemoved { id: id.clone() });
        Some(removed)
    }

    /// Drop every remote, emitting a removal event for each.
    pub fn clear(&mut self, events: &mut EventQueue) -> Vec<RemoteEntity> {
        let mut ids: Vec<_> = self.entities.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids.iter()
            .filter_map(|id| self.remove(id, events))
            .collect()
    }

    /// Remote with id `id`.
    pub fn get(&self, id: &EntityId) -> Option<&RemoteEntity> {
        self.entities.get(id)
    }

    /// Mutable remote with id `id`.
    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut RemoteEntity> {
        self.entities.get_mut(id)
    }

    /// Whether `id` is mirrored.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Number of mirrored remotes.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no remotes are mirrored.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Ids of every mirrored remote, sorted.
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Iterate remotes in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &RemoteEntity> {
        self.entities.values()
    }

    /// Iterate remotes mutably in arbitrary order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RemoteEntity> {
        self.entities.values_mut()
    }

    // -----------------------------------------------------------------------
    // Scene gate
    // -----------------------------------------------------------------------

    /// Current gate state.
    pub fn scene_gate(&self) -> SceneGate {
        self.gate
    }

    /// Offer a roster for ingestion. Returns it back when the scene is
    /// ready; otherwise holds it (replacing any older held roster) and
    /// returns `None`.
    pub fn admit_roster(&mut self, roster: Vec<PlayerData>) -> Option<Vec<PlayerData>> {
        match self.gate {
            SceneGate::Ready => Some(roster),
            SceneGate::Pending => {
                tracing::debug!(players = roster.len(), "Scene not ready, holding roster");
                self.pending_roster = Some(roster);
                None
            }
        }
    }

    /// Open the gate. Returns the held roster the first time only.
    pub fn mark_scene_ready(&mut self) -> Option<Vec<PlayerData>> {
        if self.gate == SceneGate::Ready {
            return None;
        }
        self.gate = SceneGate::Ready;
        self.pending_roster.take()
    }

    /// Whether a roster is being held.
    pub fn has_pending_roster(&self) -> bool {
        self.pending_roster.is_some()
    }

    /// Drop a held roster.
    pub fn discard_pending_roster(&mut self) {
        self.pending_roster = None;
    }
}
