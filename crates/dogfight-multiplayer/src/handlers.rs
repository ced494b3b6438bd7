//! Inbound message handlers, one per wire type.
//!
//! Every handler receives the already validated message. A handler given
//! the wrong variant does nothing.

use dogfight_combat::{ProtectionZone, TargetKind};
use dogfight_net::{Message, MessageRouter, MessageTag, NotificationLevel};
use glam::Vec3;

use crate::sync::SyncState;

/// Router with a handler for every inbound message type.
pub(crate) fn build_router() -> MessageRouter<SyncState> {
    let mut router = MessageRouter::new();
    router.register(MessageTag::InitAck, on_init_ack);
    router.register(MessageTag::PlayerJoined, on_player_joined);
    router.register(MessageTag::PlayerLeft, on_player_left);
    router.register(MessageTag::Update, on_update);
    router.register(MessageTag::Damage, on_damage);
    router.register(MessageTag::Fire, on_fire);
    router.register(MessageTag::HitEffect, on_hit_effect);
    router.register(MessageTag::Destroyed, on_destroyed);
    router.register(MessageTag::Notification, on_notification);
    router.register(MessageTag::PlayerRespawn, on_player_respawn);
    router.register(MessageTag::PlayerCount, on_player_count);
    router.register(MessageTag::Leaderboard, on_leaderboard);
    router
}

fn on_init_ack(state: &mut SyncState, msg: Message) {
    let Message::InitAck(ack) = msg else {
        return;
    };
    state.assign_local_id(ack.client_id);
    state.zone = ack.protection_zone.map(ProtectionZone::from);
    if let Some(roster) = state.registry.admit_roster(ack.players) {
        state.ingest_roster(roster);
    }
    let message = format!("Connected as {}", state.local.display_name());
    state.notify(message, NotificationLevel::Info);
}

fn on_player_joined(state: &mut SyncState, msg: Message) {
    let Message::PlayerJoined(joined) = msg else {
        return;
    };
    if state.registry.is_local(&joined.player.id) {
        return;
    }
    state.apply_player_data(&joined.player);
    let message = format!("{} joined", state.display_name(&joined.player.id));
    state.notify(message, NotificationLevel::Info);
}

fn on_player_left(state: &mut SyncState, msg: Message) {
    let Message::PlayerLeft(left) = msg else {
        return;
    };
    let name = state.display_name(&left.player_id);
    if state.remove_remote(&left.player_id).is_some() {
        state.notify(format!("{name} left"), NotificationLevel::Info);
    }
}

fn on_update(state: &mut SyncState, msg: Message) {
    let Message::Update(update) = msg else {
        return;
    };
    for player in update.entries() {
        state.apply_player_data(player);
    }
}

fn on_damage(state: &mut SyncState, msg: Message) {
    let Message::Damage(damage) = msg else {
        return;
    };
    if let Some(position) = damage.position {
        state.show_hit(position.into(), true);
    }
    match state.target_kind(&damage.target_id) {
        Some(kind @ (TargetKind::LocalPlayer | TargetKind::Remote)) => {
            state.apply_damage(kind, &damage.target_id, damage.amount);
        }
        Some(TargetKind::LocalBot) | None => {
            tracing::debug!(target_id = %damage.target_id, "Damage for unmirrored vehicle ignored");
        }
    }
}

fn on_fire(state: &mut SyncState, msg: Message) {
    let Message::Fire(fire) = msg else {
        return;
    };
    state.mirror_fire(&fire);
}

fn on_hit_effect(state: &mut SyncState, msg: Message) {
    let Message::HitEffect(effect) = msg else {
        return;
    };
    state.show_hit(Vec3::from(effect.position), effect.play_sound.unwrap_or(true));
}

fn on_destroyed(state: &mut SyncState, msg: Message) {
    let Message::Destroyed(destroyed) = msg else {
        return;
    };
    let victim = destroyed.player_id;
    match state.target_kind(&victim) {
        Some(kind @ (TargetKind::LocalPlayer | TargetKind::Remote)) => {
            state.destroy_vehicle(kind, &victim);
        }
        Some(TargetKind::LocalBot) | None => {
            tracing::debug!(id = %victim, "Destruction of unmirrored vehicle ignored");
            return;
        }
    }

    let by_us = destroyed
        .source_id
        .as_ref()
        .is_some_and(|source| state.registry.is_local(source));
    if by_us && !state.registry.is_local(&victim) {
        let message = format!("You destroyed {}", state.display_name(&victim));
        state.notify(message, NotificationLevel::Info);
    }
}

fn on_notification(state: &mut SyncState, msg: Message) {
    let Message::Notification(notification) = msg else {
        return;
    };
    state.notify(notification.message, notification.level.unwrap_or_default());
}

fn on_player_respawn(state: &mut SyncState, msg: Message) {
    let Message::PlayerRespawn(respawn) = msg else {
        return;
    };
    state.respawn_remote(&respawn.player);
}

fn on_player_count(state: &mut SyncState, msg: Message) {
    let Message::PlayerCount(count) = msg else {
        return;
    };
    tracing::debug!(count = count.count, "Player count");
    state.player_count = Some(count.count);
}

fn on_leaderboard(state: &mut SyncState, msg: Message) {
    let Message::Leaderboard(board) = msg else {
        return;
    };
    state.leaderboard = board.data;
}
