//! Session tests driven through an in-memory peer.

use super::*;
use dogfight_net::{
    Damage, Fire, HitEffect, InitAck, Leaderboard, MemoryConnector, MemoryListener, MemoryPeer,
    Notification, PlayerCount, PlayerData, PlayerJoined, PlayerLeft, PlayerRespawn, Update,
    WireVec3, ZoneData,
};
use glam::Vec3;

const DT: f32 = 0.016;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn id(s: &str) -> EntityId {
    EntityId::new(s)
}

fn player(name: &str, position: Vec3) -> PlayerData {
    let mut data = PlayerData::new(name);
    data.position = Some(position.into());
    data.rotation = Some(WireVec3::default());
    data.health = Some(100.0);
    data
}

fn send(peer: &MemoryPeer, msg: Message) {
    peer.send_message(&msg).unwrap();
}

fn count(events: &[GameEvent], name: &str) -> usize {
    events.iter().filter(|e| e.name() == name).count()
}

fn respawn_announcements(msgs: &[Message]) -> usize {
    msgs.iter()
        .filter(|m| match m {
            Message::Update(update) => update.entries().any(|p| p.is_respawned == Some(true)),
            _ => false,
        })
        .count()
}

fn notifications(events: &[GameEvent]) -> Vec<(String, NotificationLevel)> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::Notification { message, level } => Some((message.clone(), *level)),
            _ => None,
        })
        .collect()
}

struct Harness {
    session: Session,
    listener: MemoryListener,
    now: Duration,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        let (connector, listener) = MemoryConnector::new();
        Self {
            session: Session::new(&config, Box::new(connector)),
            listener,
            now: Duration::ZERO,
        }
    }

    fn tick(&mut self) {
        self.session.tick(self.now, DT);
    }

    fn advance(&mut self, millis: u64) {
        self.now += ms(millis);
        self.tick();
    }

    fn run_for(&mut self, millis: u64, step: u64) {
        let end = self.now + ms(millis);
        while self.now < end {
            self.advance(step);
        }
    }

    /// Connect and open the transport. The init frame is discarded.
    fn connect(&mut self) -> MemoryPeer {
        self.session.connect(None, Some("Tester")).unwrap();
        let (_, mut peer) = self.listener.next().expect("transport opened");
        peer.accept();
        self.tick();
        peer.drain_text();
        peer
    }

    /// Connect and complete the handshake as `me` with `roster`.
    fn join(&mut self, roster: Vec<PlayerData>) -> MemoryPeer {
        let mut peer = self.connect();
        send(
            &peer,
            Message::InitAck(InitAck {
                client_id: id("me"),
                players: roster,
                protection_zone: None,
            }),
        );
        self.tick();
        peer.drain_text();
        self.session.drain_events();
        peer
    }
}

struct RefusingConnector;

impl Connector for RefusingConnector {
    fn open(&self, address: &str) -> Result<Box<dyn Transport>, TransportError> {
        Err(TransportError::InvalidAddress(address.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_connect_sends_init_once_open() {
    let mut h = Harness::new();
    h.session.connect(Some("10.0.0.5:9000"), Some("Tester")).unwrap();
    assert_eq!(h.session.connection_state(), ConnectionState::Connecting);

    let (address, mut peer) = h.listener.next().unwrap();
    assert_eq!(address, "ws://10.0.0.5:9000");
    h.tick();
    assert!(peer.drain_text().is_empty());

    peer.accept();
    h.tick();
    assert_eq!(h.session.connection_state(), ConnectionState::Connected);
    assert_eq!(h.session.state().policy_name(), "peer-authoritative");

    let msgs = peer.drain_messages();
    assert_eq!(msgs.len(), 1);
    let Message::Init(init) = &msgs[0] else {
        panic!("expected init, got {:?}", msgs[0]);
    };
    assert_eq!(init.callsign, "Tester");
    assert_eq!(init.health, 100.0);
}

#[test]
fn test_connect_is_idempotent() {
    let mut h = Harness::new();
    h.session.connect(None, None).unwrap();
    h.session.connect(None, None).unwrap();
    let (_, peer) = h.listener.next().unwrap();
    assert!(h.listener.next().is_none());

    peer.accept();
    h.tick();
    h.session.connect(Some("elsewhere:1"), None).unwrap();
    assert!(h.listener.next().is_none());
    assert_eq!(h.session.connection_state(), ConnectionState::Connected);
}

#[test]
fn test_default_address_and_generated_callsign() {
    let mut h = Harness::new();
    h.session.connect(None, None).unwrap();
    let (address, _peer) = h.listener.next().unwrap();
    assert_eq!(address, Config::default().network.server_url());

    let callsign = &h.session.local().callsign;
    assert!(callsign.starts_with("Pilot-"), "{callsign}");
    assert_eq!(callsign.len(), "Pilot-0000".len());
}

#[test]
fn test_connect_failure_reports_error() {
    let mut session = Session::new(&Config::default(), Box::new(RefusingConnector));
    let err = session.connect(Some("ws://nowhere"), None).unwrap_err();
    assert!(matches!(err, SessionError::Connect { .. }));
    assert!(err.to_string().contains("ws://nowhere"));
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);

    let events = session.drain_events();
    assert!(
        notifications(&events)
            .iter()
            .any(|(_, level)| *level == NotificationLevel::Error)
    );
}

#[test]
fn test_init_ack_assigns_id_and_mirrors_roster() {
    let mut h = Harness::new();
    let peer = h.connect();
    send(
        &peer,
        Message::InitAck(InitAck {
            client_id: id("me"),
            players: vec![
                player("p1", Vec3::new(10.0, 0.0, 0.0)),
                player("p2", Vec3::new(20.0, 0.0, 0.0)),
                player("me", Vec3::ZERO),
            ],
            protection_zone: Some(ZoneData {
                center: WireVec3::default(),
                radius: 100.0,
                height: 50.0,
            }),
        }),
    );
    h.tick();

    assert_eq!(h.session.local().id, id("me"));
    assert_eq!(h.session.registry().local_id(), Some(&id("me")));
    assert_eq!(h.session.registry().ids(), [id("p1"), id("p2")]);
    assert!(h.session.state().zone().is_some());

    let events = h.session.drain_events();
    assert_eq!(count(&events, "network.plane.created"), 2);
    assert!(
        notifications(&events)
            .iter()
            .any(|(m, _)| m == "Connected as Tester")
    );
}

#[test]
fn test_peer_close_tears_down_session() {
    let mut h = Harness::new();
    let peer = h.join(vec![player("p1", Vec3::ZERO)]);
    peer.close(Some("server restart"));
    h.tick();

    assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);
    assert!(h.session.registry().is_empty());
    let events = h.session.drain_events();
    let notes = notifications(&events);
    assert!(
        notes
            .iter()
            .any(|(m, l)| m.contains("server restart") && *l == NotificationLevel::Warning)
    );
}

#[test]
fn test_transport_error_tears_down_session() {
    let mut h = Harness::new();
    let peer = h.join(Vec::new());
    peer.fail("connection reset");
    h.tick();
    assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);
    let events = h.session.drain_events();
    assert!(
        notifications(&events)
            .iter()
            .any(|(_, l)| *l == NotificationLevel::Error)
    );
}

#[test]
fn test_disconnect_clears_network_state() {
    let mut h = Harness::new();
    let peer = h.join(vec![player("p1", Vec3::ZERO), player("p2", Vec3::X * 50.0)]);
    send(
        &peer,
        Message::Destroyed(Destroyed {
            player_id: id("p1"),
            source_id: None,
        }),
    );
    h.tick();
    h.session.respawn_local(Transform::at(Vec3::new(0.0, 500.0, 0.0)));
    assert!(h.session.state().pending_tasks() > 0);
    h.session.drain_events();

    h.session.disconnect();
    assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);
    assert!(h.session.registry().is_empty());
    assert!(h.session.registry().local_id().is_none());
    assert_eq!(h.session.state().pending_tasks(), 0);
    assert_eq!(h.session.state().policy_name(), "local-authoritative");
    assert!(!h.session.local().is_respawned);

    let events = h.session.drain_events();
    assert_eq!(count(&events, "network.plane.removed"), 2);
    assert!(notifications(&events).iter().any(|(m, _)| m == "Disconnected"));

    // Frames from the old peer are never read again.
    send(&peer, Message::PlayerJoined(PlayerJoined { player: player("p9", Vec3::ZERO) }));
    h.run_for(100, 16);
    assert!(h.session.registry().is_empty());

    h.session.disconnect();
    assert!(h.session.drain_events().is_empty());

    h.session.connect(None, None).unwrap();
    assert!(h.listener.next().is_some());
}

// ---------------------------------------------------------------------------
// Registry and interpolation
// ---------------------------------------------------------------------------

#[test]
fn test_update_for_unknown_id_creates_once() {
    let mut h = Harness::new();
    let peer = h.join(Vec::new());
    let update = Message::Update(Update {
        players: Some(vec![player("p3", Vec3::ZERO)]),
        player: None,
    });
    send(&peer, update.clone());
    send(&peer, update);
    h.tick();

    assert_eq!(h.session.registry().len(), 1);
    let events = h.session.drain_events();
    assert_eq!(count(&events, "network.plane.created"), 1);
}

#[test]
fn test_remote_transform_converges_on_update() {
    let mut h = Harness::new();
    let peer = h.join(vec![player("p1", Vec3::ZERO)]);
    send(
        &peer,
        Message::Update(Update::single(player("p1", Vec3::new(100.0, 0.0, 0.0)))),
    );
    h.tick();

    let x = |h: &Harness| {
        h.session.registry().get(&id("p1")).unwrap().entity.transform.position.x
    };
    assert!((x(&h) - 20.0).abs() < 1e-3);
    h.advance(16);
    assert!((x(&h) - 36.0).abs() < 1e-3);
    h.run_for(16 * 40, 16);
    assert!(x(&h) > 99.9);
}

#[test]
fn test_update_for_local_id_only_applies_health() {
    let mut h = Harness::new();
    let peer = h.join(Vec::new());
    let mut me = player("me", Vec3::new(500.0, 0.0, 0.0));
    me.health = Some(40.0);
    send(&peer, Message::Update(Update::single(me)));
    h.tick();

    assert_eq!(h.session.local().vitals.health(), 40.0);
    assert_eq!(h.session.local().transform.position, Vec3::ZERO);
    assert!(h.session.registry().is_empty());
}

#[test]
fn test_invalid_frames_change_nothing() {
    let mut h = Harness::new();
    let peer = h.join(vec![player("p1", Vec3::ZERO)]);
    for frame in [
        "not json",
        r#"{"players":[]}"#,
        r#"{"type":"warp","x":1}"#,
        r#"{"type":"update"}"#,
        r#"{"type":"player_respawn","player":{"id":"p1"}}"#,
        r#"{"type":"damage","amount":10}"#,
    ] {
        peer.send_text(frame);
    }
    h.tick();

    assert_eq!(h.session.connection_state(), ConnectionState::Connected);
    assert_eq!(h.session.registry().len(), 1);
    let p1 = h.session.registry().get(&id("p1")).unwrap();
    assert_eq!(p1.entity.vitals.health(), 100.0);
    assert!(h.session.drain_events().is_empty());
}

#[test]
fn test_numeric_ids_are_accepted() {
    let mut h = Harness::new();
    let peer = h.join(Vec::new());
    let raw = serde_json::json!({
        "type": "player_joined",
        "player": { "id": 42, "callsign": "Iceman" }
    });
    peer.send_text(raw.to_string());
    h.tick();
    assert!(h.session.registry().contains(&id("42")));
}

#[test]
fn test_player_joined_and_left_notify() {
    let mut h = Harness::new();
    let peer = h.join(Vec::new());
    let mut bandit = player("p1", Vec3::ZERO);
    bandit.callsign = Some("Bandit".into());
    send(&peer, Message::PlayerJoined(PlayerJoined { player: bandit }));
    h.tick();
    send(&peer, Message::PlayerLeft(PlayerLeft { player_id: id("p1") }));
    h.tick();

    assert!(h.session.registry().is_empty());
    let events = h.session.drain_events();
    let notes: Vec<_> = notifications(&events).into_iter().map(|(m, _)| m).collect();
    assert_eq!(notes, ["Bandit joined", "Bandit left"]);
    assert_eq!(count(&events, "network.plane.removed"), 1);
}

#[test]
fn test_deferred_roster_waits_for_scene() {
    let mut config = Config::default();
    config.sync.defer_roster_until_scene_ready = true;
    let mut h = Harness::with_config(config.clone());
    h.join(vec![player("p1", Vec3::ZERO), player("p2", Vec3::ZERO)]);
    assert!(h.session.registry().is_empty());

    h.session.mark_scene_ready();
    assert_eq!(h.session.registry().len(), 2);
    h.session.mark_scene_ready();
    assert_eq!(h.session.registry().len(), 2);

    // A held roster dies with the connection.
    let mut h = Harness::with_config(config);
    h.join(vec![player("p1", Vec3::ZERO)]);
    h.session.disconnect();
    h.session.mark_scene_ready();
    assert!(h.session.registry().is_empty());
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

#[test]
fn test_connected_hits_are_reported_not_applied() {
    let mut h = Harness::new();
    let mut peer = h.join(vec![player("p1", Vec3::new(0.0, 0.0, -50.0))]);

    assert!(h.session.fire().unwrap().fired());
    h.run_for(320, 16);

    let msgs = peer.drain_messages();
    let fire = msgs.iter().find_map(|m| match m {
        Message::Fire(f) => Some(f),
        _ => None,
    });
    assert_eq!(fire.and_then(|f| f.player_id.clone()), Some(id("me")));

    let reports: Vec<_> = msgs
        .iter()
        .filter_map(|m| match m {
            Message::Damage(d) => Some(d),
            _ => None,
        })
        .collect();
    assert!(!reports.is_empty());
    for report in &reports {
        assert_eq!(report.target_id, id("p1"));
        assert_eq!(report.source_id, Some(id("me")));
        assert_eq!(report.amount, 10.0);
    }

    let p1 = h.session.registry().get(&id("p1")).unwrap();
    assert_eq!(p1.entity.vitals.health(), 100.0);
    let events = h.session.drain_events();
    assert!(count(&events, "effect.hit") >= reports.len());
}

#[test]
fn test_offline_hit_destroys_bot_once() {
    let mut h = Harness::new();
    h.session.local_mut().transform = Transform::at(Vec3::new(0.0, 100.0, 0.0));
    assert!(h.session.spawn_bot("bot-1", Transform::at(Vec3::new(0.0, 100.0, -50.0))));
    h.session
        .bot_mut(&id("bot-1"))
        .unwrap()
        .vitals
        .set_health(10.0, Vec3::ZERO);

    h.session.fire();
    h.run_for(320, 16);

    let bot = h.session.state().bot(&id("bot-1")).unwrap();
    assert!(bot.is_destroyed());
    assert!(bot.vitals.is_free_falling());
    let events = h.session.drain_events();
    assert_eq!(count(&events, "effect.explosion"), 1);

    h.run_for(10_000, 100);
    assert!(h.session.state().bot(&id("bot-1")).is_none());
    assert_eq!(count(&h.session.drain_events(), "network.plane.removed"), 1);
}

#[test]
fn test_bots_take_local_damage_while_connected() {
    let mut h = Harness::new();
    h.join(Vec::new());
    h.session.spawn_bot("bot-1", Transform::default());
    h.session.handle_sim_event(SimEvent::Damage {
        target: id("bot-1"),
        amount: 25.0,
        position: None,
        source: None,
    });
    assert_eq!(h.session.state().bot(&id("bot-1")).unwrap().vitals.health(), 75.0);

    h.session.handle_sim_event(SimEvent::Damage {
        target: id("me"),
        amount: 25.0,
        position: None,
        source: None,
    });
    assert_eq!(h.session.local().vitals.health(), 100.0);
}

#[test]
fn test_remote_fire_is_cosmetic() {
    let mut h = Harness::new();
    let mut peer = h.join(vec![player("p1", Vec3::new(0.0, 0.0, -50.0))]);
    send(
        &peer,
        Message::Fire(Fire {
            position: Vec3::new(0.0, 0.0, -50.0).into(),
            rotation: Vec3::new(0.0, std::f32::consts::PI, 0.0).into(),
            velocity: WireVec3::default(),
            player_id: Some(id("p1")),
        }),
    );
    h.tick();
    assert_eq!(h.session.state().ballistics().pool().active_count(), 2);

    h.run_for(320, 16);
    assert_eq!(h.session.local().vitals.health(), 100.0);
    assert!(
        !peer
            .drain_messages()
            .iter()
            .any(|m| matches!(m, Message::Damage(_)))
    );

    // Our own volley echoed back is not mirrored twice.
    let before = h.session.state().ballistics().pool().active_count();
    send(
        &peer,
        Message::Fire(Fire {
            position: WireVec3::default(),
            rotation: WireVec3::default(),
            velocity: WireVec3::default(),
            player_id: Some(id("me")),
        }),
    );
    h.tick();
    assert_eq!(h.session.state().ballistics().pool().active_count(), before);
}

#[test]
fn test_damage_message_applies_to_local_player() {
    let mut h = Harness::new();
    let peer = h.join(Vec::new());
    send(
        &peer,
        Message::Damage(Damage {
            target_id: id("me"),
            amount: 30.0,
            position: Some(WireVec3::default()),
            source_id: Some(id("p1")),
        }),
    );
    h.tick();
    assert_eq!(h.session.local().vitals.health(), 70.0);
    let events = h.session.drain_events();
    assert_eq!(count(&events, "effect.hit"), 1);

    send(
        &peer,
        Message::Damage(Damage {
            target_id: id("me"),
            amount: 70.0,
            position: None,
            source_id: None,
        }),
    );
    h.tick();
    assert!(h.session.local().is_destroyed());
    assert!(h.session.fire().is_none());
    assert_eq!(count(&h.session.drain_events(), "effect.explosion"), 1);
}

#[test]
fn test_destroyed_by_local_player_notifies() {
    let mut h = Harness::new();
    let mut bandit = player("p1", Vec3::new(0.0, 200.0, 0.0));
    bandit.callsign = Some("Bandit".into());
    let peer = h.join(vec![bandit]);
    send(
        &peer,
        Message::Destroyed(Destroyed {
            player_id: id("p1"),
            source_id: Some(id("me")),
        }),
    );
    h.tick();

    let p1 = h.session.registry().get(&id("p1")).unwrap();
    assert!(p1.entity.vitals.is_free_falling());
    let events = h.session.drain_events();
    assert_eq!(count(&events, "effect.explosion"), 1);
    assert!(
        notifications(&events)
            .iter()
            .any(|(m, _)| m == "You destroyed Bandit")
    );
}

#[test]
fn test_sim_destroyed_local_waits_for_peer_when_connected() {
    let mut h = Harness::new();
    let mut peer = h.join(Vec::new());
    h.session.handle_sim_event(SimEvent::Destroyed {
        id: id("me"),
        source: None,
    });
    assert!(!h.session.local().is_destroyed());
    let msgs = peer.drain_messages();
    assert!(msgs.iter().any(|m| matches!(
        m,
        Message::Destroyed(d) if d.player_id == id("me")
    )));

    let mut offline = Harness::new();
    offline.session.handle_sim_event(SimEvent::Destroyed {
        id: id(crate::LOCAL_PLAYER_ID),
        source: None,
    });
    assert!(offline.session.local().is_destroyed());
}

#[test]
fn test_destroyed_remote_removed_after_delay() {
    let mut h = Harness::new();
    let peer = h.join(vec![player("p1", Vec3::new(0.0, 200.0, 0.0))]);
    send(
        &peer,
        Message::Destroyed(Destroyed {
            player_id: id("p1"),
            source_id: None,
        }),
    );
    h.tick();
    assert!(h.session.registry().get(&id("p1")).unwrap().entity.is_destroyed());

    h.run_for(9_900, 100);
    assert!(h.session.registry().contains(&id("p1")));
    h.advance(100);
    assert!(!h.session.registry().contains(&id("p1")));
    assert_eq!(count(&h.session.drain_events(), "network.plane.removed"), 1);
}

#[test]
fn test_oversized_removal_delay_falls_back_to_default() {
    let mut config = Config::default();
    config.sync.removal_delay_secs = 1e30;
    config.sync.hit_effect_lifetime_secs = f32::NAN;
    let mut h = Harness::with_config(config);
    let peer = h.join(vec![player("p1", Vec3::new(0.0, 200.0, 0.0))]);
    send(
        &peer,
        Message::Destroyed(Destroyed {
            player_id: id("p1"),
            source_id: None,
        }),
    );
    h.tick();

    h.run_for(9_900, 100);
    assert!(h.session.registry().contains(&id("p1")));
    h.advance(100);
    assert!(!h.session.registry().contains(&id("p1")));
}

#[test]
fn test_respawn_cancels_pending_removal() {
    let mut h = Harness::new();
    let peer = h.join(vec![player("p1", Vec3::new(0.0, 200.0, 0.0))]);
    send(
        &peer,
        Message::Destroyed(Destroyed {
            player_id: id("p1"),
            source_id: None,
        }),
    );
    h.tick();
    h.run_for(5_000, 100);

    send(
        &peer,
        Message::PlayerRespawn(PlayerRespawn {
            player: player("p1", Vec3::new(300.0, 100.0, 0.0)),
        }),
    );
    h.tick();
    let p1 = h.session.registry().get(&id("p1")).unwrap();
    assert!(p1.entity.vitals.is_alive());
    assert!(!p1.entity.vitals.is_free_falling());
    assert_eq!(p1.entity.transform.position, Vec3::new(300.0, 100.0, 0.0));
    assert_eq!(
        count(&h.session.drain_events(), "network.plane.respawned"),
        1
    );

    h.run_for(6_000, 100);
    assert!(h.session.registry().contains(&id("p1")));
}

#[test]
fn test_hit_effect_pool_is_bounded() {
    let mut config = Config::default();
    config.sync.hit_effect_capacity = 3;
    let mut h = Harness::with_config(config);
    let peer = h.join(Vec::new());
    for i in 0..5 {
        send(
            &peer,
            Message::HitEffect(HitEffect {
                position: Vec3::new(i as f32, 0.0, 0.0).into(),
                play_sound: (i == 0).then_some(false),
            }),
        );
    }
    h.tick();

    let effects: Vec<_> = h.session.state().effects().iter().map(|e| e.position.x).collect();
    assert_eq!(effects, [2.0, 3.0, 4.0]);
    let events = h.session.drain_events();
    assert_eq!(count(&events, "effect.hit"), 5);
    assert_eq!(count(&events, "sound.play"), 4);

    h.run_for(600, 100);
    assert!(h.session.state().effects().is_empty());
}

// ---------------------------------------------------------------------------
// Outbound state and respawn protocol
// ---------------------------------------------------------------------------

#[test]
fn test_outbound_updates_are_throttled() {
    let mut h = Harness::new();
    let mut peer = h.join(Vec::new());
    h.run_for(1_000, 5);

    let updates: Vec<_> = peer
        .drain_messages()
        .into_iter()
        .filter_map(|m| match m {
            Message::Update(u) => u.player,
            _ => None,
        })
        .collect();
    assert!((49..=51).contains(&updates.len()), "{}", updates.len());
    assert!(updates.iter().all(|p| p.id == id("me")));
    assert!(updates.iter().all(|p| p.is_respawned == Some(false)));
}

#[test]
fn test_no_updates_before_init_ack() {
    let mut h = Harness::new();
    let mut peer = h.connect();
    h.run_for(200, 10);
    assert!(peer.drain_messages().is_empty());
}

fn respawn_flags(msgs: &[Message]) -> Vec<bool> {
    msgs.iter()
        .filter_map(|m| match m {
            Message::Update(update) => update.player.as_ref(),
            _ => None,
        })
        .map(|p| p.is_respawned == Some(true))
        .collect()
}

#[test]
fn test_respawn_resends_on_schedule() {
    let mut h = Harness::new();
    let mut peer = h.join(Vec::new());
    let start = h.now;
    h.session.respawn_local(Transform::at(Vec3::new(0.0, 500.0, 0.0)));
    assert!(h.session.local().is_respawned);
    assert_eq!(respawn_announcements(&peer.drain_messages()), 1);
    assert_eq!(h.session.state().pending_tasks(), 5);

    for (fired, delay) in [100, 500, 1_000, 2_000, 5_000].into_iter().enumerate() {
        h.now = start + ms(delay - 1);
        h.tick();
        assert_eq!(h.session.state().pending_tasks(), 5 - fired, "{delay}");
        peer.drain_messages();

        h.now = start + ms(delay);
        h.tick();
        assert_eq!(h.session.state().pending_tasks(), 4 - fired, "{delay}");
        assert!(respawn_announcements(&peer.drain_messages()) >= 1, "{delay}");
    }
    assert!(!h.session.local().is_respawned);
    h.run_for(2_000, 100);
    assert_eq!(respawn_announcements(&peer.drain_messages()), 0);
}

#[test]
fn test_periodic_updates_carry_respawn_flag_during_window() {
    let mut h = Harness::new();
    let mut peer = h.join(Vec::new());
    h.session.respawn_local(Transform::default());
    peer.drain_messages();

    h.run_for(50, 5);
    let flags = respawn_flags(&peer.drain_messages());
    assert!(!flags.is_empty());
    assert!(flags.iter().all(|&f| f), "{flags:?}");

    h.run_for(5_000, 5);
    assert!(!h.session.local().is_respawned);
    peer.drain_messages();
    h.run_for(100, 5);
    let flags = respawn_flags(&peer.drain_messages());
    assert!(!flags.is_empty());
    assert!(flags.iter().all(|&f| !f), "{flags:?}");
}

#[test]
fn test_second_respawn_restarts_schedule() {
    let mut h = Harness::new();
    let _peer = h.join(Vec::new());
    h.session.respawn_local(Transform::default());
    h.run_for(600, 10);
    // Resends at 100 ms and 500 ms have gone out.
    assert_eq!(h.session.state().pending_tasks(), 3);

    h.session.respawn_local(Transform::default());
    assert_eq!(h.session.state().pending_tasks(), 5);
    assert!(h.session.local().is_respawned);

    h.run_for(4_990, 10);
    assert!(h.session.local().is_respawned);
    h.run_for(20, 10);
    assert_eq!(h.session.state().pending_tasks(), 0);
    assert!(!h.session.local().is_respawned);
}

#[test]
fn test_offline_respawn_sends_nothing() {
    let mut h = Harness::new();
    h.session.handle_sim_event(SimEvent::Destroyed {
        id: id(crate::LOCAL_PLAYER_ID),
        source: None,
    });
    h.session.respawn_local(Transform::at(Vec3::new(0.0, 300.0, 0.0)));
    assert!(h.session.local().vitals.is_alive());
    assert!(!h.session.local().is_respawned);
    assert_eq!(h.session.state().pending_tasks(), 0);
}

#[test]
fn test_local_fire_emits_heat_events() {
    let mut h = Harness::new();
    h.session.fire();
    h.tick();
    let events = h.session.drain_events();
    assert!(events.iter().any(|e| matches!(e, GameEvent::WeaponHeat { level, .. } if *level > 0.0)));
    assert_eq!(count(&events, "sound.play"), 1);
}

#[test]
fn test_player_count_and_leaderboard_are_stored() {
    let mut h = Harness::new();
    let peer = h.join(Vec::new());
    send(&peer, Message::PlayerCount(PlayerCount { count: 7 }));
    send(
        &peer,
        Message::Leaderboard(Leaderboard {
            data: vec![Default::default(), Default::default()],
        }),
    );
    send(
        &peer,
        Message::Notification(Notification {
            message: "Round over".into(),
            level: None,
        }),
    );
    h.tick();

    assert_eq!(h.session.player_count(), Some(7));
    assert_eq!(h.session.leaderboard().len(), 2);
    let events = h.session.drain_events();
    assert_eq!(
        notifications(&events),
        [("Round over".to_string(), NotificationLevel::Info)]
    );

    h.session.disconnect();
    assert_eq!(h.session.player_count(), None);
    assert!(h.session.leaderboard().is_empty());
}
