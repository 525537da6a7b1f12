//! Registry + Bevy хост: plugin, spawn/despawn, snapshot/restore

use bevy::prelude::*;
use hostile_ai::collab::headless::{HeadlessNav, HeadlessSensor};
use hostile_ai::{
    create_headless_app, lock_agent, share, spawn_agent, AgentController, AgentEvent, AgentId, AgentKind,
    AgentSnapshot, BossAi, BossConfig, BossSpawn, Collaborators, CreeperConfig, CreeperSpawn, CreeperState,
    MonsterAi, Registry, RestoreError, Selector,
};

fn creeper(id: u64, collab: Collaborators) -> MonsterAi {
    let config = CreeperConfig {
        surge_chance: 0.0,
        ..Default::default()
    };
    MonsterAi::new(CreeperSpawn::new(AgentId(id), Vec3::ZERO), config, collab)
}

fn boss(id: u64) -> BossAi {
    BossAi::new(BossSpawn::new(AgentId(id), Vec3::ZERO), BossConfig::default(), Collaborators::new())
}

fn step(app: &mut App, ticks: usize) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        app.world_mut().run_schedule(FixedUpdate);
        events.extend(app.world_mut().resource_mut::<Events<AgentEvent>>().drain());
    }
    events
}

#[test]
fn test_plugin_ticks_agents_and_forwards_events() {
    let mut app = create_headless_app(7);
    let sensor = HeadlessSensor::new(10.0);
    let agent = share(creeper(1, Collaborators::new().with_sensor(sensor.clone())));
    let entity = spawn_agent(app.world_mut(), agent.clone());

    sensor.show_target(Vec3::new(5.0, 0.0, 0.0));
    let events = step(&mut app, 3);

    assert!(events.iter().any(|e| matches!(
        e,
        AgentEvent::StateChanged { agent: AgentId(1), to: "Chase", .. }
    )));
    assert_eq!(lock_agent(&agent).state_name(), Some("Chase"));

    let registry = app.world().resource::<Registry>();
    assert!(registry.contains(AgentId(1)));
    assert_eq!(registry.find_by_type(AgentKind::Creeper).len(), 1);
    assert!(app.world().get::<Transform>(entity).is_some());
}

#[test]
fn test_transform_mirrors_agent_position() {
    let mut app = create_headless_app(7);
    let nav = HeadlessNav::new(Vec3::ZERO, 20.0);
    let agent = share(creeper(2, Collaborators::new().with_nav(nav)));
    let entity = spawn_agent(app.world_mut(), agent.clone());

    assert!(lock_agent(&agent).warp_to(Vec3::new(3.0, 0.0, -1.0)));
    step(&mut app, 1);

    let transform = app.world().get::<Transform>(entity).copied().unwrap();
    assert_eq!(transform.translation, lock_agent(&agent).position());
}

#[test]
fn test_despawn_unregisters_agent() {
    let mut app = create_headless_app(7);
    let agent = share(boss(3));
    let id = lock_agent(&agent).id();
    let entity = spawn_agent(app.world_mut(), agent);

    assert!(app.world_mut().despawn(entity));
    step(&mut app, 1);

    let registry = app.world().resource::<Registry>();
    assert!(!registry.contains(id));
    assert!(registry.find_by_id(id).is_none());
}

#[test]
fn test_bulk_disable_is_idempotent_across_kinds() {
    let mut app = create_headless_app(7);
    for id in 1..=3 {
        spawn_agent(app.world_mut(), share(creeper(id, Collaborators::new())));
    }
    spawn_agent(app.world_mut(), share(boss(10)));

    let registry = app.world().resource::<Registry>();
    assert_eq!(registry.disable(AgentKind::Creeper, Selector::All), 3);
    assert_eq!(registry.disable(AgentKind::Creeper, Selector::All), 0);
    assert_eq!(registry.disable(AgentKind::Boss, Selector::Id(AgentId(10))), 1);
    assert_eq!(registry.enable(AgentKind::Creeper, Selector::Id(AgentId(2))), 1);

    let enabled: Vec<bool> = registry
        .find_by_type(AgentKind::Creeper)
        .iter()
        .map(|agent| lock_agent(agent).is_enabled())
        .collect();
    assert_eq!(enabled, vec![false, true, false]);

    // Отключённые агенты не тикают и ничего не шлют
    let events = step(&mut app, 5);
    assert!(events
        .iter()
        .all(|e| matches!(e, AgentEvent::StateChanged { agent: AgentId(2), .. })));
}

#[test]
fn test_registry_admin_ops() {
    let mut registry = Registry::new();
    let agent = share(creeper(4, Collaborators::new().with_nav(HeadlessNav::new(Vec3::ZERO, 5.0))));
    registry.register(&agent);

    assert!(registry.force_into_stun(AgentId(4)));
    assert_eq!(lock_agent(&agent).state_name(), Some("Stun"));

    assert!(registry.warp_to(AgentId(4), Vec3::new(1.0, 0.0, 1.0)));
    assert_eq!(lock_agent(&agent).position(), Vec3::new(1.0, 0.0, 1.0));
    // За пределами навигации warp отклоняется
    assert!(!registry.warp_to(AgentId(4), Vec3::new(50.0, 0.0, 0.0)));
}

#[test]
fn test_snapshot_round_trip_through_json() {
    let mut original = creeper(5, Collaborators::new());
    original.change_state(CreeperState::Chase, true);
    original.take_damage(25.0, Vec3::new(0.0, 0.0, -2.0), false, false);
    for _ in 0..200 {
        original.tick(1.0 / 60.0);
    }

    let snapshot = original.snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let decoded: AgentSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, snapshot);

    let mut restored = creeper(5, Collaborators::new());
    restored.restore(&decoded).unwrap();

    assert_eq!(restored.state_name(), original.state_name());
    assert_eq!(restored.health(), original.health());
    assert_eq!(restored.flags().has_hissed_after_hit, original.flags().has_hissed_after_hit);
    assert!(!restored.flags().is_processing_hit);
}

#[test]
fn test_restore_rejects_bad_snapshots() {
    let mut target = creeper(6, Collaborators::new());

    let boss_snapshot = boss(6).snapshot();
    assert!(matches!(
        target.restore(&boss_snapshot),
        Err(RestoreError::KindMismatch { expected: AgentKind::Creeper, .. })
    ));

    let mut unknown = target.snapshot();
    unknown.state = "Dancing".to_string();
    assert!(matches!(target.restore(&unknown), Err(RestoreError::UnknownState { .. })));

    let mut undead = target.snapshot();
    undead.state = "Die".to_string();
    assert!(matches!(
        target.restore(&undead),
        Err(RestoreError::TerminalWhileAlive { .. })
    ));

    target.take_damage(500.0, Vec3::X, true, false);
    let alive = creeper(7, Collaborators::new()).snapshot();
    assert!(matches!(target.restore(&alive), Err(RestoreError::Dead(AgentId(6)))));
}

#[test]
fn test_restore_disabled_snapshot_stays_disabled() {
    let mut source = boss(8);
    source.set_enabled(false);
    let snapshot = source.snapshot();

    let mut restored = boss(8);
    restored.restore(&snapshot).unwrap();

    assert!(!restored.is_enabled());
    assert_eq!(restored.state_name(), Some("Wander"));
}
