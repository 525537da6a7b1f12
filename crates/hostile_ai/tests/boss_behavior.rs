//! Поведенческие сценарии Boss: hysteresis, transition lock, desync protocol

use bevy::prelude::*;
use hostile_ai::boss::clips;
use hostile_ai::collab::headless::{HeadlessAnimator, HeadlessNav, HeadlessSensor};
use hostile_ai::collab::NavigationAgent;
use hostile_ai::{
    AgentController, AgentEvent, AgentId, BossAi, BossConfig, BossSpawn, BossState, Collaborators, HitOutcome,
};

const DT: f32 = 1.0 / 60.0;

fn calm_config() -> BossConfig {
    BossConfig {
        special_attack_chance: 0.0,
        after_slash_chance: 0.0,
        ..Default::default()
    }
}

fn boss_with(config: BossConfig, collab: Collaborators) -> BossAi {
    let mut ai = BossAi::new(BossSpawn::new(AgentId(10), Vec3::ZERO), config, collab);
    ai.drain_events();
    ai
}

fn run(ai: &mut BossAi, seconds: f32) -> Vec<AgentEvent> {
    let ticks = (seconds / DT).ceil() as usize;
    let mut events = Vec::new();
    for _ in 0..ticks {
        ai.tick(DT);
        events.extend(ai.drain_events());
    }
    events
}

/// Тикаем пока `done` не станет true (не дольше `max_seconds`).
fn run_until(ai: &mut BossAi, max_seconds: f32, done: impl Fn(&BossAi) -> bool) -> Vec<AgentEvent> {
    let ticks = (max_seconds / DT).ceil() as usize;
    let mut events = Vec::new();
    for _ in 0..ticks {
        ai.tick(DT);
        events.extend(ai.drain_events());
        if done(ai) {
            break;
        }
    }
    events
}

fn transitions(events: &[AgentEvent]) -> Vec<(Option<&'static str>, &'static str)> {
    events
        .iter()
        .filter_map(|event| match event {
            AgentEvent::StateChanged { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_attack_range_hysteresis() {
    let sensor = HeadlessSensor::new(20.0);
    let mut ai = boss_with(calm_config(), Collaborators::new().with_sensor(sensor.clone()));

    // Внутри R, но снаружи R - B: только Chase
    sensor.show_target(Vec3::new(2.8, 0.0, 0.0));
    run(&mut ai, 0.5);
    assert_eq!(ai.state(), Some(BossState::Chase));

    sensor.move_target(Vec3::new(2.4, 0.0, 0.0));
    run(&mut ai, 0.1);
    assert_eq!(ai.state(), Some(BossState::Attack));

    // Отошла за R, но в пределах R * slack: атака продолжается
    sensor.move_target(Vec3::new(3.5, 0.0, 0.0));
    let events = run(&mut ai, 0.5);
    assert_eq!(ai.state(), Some(BossState::Attack));
    let slashes = events
        .iter()
        .filter(|e| matches!(e, AgentEvent::Slash { .. }))
        .count();
    assert!(slashes > 1);

    sensor.move_target(Vec3::new(4.0, 0.0, 0.0));
    run(&mut ai, 0.1);
    assert_eq!(ai.state(), Some(BossState::Chase));
}

#[test]
fn test_special_attack_waits_for_attack_range() {
    let config = BossConfig {
        special_attack_chance: 1.0,
        ..calm_config()
    };
    let sensor = HeadlessSensor::new(20.0);
    let mut ai = boss_with(config, Collaborators::new().with_sensor(sensor.clone()));

    // Далеко за R - B: dash только встаёт в очередь, Attack не начинается
    sensor.show_target(Vec3::new(10.0, 0.0, 0.0));
    let events = run(&mut ai, 5.0);
    assert_eq!(ai.state(), Some(BossState::Chase));
    assert!(ai.flags().dash_queued);
    assert!(!transitions(&events).iter().any(|(_, to)| *to == "Attack"));

    // Цель подошла: первый удар атаки: dash
    sensor.move_target(Vec3::new(2.0, 0.0, 0.0));
    let events = run_until(&mut ai, 1.0, |ai| !ai.flags().dash_queued);
    assert_eq!(ai.state(), Some(BossState::Attack));
    let first_slash = events.iter().find_map(|e| match e {
        AgentEvent::Slash { clip, .. } => Some(*clip),
        _ => None,
    });
    assert_eq!(first_slash, Some(clips::DASH_SLASH));
}

#[test]
fn test_locked_attack_survives_disable_and_reenters() {
    let config = BossConfig {
        after_slash_chance: 1.0,
        ..calm_config()
    };
    let sensor = HeadlessSensor::new(20.0);
    let animator = HeadlessAnimator::new(0.5);
    let mut ai = boss_with(
        config,
        Collaborators::new()
            .with_sensor(sensor.clone())
            .with_animator(animator.clone()),
    );

    sensor.show_target(Vec3::new(2.0, 0.0, 0.0));
    run_until(&mut ai, 3.0, |ai| ai.machine().is_locked());
    assert_eq!(ai.state(), Some(BossState::Attack));
    assert!(ai.machine().is_locked());
    assert!(animator.has_played(clips::AFTER_SLASH));

    // Обычный переход во время lock отклоняется
    assert!(!ai.change_state(BossState::Chase, false));
    assert_eq!(ai.state(), Some(BossState::Attack));

    assert!(ai.set_enabled(false));
    assert!(!ai.is_enabled());
    assert!(ai.task_labels().is_empty());
    assert!(!ai.machine().is_locked());
    assert!(!animator.locked());
    ai.drain_events();

    assert!(ai.set_enabled(true));
    let events = ai.drain_events();
    assert_eq!(transitions(&events), vec![(Some("Attack"), "Attack")]);
    assert!(!ai.machine().is_locked());
    assert_eq!(ai.task_labels(), vec!["boss_agent_sync", "boss_attack_loop"]);
}

#[test]
fn test_stun_during_lock_is_deferred_until_release() {
    let config = BossConfig {
        after_slash_chance: 1.0,
        ..calm_config()
    };
    let sensor = HeadlessSensor::new(20.0);
    let mut ai = boss_with(
        config,
        Collaborators::new()
            .with_sensor(sensor.clone())
            .with_animator(HeadlessAnimator::new(0.5)),
    );

    sensor.show_target(Vec3::new(2.0, 0.0, 0.0));
    run_until(&mut ai, 3.0, |ai| ai.machine().is_locked());
    assert!(ai.machine().is_locked());

    // Полный stun meter → Stun, но lock держит
    let outcome = ai.take_damage(100.0, Vec3::new(2.0, 0.0, 0.0), false, false);
    assert_eq!(outcome, HitOutcome::Blocked);
    assert!(ai.flags().pending_stun);
    assert_eq!(ai.state(), Some(BossState::Attack));

    run_until(&mut ai, 2.0, |ai| ai.state() == Some(BossState::Stun));
    assert_eq!(ai.state(), Some(BossState::Stun));
    assert!(!ai.flags().pending_stun);
    assert_eq!(ai.flags().stun_meter, 0.0);
}

#[test]
fn test_stun_meter_fills_from_damage() {
    let mut ai = boss_with(calm_config(), Collaborators::new());

    assert_eq!(ai.take_damage(30.0, Vec3::X, false, false), HitOutcome::Absorbed);
    assert_eq!(ai.flags().stun_meter, 30.0);

    // Hard hit: урон + бонус
    assert_eq!(ai.take_damage(10.0, Vec3::X, true, false), HitOutcome::Absorbed);
    assert_eq!(ai.flags().stun_meter, 65.0);

    let outcome = ai.take_damage(40.0, Vec3::X, false, false);
    assert_eq!(outcome, HitOutcome::Reacted { successor: "Stun" });
    assert_eq!(ai.state(), Some(BossState::Stun));
    assert_eq!(ai.flags().stun_meter, 0.0);
    assert_eq!(ai.health().current(), 920.0);
}

#[test]
fn test_large_drift_warps_agent_to_transform() {
    let nav = HeadlessNav::new(Vec3::ZERO, 50.0);
    let sensor = HeadlessSensor::new(20.0);
    let mut ai = boss_with(
        calm_config(),
        Collaborators::new()
            .with_nav(nav.clone())
            .with_sensor(sensor.clone()),
    );

    sensor.show_target(Vec3::new(2.0, 0.0, 0.0));
    run_until(&mut ai, 1.0, |ai| ai.state() == Some(BossState::Attack));
    assert_eq!(ai.state(), Some(BossState::Attack));
    assert!(!nav.state().position_authority);

    // Небольшой drift: тихая синхронизация без warp
    let mut handle = nav.clone();
    handle.move_by(Vec3::new(0.5, 0.0, 0.0));
    ai.tick(DT);
    assert_eq!(nav.state().warps, 0);
    assert_eq!(nav.state().position, ai.position());

    // Большой drift: warp обратно к Transform
    handle.move_by(Vec3::new(3.0, 0.0, 0.0));
    ai.tick(DT);
    assert_eq!(nav.state().warps, 1);
    assert_eq!(nav.state().position, ai.position());
}

#[test]
fn test_attack_exit_syncs_agent_once() {
    let nav = HeadlessNav::new(Vec3::ZERO, 50.0);
    let sensor = HeadlessSensor::new(20.0);
    let mut ai = boss_with(
        calm_config(),
        Collaborators::new()
            .with_nav(nav.clone())
            .with_sensor(sensor.clone()),
    );

    sensor.show_target(Vec3::new(2.0, 0.0, 0.0));
    run_until(&mut ai, 1.0, |ai| ai.state() == Some(BossState::Attack));
    assert_eq!(ai.state(), Some(BossState::Attack));

    let before = nav.state().internal_syncs;
    assert!(ai.change_state(BossState::Chase, true));

    // Финальный sync делает только exit, отменённый SyncTask не повторяет его
    let state = nav.state();
    assert_eq!(state.internal_syncs, before + 1);
    assert!(state.position_authority);
    assert_eq!(ai.task_labels(), Vec::<&str>::new());
}

#[test]
fn test_root_motion_attack_hands_back_without_snap() {
    let mut animator = HeadlessAnimator::new(0.5);
    for clip in [clips::SLASH_1, clips::SLASH_2, clips::SLASH_3, clips::DASH_SLASH] {
        animator = animator.with_root_motion(clip, Vec3::new(0.0, 0.0, 1.0));
    }
    let nav = HeadlessNav::new(Vec3::ZERO, 50.0);
    let sensor = HeadlessSensor::new(20.0);
    let mut ai = boss_with(
        calm_config(),
        Collaborators::new()
            .with_nav(nav.clone())
            .with_sensor(sensor.clone())
            .with_animator(animator),
    );

    sensor.show_target(Vec3::new(2.0, 0.0, 0.0));
    run_until(&mut ai, 1.0, |ai| ai.state() == Some(BossState::Attack));
    run(&mut ai, 0.4);

    let moved = ai.position();
    assert!(moved.z > 0.1);

    // Цель пропала: атака доигрывает и уходит в Search
    sensor.hide_target();
    let events = run_until(&mut ai, 2.0, |ai| ai.state() != Some(BossState::Attack));

    assert_eq!(ai.state(), Some(BossState::Search));
    assert!(events.iter().any(|e| matches!(e, AgentEvent::PlayerLost { last_known: Some(_), .. })));

    let state = nav.state();
    assert_eq!(state.warps, 0);
    assert!(state.position_authority);
    assert!(state.position.distance(ai.position()) < 1e-4);
}

#[test]
fn test_search_times_out_into_wander() {
    let config = BossConfig {
        search_duration: 1.0,
        ..calm_config()
    };
    let mut ai = boss_with(config, Collaborators::new());

    assert!(ai.change_state(BossState::Search, true));
    ai.drain_events();
    let events = run(&mut ai, 1.2);

    assert_eq!(ai.state(), Some(BossState::Wander));
    assert_eq!(transitions(&events), vec![(Some("Search"), "Wander")]);
}

#[test]
fn test_sighting_pulls_boss_out_of_search() {
    let sensor = HeadlessSensor::new(20.0);
    let mut ai = boss_with(calm_config(), Collaborators::new().with_sensor(sensor.clone()));
    ai.change_state(BossState::Search, true);

    sensor.show_target(Vec3::new(10.0, 0.0, 0.0));
    run(&mut ai, 0.05);

    assert_eq!(ai.state(), Some(BossState::Chase));
}

#[test]
fn test_lost_target_in_chase_goes_to_search() {
    let sensor = HeadlessSensor::new(20.0);
    let mut ai = boss_with(calm_config(), Collaborators::new().with_sensor(sensor.clone()));

    sensor.show_target(Vec3::new(10.0, 0.0, 0.0));
    run(&mut ai, 0.1);
    assert_eq!(ai.state(), Some(BossState::Chase));

    sensor.hide_target();
    run(&mut ai, 2.2);
    assert_eq!(ai.state(), Some(BossState::Search));
}

#[test]
fn test_stun_routes_by_target_knowledge() {
    let config = BossConfig {
        stun_duration: 0.5,
        ..calm_config()
    };
    let mut ai = boss_with(config, Collaborators::new());

    assert!(ai.force_into_stun());
    run(&mut ai, 1.0);

    // Ни цели, ни последней позиции → Wander
    assert_eq!(ai.state(), Some(BossState::Wander));
}

#[test]
fn test_lethal_damage_is_terminal() {
    let mut ai = boss_with(calm_config(), Collaborators::new());

    assert_eq!(ai.take_damage(5000.0, Vec3::X, false, false), HitOutcome::Died);
    assert_eq!(ai.state(), Some(BossState::Death));
    assert!(ai.machine().is_sealed());
    assert!(!ai.force_into_stun());
    assert_eq!(ai.take_damage(1.0, Vec3::X, false, false), HitOutcome::Ignored);
}
