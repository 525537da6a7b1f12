//! Поведенческие сценарии Creeper (headless коллабораторы, фиксированный dt)

use bevy::prelude::*;
use hostile_ai::collab::headless::{HeadlessAnimator, HeadlessAudio, HeadlessNav, HeadlessSensor};
use hostile_ai::creeper::{clips, sounds};
use hostile_ai::{
    AgentController, AgentEvent, AgentId, Collaborators, CreeperConfig, CreeperSpawn, CreeperState, HitOutcome,
    MonsterAi,
};

const DT: f32 = 1.0 / 60.0;

fn quiet_config() -> CreeperConfig {
    CreeperConfig {
        surge_chance: 0.0,
        ..Default::default()
    }
}

fn creeper_with(config: CreeperConfig, collab: Collaborators) -> MonsterAi {
    let mut ai = MonsterAi::new(CreeperSpawn::new(AgentId(1), Vec3::ZERO), config, collab);
    ai.drain_events();
    ai
}

/// Прогон `seconds` симуляции, возвращает все события.
fn run(ai: &mut MonsterAi, seconds: f32) -> Vec<AgentEvent> {
    let ticks = (seconds / DT).ceil() as usize;
    let mut events = Vec::new();
    for _ in 0..ticks {
        ai.tick(DT);
        events.extend(ai.drain_events());
    }
    events
}

fn entered(events: &[AgentEvent]) -> Vec<&'static str> {
    events
        .iter()
        .filter_map(|event| match event {
            AgentEvent::StateChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect()
}

#[test]
fn test_normal_hit_in_chase_returns_to_chase() {
    let mut ai = creeper_with(quiet_config(), Collaborators::new());
    assert!(ai.change_state(CreeperState::Chase, true));
    ai.drain_events();

    // Hiss после хита уже был: реакция сразу возвращает в Chase
    ai.body_mut().flags.has_hissed_after_hit = true;
    let outcome = ai.take_damage(40.0, Vec3::new(0.0, 0.0, -3.0), false, false);

    assert_eq!(outcome, HitOutcome::Reacted { successor: "Chase" });
    assert_eq!(ai.state(), Some(CreeperState::Hit));
    assert!(ai.flags().is_processing_hit);
    assert_eq!(ai.flags().queued_state_after_hit, Some(CreeperState::Chase));

    let events = run(&mut ai, 0.1);

    assert_eq!(entered(&events), ["Hit", "Chase"]);
    assert_eq!(ai.state(), Some(CreeperState::Chase));
    assert!(!ai.flags().is_processing_hit);
    assert_eq!(ai.health().current(), 60.0);
}

#[test]
fn test_first_hit_hisses_then_chases() {
    let mut ai = creeper_with(quiet_config(), Collaborators::new());
    ai.change_state(CreeperState::Chase, true);
    ai.drain_events();

    ai.take_damage(10.0, Vec3::new(3.0, 0.0, 0.0), false, false);
    let events = run(&mut ai, 2.0);

    assert_eq!(entered(&events)[..3], ["Hit", "Hiss", "Chase"]);
    assert!(ai.flags().has_hissed_after_hit);
}

#[test]
fn test_lethal_hard_hit_goes_to_die_over_mailbox() {
    let mut ai = creeper_with(quiet_config(), Collaborators::new());
    ai.change_state(CreeperState::Chase, true);
    ai.body_mut().core.health.set(30.0, 100.0);
    ai.body_mut().flags.queued_state_after_hit = Some(CreeperState::Hiss);
    ai.drain_events();

    let outcome = ai.take_damage(40.0, Vec3::X, true, false);

    assert_eq!(outcome, HitOutcome::Died);
    assert_eq!(ai.state(), Some(CreeperState::Die));
    assert!(ai.health().is_dead());
    assert!(ai.machine().is_sealed());
    assert_eq!(ai.flags().queued_state_after_hit, None);

    let events = ai.drain_events();
    assert!(events.iter().any(|e| matches!(e, AgentEvent::Died { .. })));

    // Терминально: никакие переходы и урон больше не проходят
    assert!(!ai.change_state(CreeperState::Chase, true));
    assert_eq!(ai.take_damage(5.0, Vec3::X, false, false), HitOutcome::Ignored);
    run(&mut ai, 1.0);
    assert_eq!(ai.state(), Some(CreeperState::Die));
}

#[test]
fn test_surge_absorbs_normal_hits_up_to_limit() {
    let config = CreeperConfig {
        surge_chance: 1.0,
        normal_hits_to_interrupt: 2,
        ..Default::default()
    };
    let audio = HeadlessAudio::new();
    let mut ai = creeper_with(config, Collaborators::new().with_audio(audio.clone()));
    ai.change_state(CreeperState::Chase, true);

    assert!(ai.flags().is_power_surging);
    assert_eq!(audio.state().current_loop.as_deref(), Some(sounds::SURGE_LOOP));
    ai.drain_events();

    let origin = Vec3::new(0.0, 0.0, 20.0);
    assert_eq!(ai.take_damage(5.0, origin, false, false), HitOutcome::Absorbed);
    assert_eq!(ai.take_damage(5.0, origin, false, false), HitOutcome::Absorbed);
    assert_eq!(ai.state(), Some(CreeperState::Chase));

    let absorbed: Vec<u32> = ai
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            AgentEvent::HitAbsorbed { absorbed, .. } => Some(absorbed),
            _ => None,
        })
        .collect();
    assert_eq!(absorbed, vec![1, 2]);

    // Третий обычный хит прорывает surge
    let outcome = ai.take_damage(5.0, origin, false, false);
    assert!(matches!(outcome, HitOutcome::Reacted { .. }));
    assert_eq!(ai.state(), Some(CreeperState::Hit));
    assert!(!ai.flags().is_power_surging);
    assert_eq!(ai.health().current(), 85.0);
}

#[test]
fn test_surge_carries_through_strike() {
    let config = CreeperConfig {
        surge_chance: 1.0,
        normal_hits_to_interrupt: 2,
        ..Default::default()
    };
    let sensor = HeadlessSensor::new(10.0);
    let mut ai = creeper_with(
        config,
        Collaborators::new()
            .with_sensor(sensor.clone())
            .with_animator(HeadlessAnimator::new(0.4)),
    );
    ai.change_state(CreeperState::Chase, true);
    assert!(ai.flags().is_power_surging);
    ai.drain_events();

    let origin = Vec3::new(0.0, 0.0, 20.0);
    assert_eq!(ai.take_damage(5.0, origin, false, false), HitOutcome::Absorbed);

    // Цель в зоне удара: Chase → Hiss(attack)
    sensor.show_target(Vec3::new(1.0, 0.0, 0.0));
    let mut events = Vec::new();
    for _ in 0..30 {
        ai.tick(DT);
        events.extend(ai.drain_events());
        if ai.state() == Some(CreeperState::Hiss) {
            break;
        }
    }
    assert_eq!(ai.state(), Some(CreeperState::Hiss));
    assert!(ai.body().strike_in_progress);
    assert!(ai.flags().is_power_surging);

    // Во время удара surge тоже держит хит
    assert_eq!(ai.take_damage(5.0, origin, false, false), HitOutcome::Absorbed);
    assert_eq!(ai.state(), Some(CreeperState::Hiss));

    sensor.hide_target();
    events.extend(run(&mut ai, 0.5));
    assert_eq!(ai.state(), Some(CreeperState::Chase));
    assert!(ai.flags().is_power_surging);
    assert_eq!(ai.flags().surge_normal_hits_count, 2);
    assert!(ai.body().surge_time_left < 8.0);
    assert!(!events.iter().any(|e| matches!(e, AgentEvent::PowerSurge { .. })));

    // Лимит исчерпан до удара и во время него: следующий хит прерывает
    let outcome = ai.take_damage(5.0, origin, false, false);
    assert!(matches!(outcome, HitOutcome::Reacted { .. }));
    assert_eq!(ai.state(), Some(CreeperState::Hit));
    assert!(!ai.flags().is_power_surging);
}

#[test]
fn test_surge_does_not_absorb_hard_hits() {
    let config = CreeperConfig {
        surge_chance: 1.0,
        ..Default::default()
    };
    let mut ai = creeper_with(config, Collaborators::new());
    ai.change_state(CreeperState::Chase, true);

    let outcome = ai.take_damage(5.0, Vec3::Z, true, false);

    assert_eq!(outcome, HitOutcome::Reacted { successor: "Chase" });
    assert_eq!(ai.state(), Some(CreeperState::Hit));
}

#[test]
fn test_wander_falls_back_to_home_outside_navmesh() {
    let config = CreeperConfig {
        wander_sample_distance: 0.0,
        ..quiet_config()
    };
    // Проходима только точка (0, 0): любая случайная точка вне поверхности
    let nav = HeadlessNav::with_area(Vec3::ZERO, Vec2::ZERO, Vec2::ZERO);
    let mut ai = creeper_with(config, Collaborators::new().with_nav(nav.clone()));
    assert_eq!(ai.state(), Some(CreeperState::Wander));

    run(&mut ai, 0.05);

    assert_eq!(nav.state().destinations.first().copied(), Some(Vec3::ZERO));
}

#[test]
fn test_stun_hit_chains_stun_hiss_chase() {
    let mut ai = creeper_with(quiet_config(), Collaborators::new());
    ai.change_state(CreeperState::Chase, true);
    ai.drain_events();

    let outcome = ai.take_damage(10.0, Vec3::new(0.0, 0.0, 4.0), false, true);
    assert_eq!(outcome, HitOutcome::Reacted { successor: "Stun" });

    let events = run(&mut ai, 5.0);

    assert_eq!(entered(&events)[..4], ["Hit", "Stun", "Hiss", "Chase"]);
    assert_eq!(ai.body().after_stun, None);
}

#[test]
fn test_forced_stun_routes_to_wander_without_target() {
    let mut ai = creeper_with(quiet_config(), Collaborators::new());
    ai.change_state(CreeperState::Chase, true);
    ai.drain_events();

    assert!(ai.force_into_stun());
    assert_eq!(ai.state(), Some(CreeperState::Stun));

    let events = run(&mut ai, 3.5);
    assert_eq!(entered(&events), ["Stun", "Wander"]);
}

#[test]
fn test_hard_hit_at_low_health_leaves_creeper_down() {
    let mut ai = creeper_with(quiet_config(), Collaborators::new());
    ai.change_state(CreeperState::Chase, true);
    ai.body_mut().core.health.set(30.0, 100.0);

    ai.take_damage(10.0, Vec3::new(0.0, 0.0, -2.0), true, false);
    run(&mut ai, 2.0);

    assert_eq!(ai.state(), Some(CreeperState::Incapacitated));
    assert!(ai.flags().is_incapacitated);
    // Лежачий поглощает урон без реакции
    assert_eq!(ai.take_damage(5.0, Vec3::X, false, false), HitOutcome::Absorbed);
    assert_eq!(ai.health().current(), 15.0);
}

#[test]
fn test_incapacitated_creeper_revives_on_detection() {
    let config = CreeperConfig {
        start_incapacitated: true,
        resurrection_chance: 1.0,
        ..quiet_config()
    };
    let sensor = HeadlessSensor::new(10.0);
    let mut ai = creeper_with(config, Collaborators::new().with_sensor(sensor.clone()));
    assert_eq!(ai.state(), Some(CreeperState::Incapacitated));
    // Пока лежит: короткий radius
    assert_eq!(sensor.state().detection_radius, 3.0);

    sensor.show_target(Vec3::new(2.0, 0.0, 0.0));
    let events = run(&mut ai, 2.0);

    assert!(events.iter().any(|e| matches!(e, AgentEvent::Resurrected { .. })));
    assert_eq!(entered(&events)[..2], ["Hiss", "Chase"]);
    assert!(!ai.flags().is_incapacitated);
    assert!(!ai.flags().is_resurrecting);
    assert_eq!(ai.flags().incapacitated_detection_count, 1);
    assert_eq!(sensor.state().detection_radius, 10.0);
}

#[test]
fn test_failed_resurrection_raises_chance() {
    let config = CreeperConfig {
        start_incapacitated: true,
        resurrection_chance: 0.0,
        resurrection_chance_step: 0.5,
        ..quiet_config()
    };
    let sensor = HeadlessSensor::new(10.0);
    let mut ai = creeper_with(config, Collaborators::new().with_sensor(sensor.clone()));

    sensor.show_target(Vec3::new(1.0, 0.0, 0.0));
    run(&mut ai, 0.1);

    assert_eq!(ai.state(), Some(CreeperState::Incapacitated));
    assert_eq!(ai.flags().incapacitated_detection_count, 1);
    assert_eq!(ai.flags().resurrection_chance, 0.5);
}

#[test]
fn test_hit_finalizer_unsticks_hit_without_record() {
    let mut ai = creeper_with(quiet_config(), Collaborators::new());

    assert!(ai.change_state(CreeperState::Hit, true));
    assert!(ai.flags().is_processing_hit);

    run(&mut ai, 0.05);

    assert_eq!(ai.state(), Some(CreeperState::Chase));
    assert!(!ai.flags().is_processing_hit);
}

#[test]
fn test_chase_strikes_target_in_reach() {
    let sensor = HeadlessSensor::new(10.0);
    let animator = HeadlessAnimator::new(0.4);
    let mut ai = creeper_with(
        quiet_config(),
        Collaborators::new()
            .with_sensor(sensor.clone())
            .with_animator(animator.clone()),
    );

    sensor.show_target(Vec3::new(1.0, 0.0, 0.0));
    let events = run(&mut ai, 0.2);

    assert!(events.iter().any(|e| matches!(e, AgentEvent::Strike { .. })));
    assert_eq!(entered(&events)[..2], ["Chase", "Hiss"]);
    assert!(animator.has_played(clips::ATTACK));
}

#[test]
fn test_disabled_creeper_ignores_damage_and_ticks() {
    let mut ai = creeper_with(quiet_config(), Collaborators::new());
    ai.change_state(CreeperState::Chase, true);

    assert!(ai.set_enabled(false));
    assert!(!ai.set_enabled(false));
    assert!(ai.task_labels().is_empty());

    assert_eq!(ai.take_damage(50.0, Vec3::X, true, false), HitOutcome::Ignored);
    assert_eq!(ai.health().current(), 100.0);

    ai.drain_events();
    assert!(run(&mut ai, 0.5).is_empty());

    assert!(ai.set_enabled(true));
    assert_eq!(ai.state(), Some(CreeperState::Chase));
}

#[test]
fn test_idle_walks_to_eating_spot_and_eats() {
    let nav = HeadlessNav::new(Vec3::ZERO, 20.0);
    let animator = HeadlessAnimator::new(0.3);
    let audio = HeadlessAudio::new();
    let spot = Vec3::new(2.0, 0.0, 0.0);
    let mut ai = MonsterAi::new(
        CreeperSpawn::new(AgentId(3), Vec3::ZERO).with_eating_spot(spot),
        quiet_config(),
        Collaborators::new()
            .with_nav(nav.clone())
            .with_animator(animator.clone())
            .with_audio(audio.clone()),
    );
    assert_eq!(ai.state(), Some(CreeperState::Idle));

    run(&mut ai, 4.0);

    assert!(animator.has_played(clips::GET_DOWN));
    assert!(animator.has_played(clips::EAT));
    assert_eq!(audio.state().current_loop.as_deref(), Some(sounds::EAT_LOOP));
    assert!(nav.state().position.distance(spot) < 0.5);
}
