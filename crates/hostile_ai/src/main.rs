//! Headless симуляция hostile AI
//!
//! Запускает Bevy App без рендера: один Creeper, один Boss, игрок ходит по кругу.

use bevy::prelude::*;

use hostile_ai::collab::headless::{HeadlessAnimator, HeadlessAudio, HeadlessNav, HeadlessSensor};
use hostile_ai::{
    create_headless_app, lock_agent, share, spawn_agent, AgentEvent, AgentId, AgentKind, BossAi, BossConfig,
    BossSpawn, Collaborators, CreeperConfig, CreeperSpawn, DeterministicRng, MonsterAi, Registry,
};

fn headless_collab(position: Vec3, sensor: &HeadlessSensor) -> Collaborators {
    Collaborators::new()
        .with_nav(HeadlessNav::new(position, 30.0))
        .with_animator(HeadlessAnimator::new(0.5))
        .with_sensor(sensor.clone())
        .with_audio(HeadlessAudio::new())
}

fn main() {
    let seed = 42;
    println!("Starting hostile AI headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);

    let creeper_sensor = HeadlessSensor::new(8.0);
    let boss_sensor = HeadlessSensor::new(12.0);

    let (creeper_seed, boss_seed) = {
        let mut rng = app.world_mut().resource_mut::<DeterministicRng>();
        (rng.agent_seed(), rng.agent_seed())
    };

    let creeper_home = Vec3::new(-6.0, 0.0, 0.0);
    let creeper = MonsterAi::new(
        CreeperSpawn::new(AgentId(1), creeper_home).with_seed(creeper_seed),
        CreeperConfig::default(),
        headless_collab(creeper_home, &creeper_sensor),
    );
    let boss_home = Vec3::new(6.0, 0.0, 0.0);
    let boss = BossAi::new(
        BossSpawn::new(AgentId(2), boss_home).with_seed(boss_seed),
        BossConfig::default(),
        headless_collab(boss_home, &boss_sensor),
    );

    spawn_agent(app.world_mut(), share(creeper));
    spawn_agent(app.world_mut(), share(boss));

    let mut died = 0usize;

    // Fixed шаг 60Hz, гоняем FixedUpdate напрямую (без реального времени)
    for tick in 0..1200u32 {
        let angle = tick as f32 * 0.01;
        let player = Vec3::new(angle.cos() * 10.0, 0.0, angle.sin() * 10.0);
        creeper_sensor.show_target(player);
        boss_sensor.show_target(player);

        app.world_mut().run_schedule(FixedUpdate);

        let events: Vec<AgentEvent> = app
            .world_mut()
            .resource_mut::<Events<AgentEvent>>()
            .drain()
            .collect();
        for event in events {
            match event {
                AgentEvent::StateChanged { agent, from, to } => {
                    println!("Tick {}: {:?} {:?} → {}", tick, agent, from, to);
                }
                AgentEvent::Died { .. } => died += 1,
                _ => {}
            }
        }

        if tick % 100 == 0 {
            let registry = app.world().resource::<Registry>();
            for kind in [AgentKind::Creeper, AgentKind::Boss] {
                for agent in registry.find_by_type(kind) {
                    let agent = lock_agent(&agent);
                    println!(
                        "Tick {}: {:?} {:?} state={:?} pos={:.1?} hp={:.0}",
                        tick,
                        kind,
                        agent.id(),
                        agent.state_name(),
                        agent.position(),
                        agent.health().current()
                    );
                }
            }
        }
    }

    println!("Simulation complete! ({} deaths)", died);
}
