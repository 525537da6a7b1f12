//! Hostile AI Core
//!
//! Поведение враждебных NPC: иерархический FSM, Creeper (MonsterAI) и Boss (BossAI).
//!
//! HYBRID ARCHITECTURE:
//! - AI ядро = чистый Rust (state machines, hit arbitration, sequences)
//! - Bevy = хост (FixedUpdate tick, Registry resource, event fan-out)
//! - Движок = коллабораторы (navigation, animation, sensor, audio) через traits

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod agent;
pub mod boss;
pub mod collab;
pub mod config;
pub mod creeper;
pub mod fsm;
pub mod logger;
pub mod registry;
pub mod sequence;
pub mod shared;

// Re-export основных типов
pub use agent::{
    lock_agent, share, AgentController, AgentEvent, AgentId, AgentKind, AgentSnapshot, Health, HitOutcome,
    RestoreError, SharedAgent,
};
pub use boss::{BossAi, BossSpawn, BossState};
pub use collab::Collaborators;
pub use config::{BossConfig, CreeperConfig};
pub use creeper::{CreeperSpawn, CreeperState, MonsterAi};
pub use registry::{Registry, Selector};

// Re-export logger (хост подставляет свой printer)
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, log_with_level, set_log_level, set_logger,
    set_logger_if_needed, LogLevel, LogPrinter,
};

/// Главный plugin: Registry + tick агентов в FixedUpdate.
pub struct HostileAiPlugin;

impl Plugin for HostileAiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Registry>()
            .add_event::<AgentEvent>()
            .add_systems(
                FixedUpdate,
                (tick_hostile_agents, sync_agent_transforms, unregister_removed_agents).chain(),
            )
            // RemovedComponents живут два кадра, а FixedUpdate может кадр пропустить
            .add_systems(PostUpdate, unregister_removed_agents);
    }
}

/// ECS-владелец агента. Registry держит только Weak.
#[derive(Component, Clone)]
pub struct AgentHandle(pub SharedAgent);

/// Детерминистичный RNG resource (seeded): раздаёт seed'ы агентам
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed для следующего агента (порядок спавна определяет поток).
    pub fn agent_seed(&mut self) -> u64 {
        self.rng.gen()
    }
}

/// Один fixed-кадр: tick каждого агента (порядок по AgentId), события → EventWriter.
///
/// dt = фиксированный timestep (детерминизм не зависит от wall clock).
pub fn tick_hostile_agents(
    time: Res<Time<Fixed>>,
    agents: Query<&AgentHandle>,
    mut events: EventWriter<AgentEvent>,
) {
    let dt = time.timestep().as_secs_f32();

    let mut handles: Vec<(AgentId, &AgentHandle)> = agents
        .iter()
        .map(|handle| (lock_agent(&handle.0).id(), handle))
        .collect();
    handles.sort_by_key(|(id, _)| *id);

    for (_, handle) in handles {
        let drained = {
            let mut agent = lock_agent(&handle.0);
            agent.tick(dt);
            agent.drain_events()
        };
        for event in drained {
            events.write(event);
        }
    }
}

/// Позиция агента → Transform его entity (для рендера/отладки).
pub fn sync_agent_transforms(mut agents: Query<(&AgentHandle, &mut Transform)>) {
    for (handle, mut transform) in agents.iter_mut() {
        let position = lock_agent(&handle.0).position();
        if transform.translation != position {
            transform.translation = position;
        }
    }
}

/// Despawn entity → снимаем агента из Registry.
pub fn unregister_removed_agents(mut removed: RemovedComponents<AgentHandle>, mut registry: ResMut<Registry>) {
    for entity in removed.read() {
        if let Some(id) = registry.unregister_entity(entity) {
            crate::logger::log(&format!("🗑️ Agent {:?} despawned ({:?})", id, entity));
        }
    }
}

/// Спавн entity с агентом + регистрация.
pub fn spawn_agent(world: &mut World, agent: SharedAgent) -> Entity {
    let position = lock_agent(&agent).position();
    let entity = world
        .spawn((AgentHandle(agent.clone()), Transform::from_translation(position)))
        .id();
    world
        .get_resource_or_insert_with(Registry::default)
        .register_entity(&agent, entity);
    entity
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)) // 60Hz FixedUpdate
        .add_plugins(HostileAiPlugin);

    app
}
