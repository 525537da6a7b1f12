//! Agent plumbing общий для обоих семейств (Creeper/Boss).
//!
//! - `AgentController`: object-safe интерфейс контроллера (Registry, ECS системы)
//! - `AgentCore`: общая часть "тела": health, transform, коллабораторы, RNG, память о цели
//! - `AgentEvent`: outbox контроллера → Bevy Events
//! - `AgentSnapshot`: плоский snapshot для внешнего save system

use std::sync::{Arc, Mutex, MutexGuard};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub mod core;
pub mod health;
pub mod snapshot;


pub use self::core::{AgentCore, TargetMemory};
pub use health::{Facing, Health, HitRecord};
pub use snapshot::{AgentFlagsSnapshot, AgentSnapshot, BossFlagsSnapshot, CreeperFlagsSnapshot, RestoreError};

/// Стабильный идентификатор агента (не Entity: переживает save/load).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    Creeper,
    Boss,
}

/// Что произошло с входящим уроном.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Resurrecting / уже мёртв / отключён: урон не применён.
    Ignored,
    /// Урон применён, реакции нет (surge resistance, лежачий агент).
    Absorbed,
    /// Урон применён, агент реагирует; successor: состояние после реакции.
    Reacted { successor: &'static str },
    /// Урон применён, но переход заблокирован (boss transition lock).
    Blocked,
    Died,
}

/// События агента (outbox → `EventWriter<AgentEvent>`).
#[derive(Event, Debug, Clone, PartialEq)]
pub enum AgentEvent {
    StateChanged {
        agent: AgentId,
        from: Option<&'static str>,
        to: &'static str,
    },
    Damaged {
        agent: AgentId,
        amount: f32,
        remaining: f32,
        hard: bool,
    },
    HitAbsorbed {
        agent: AgentId,
        absorbed: u32,
    },
    /// Creeper достал цель (attack-equivalent).
    Strike {
        agent: AgentId,
        target: Vec3,
    },
    Slash {
        agent: AgentId,
        clip: &'static str,
    },
    PowerSurge {
        agent: AgentId,
        active: bool,
    },
    /// Boss потерял игрока после атаки.
    PlayerLost {
        agent: AgentId,
        last_known: Option<Vec3>,
    },
    Resurrected {
        agent: AgentId,
    },
    Died {
        agent: AgentId,
    },
}

/// Интерфейс контроллера агента.
pub trait AgentController: Send {
    fn id(&self) -> AgentId;

    fn kind(&self) -> AgentKind;

    fn state_name(&self) -> Option<&'static str>;

    fn position(&self) -> Vec3;

    fn health(&self) -> Health;

    /// Один кадр симуляции.
    fn tick(&mut self, dt: f32);

    fn is_enabled(&self) -> bool;

    /// Возвращает true если флаг реально изменился.
    fn set_enabled(&mut self, enabled: bool) -> bool;

    fn take_damage(&mut self, amount: f32, origin: Vec3, is_hard: bool, is_stun: bool) -> HitOutcome;

    /// Административный forced переход в Stun.
    fn force_into_stun(&mut self) -> bool;

    fn warp_to(&mut self, destination: Vec3) -> bool;

    fn snapshot(&self) -> AgentSnapshot;

    fn restore(&mut self, snapshot: &AgentSnapshot) -> Result<(), RestoreError>;

    fn drain_events(&mut self) -> Vec<AgentEvent>;
}

pub type SharedAgent = Arc<Mutex<dyn AgentController>>;

pub fn share<A: AgentController + 'static>(agent: A) -> SharedAgent {
    Arc::new(Mutex::new(agent))
}

pub fn lock_agent(agent: &SharedAgent) -> MutexGuard<'_, dyn AgentController + 'static> {
    crate::shared::lock(agent)
}
