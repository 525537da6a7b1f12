//! Persistence boundary: плоский snapshot агента.
//!
//! Формат сериализации не наш: внешний save system берёт `AgentSnapshot`
//! через serde. Restore заново входит в сохранённое состояние через обычный
//! forced ChangeState, прогресс sequences не восстанавливается.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AgentId, AgentKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub kind: AgentKind,
    /// Имя состояния (`StateKey::name`), None-состояние сохраняется как "".
    pub state: String,
    pub health: f32,
    pub max_health: f32,
    pub position: [f32; 3],
    pub enabled: bool,
    pub flags: AgentFlagsSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentFlagsSnapshot {
    Creeper(CreeperFlagsSnapshot),
    Boss(BossFlagsSnapshot),
}

/// Классификационные флаги Creeper.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreeperFlagsSnapshot {
    pub is_processing_hit: bool,
    pub queued_state_after_hit: Option<String>,
    pub is_incapacitated: bool,
    pub is_resurrecting: bool,
    pub start_incapacitated: bool,
    pub incapacitated_detection_count: u32,
    pub resurrection_chance: f32,
    pub is_power_surging: bool,
    pub surge_normal_hits_count: u32,
    pub has_hissed_after_hit: bool,
    pub last_hit_direction: [f32; 3],
    pub last_hit_hard: bool,
    pub last_hit_stun: bool,
}

/// Классификационные флаги Boss.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BossFlagsSnapshot {
    pub stun_meter: f32,
    pub dash_queued: bool,
    pub pending_stun: bool,
    pub last_known_target: Option<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RestoreError {
    #[error("snapshot of {found:?} cannot be restored into a {expected:?} agent")]
    KindMismatch { expected: AgentKind, found: AgentKind },

    #[error("unknown {kind:?} state '{state}'")]
    UnknownState { kind: AgentKind, state: String },

    #[error("agent {0:?} is dead, restore refused")]
    Dead(AgentId),

    #[error("terminal state '{state}' with health {health} above zero")]
    TerminalWhileAlive { state: String, health: f32 },
}
