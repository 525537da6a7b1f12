//! Health + контекст последнего хита.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::shared::flat_direction;

/// Здоровье агента
///
/// Инвариант: 0 ≤ current ≤ max.
/// current == 0 → агент на death path, обратно не возвращается.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    /// Вычитает урон (отрицательный игнорируется), возвращает остаток.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        self.current = (self.current - amount.max(0.0)).clamp(0.0, self.max);
        self.current
    }

    /// Restore из snapshot (clamp в [0, max]).
    pub fn set(&mut self, current: f32, max: f32) {
        self.max = max.max(0.0);
        self.current = current.clamp(0.0, self.max);
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }
}

/// Откуда прилетел хит относительно взгляда агента.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Front,
    Back,
}

impl Facing {
    /// `toward_origin`: вектор от агента к источнику хита.
    /// Нулевой вектор (invalid hit data) → Front.
    pub fn from_hit(forward: Vec3, toward_origin: Vec3) -> Self {
        let (Some(forward), Some(toward)) = (flat_direction(forward), flat_direction(toward_origin))
        else {
            return Facing::Front;
        };

        if forward.dot(toward) >= 0.0 {
            Facing::Front
        } else {
            Facing::Back
        }
    }
}

/// Контекст последнего хита (читается следующим реактивным состоянием).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HitRecord {
    /// От агента к источнику хита (может быть нулевым).
    pub direction: Vec3,
    pub hard: bool,
    pub stun: bool,
}

impl HitRecord {
    pub fn new(agent_position: Vec3, origin: Vec3, hard: bool, stun: bool) -> Self {
        Self {
            direction: origin - agent_position,
            hard,
            stun,
        }
    }

    pub fn facing(&self, forward: Vec3) -> Facing {
        Facing::from_hit(forward, self.direction)
    }
}
