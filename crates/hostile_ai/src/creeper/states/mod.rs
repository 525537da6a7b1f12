//! Состояния Creeper. Один объект на состояние, живут всю жизнь агента.

use super::{CreeperBody, CreeperState};
use crate::agent::Facing;
use crate::fsm::StateTable;
use crate::sequence::{Sequence, TaskId};

pub mod chase;
pub mod die;
pub mod hiss;
pub mod hit;
pub mod idle;
pub mod incapacitated;
pub mod stun;
pub mod wander;

pub fn build_table() -> StateTable<CreeperState, CreeperBody> {
    StateTable::new()
        .with(CreeperState::Idle, idle::IdleState)
        .with(CreeperState::Wander, wander::WanderState)
        .with(CreeperState::Chase, chase::ChaseState::default())
        .with(CreeperState::Hiss, hiss::HissState)
        .with(CreeperState::Hit, hit::HitState)
        .with(CreeperState::Stun, stun::StunState)
        .with(CreeperState::Incapacitated, incapacitated::IncapacitatedState)
        .with(CreeperState::Die, die::DieState)
}

/// Задача, принадлежащая текущему состоянию.
pub(crate) fn spawn_owned(
    ctx: &mut CreeperBody,
    sequence: impl Sequence<CreeperBody> + 'static,
) -> Option<TaskId> {
    let token = ctx.machine.token()?;
    Some(ctx.tasks.spawn(token, sequence))
}

pub(crate) fn by_facing(facing: Facing, front: &'static str, back: &'static str) -> &'static str {
    match facing {
        Facing::Front => front,
        Facing::Back => back,
    }
}
