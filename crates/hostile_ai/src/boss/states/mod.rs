//! Состояния Boss.

use super::{BossBody, BossState};
use crate::fsm::StateTable;
use crate::sequence::{Sequence, TaskId};

pub mod attack;
pub mod chase;
pub mod death;
pub mod search;
pub mod stun;
pub mod wander;

pub fn build_table() -> StateTable<BossState, BossBody> {
    StateTable::new()
        .with(BossState::Attack, attack::AttackState)
        .with(BossState::Chase, chase::ChaseState::default())
        .with(BossState::Death, death::DeathState)
        .with(BossState::Search, search::SearchState::default())
        .with(BossState::Stun, stun::StunState)
        .with(BossState::Wander, wander::WanderState)
}

pub(crate) fn spawn_owned(ctx: &mut BossBody, sequence: impl Sequence<BossBody> + 'static) -> Option<TaskId> {
    let token = ctx.machine.token()?;
    Some(ctx.tasks.spawn(token, sequence))
}
