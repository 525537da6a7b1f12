//! Hit: реакция на урон.
//!
//! Normal hit → один клип реакции.
//! Hard hit → knockback (параллельная задача) + impact → collapse → дрожь → get-up,
//! с проверкой смерти после каждого клипа.
//!
//! Выход: Stun (stun hit) / mailbox / Chase. Finalizer гарантирует, что
//! агент не застрянет в Hit, если sequence закончилась без перехода.

use bevy::prelude::*;

use crate::agent::{Facing, HitRecord};
use crate::creeper::{clips, CreeperBody, CreeperState};
use crate::fsm::{State, StateKey};
use crate::sequence::{Sequence, Step, TaskEnd};
use crate::shared::flat_direction;

use super::{by_facing, spawn_owned};

pub struct HitState;

impl State<CreeperBody> for HitState {
    fn enter(&mut self, ctx: &mut CreeperBody) {
        ctx.flags.is_processing_hit = true;
        ctx.core.stop_moving();

        let Some(record) = ctx.pending_reaction.take() else {
            crate::logger::log_warning(&format!(
                "Creeper {:?}: Hit entered without a hit record",
                ctx.core.id
            ));
            spawn_owned(ctx, HitSequence::new(None, Facing::Front));
            return;
        };

        let facing = record.facing(ctx.core.forward());

        if record.hard && ctx.config.knockback_on_hard_hit {
            if let Some(toward) = flat_direction(record.direction) {
                spawn_owned(
                    ctx,
                    Knockback::new(
                        -toward,
                        ctx.config.knockback_distance,
                        ctx.config.knockback_duration,
                    ),
                );
            }
        }

        spawn_owned(ctx, HitSequence::new(Some(record), facing));
    }

    fn exit(&mut self, ctx: &mut CreeperBody) {
        ctx.flags.is_processing_hit = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HitPhase {
    Start,
    Collapse,
    Tremble,
    GetUp,
    Resolve,
}

struct HitSequence {
    record: Option<HitRecord>,
    facing: Facing,
    phase: HitPhase,
    /// Переход запрошен одним из нормальных выходов.
    resolved: bool,
}

impl HitSequence {
    fn new(record: Option<HitRecord>, facing: Facing) -> Self {
        Self {
            record,
            facing,
            phase: HitPhase::Start,
            resolved: false,
        }
    }

    fn play(&self, ctx: &mut CreeperBody, front: &'static str, back: &'static str) -> Step {
        let blend = ctx.config.blend_time;
        ctx.core.play_and_wait(by_facing(self.facing, front, back), blend, 0.0)
    }

    /// Death check на границе клипа.
    fn died(&mut self, ctx: &mut CreeperBody) -> bool {
        if ctx.core.health.is_alive() {
            return false;
        }
        ctx.flags.is_processing_hit = false;
        self.resolved = ctx.machine.request(CreeperState::Die, true);
        true
    }

    fn leave(&mut self, ctx: &mut CreeperBody, next: CreeperState) -> Step {
        ctx.flags.is_processing_hit = false;
        self.resolved = ctx.machine.request(next, false);
        Step::Done
    }
}

impl Sequence<CreeperBody> for HitSequence {
    fn label(&self) -> &'static str {
        "creeper_hit"
    }

    fn resume(&mut self, ctx: &mut CreeperBody, _dt: f32) -> Step {
        let Some(record) = self.record else {
            return Step::Done;
        };

        match self.phase {
            HitPhase::Start => {
                if record.hard {
                    self.phase = HitPhase::Collapse;
                    self.play(ctx, clips::HARD_HIT_FRONT, clips::HARD_HIT_BACK)
                } else {
                    self.phase = HitPhase::Resolve;
                    self.play(ctx, clips::HIT_FRONT, clips::HIT_BACK)
                }
            }
            HitPhase::Collapse => {
                if self.died(ctx) {
                    return Step::Done;
                }
                self.phase = HitPhase::Tremble;
                self.play(ctx, clips::COLLAPSE_FRONT, clips::COLLAPSE_BACK)
            }
            HitPhase::Tremble => {
                if self.died(ctx) {
                    return Step::Done;
                }
                self.phase = HitPhase::GetUp;
                Step::seconds(ctx.config.tremble_duration)
            }
            HitPhase::GetUp => {
                if self.died(ctx) {
                    return Step::Done;
                }
                if ctx.core.health.fraction() <= ctx.config.incapacitate_below {
                    crate::logger::log(&format!(
                        "🧟 Creeper {:?}: too weak to get up ({:.0}%)",
                        ctx.core.id,
                        ctx.core.health.fraction() * 100.0
                    ));
                    ctx.flags.queued_state_after_hit = None;
                    return self.leave(ctx, CreeperState::Incapacitated);
                }
                self.phase = HitPhase::Resolve;
                self.play(ctx, clips::GET_UP_FRONT, clips::GET_UP_BACK)
            }
            HitPhase::Resolve => {
                if self.died(ctx) {
                    return Step::Done;
                }
                let queued = ctx.flags.queued_state_after_hit.take();
                let next = if record.stun {
                    CreeperState::Stun
                } else {
                    queued.unwrap_or(CreeperState::Chase)
                };
                self.leave(ctx, next)
            }
        }
    }

    fn finalize(&mut self, ctx: &mut CreeperBody, end: TaskEnd) {
        if end != TaskEnd::Completed || self.resolved || !ctx.machine.is_in(CreeperState::Hit) {
            return;
        }

        let fallback = ctx
            .flags
            .queued_state_after_hit
            .take()
            .unwrap_or(CreeperState::Chase);
        crate::logger::log_warning(&format!(
            "Creeper {:?}: hit reaction ended without exit, forcing → {}",
            ctx.core.id,
            fallback.name()
        ));
        ctx.flags.is_processing_hit = false;
        ctx.machine.request(fallback, true);
    }
}

/// Физический откат от удара, параллельно с клипами.
struct Knockback {
    direction: Vec3,
    speed: f32,
    remaining: f32,
}

impl Knockback {
    fn new(direction: Vec3, distance: f32, duration: f32) -> Self {
        let duration = duration.max(1e-3);
        Self {
            direction,
            speed: distance.max(0.0) / duration,
            remaining: duration,
        }
    }
}

impl Sequence<CreeperBody> for Knockback {
    fn label(&self) -> &'static str {
        "creeper_knockback"
    }

    fn resume(&mut self, ctx: &mut CreeperBody, dt: f32) -> Step {
        let step = dt.min(self.remaining);
        let offset = self.direction * self.speed * step;

        match ctx.core.nav() {
            Some(nav) => nav.move_by(offset),
            None => ctx.core.transform.translation += offset,
        }

        self.remaining -= step;
        if self.remaining > 0.0 {
            Step::frame()
        } else {
            Step::Done
        }
    }
}
