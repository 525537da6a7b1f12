//! Incapacitated: лежит, слушает короткий "can-be-revived" радиус.
//!
//! Воскрешение решает контроллер (`CreeperBody::watch_for_resurrection`),
//! здесь только поза и get-up sequence.

use crate::agent::AgentEvent;
use crate::creeper::{clips, CreeperBody, CreeperState};
use crate::fsm::State;
use crate::sequence::{Sequence, Step, TaskEnd};

use super::{by_facing, spawn_owned};

pub struct IncapacitatedState;

impl State<CreeperBody> for IncapacitatedState {
    fn enter(&mut self, ctx: &mut CreeperBody) {
        ctx.flags.is_incapacitated = true;
        ctx.flags.is_resurrecting = false;
        ctx.end_surge();
        ctx.shrink_detection();

        if let Some(nav) = ctx.core.nav() {
            nav.stop();
            nav.set_position_authority(false);
        }

        let facing = ctx.flags.last_hit.facing(ctx.core.forward());
        let blend = ctx.config.blend_time;
        ctx.core.play(by_facing(facing, clips::DOWN_FRONT, clips::DOWN_BACK), blend);
    }

    fn exit(&mut self, ctx: &mut CreeperBody) {
        ctx.flags.is_incapacitated = false;
        ctx.flags.is_resurrecting = false;
        ctx.restore_detection();

        if let Some(nav) = ctx.core.nav() {
            nav.set_position_authority(true);
            nav.resume();
        }
    }
}

/// Успешный бросок: встаём (урон игнорируется), потом Hiss → Chase.
pub(crate) fn begin_resurrection(ctx: &mut CreeperBody) {
    ctx.flags.is_resurrecting = true;
    spawn_owned(ctx, Resurrection { rising: false });
}

struct Resurrection {
    rising: bool,
}

impl Sequence<CreeperBody> for Resurrection {
    fn label(&self) -> &'static str {
        "creeper_resurrection"
    }

    fn resume(&mut self, ctx: &mut CreeperBody, _dt: f32) -> Step {
        if !self.rising {
            self.rising = true;
            let facing = ctx.flags.last_hit.facing(ctx.core.forward());
            let blend = ctx.config.blend_time;
            return ctx.core.play_and_wait(
                by_facing(facing, clips::GET_UP_FRONT, clips::GET_UP_BACK),
                blend,
                0.0,
            );
        }

        ctx.flags.is_resurrecting = false;
        ctx.flags.is_incapacitated = false;
        ctx.flags.resurrection_chance = ctx.config.resurrection_chance;
        ctx.restore_detection();

        let agent = ctx.core.id;
        ctx.core.emit(AgentEvent::Resurrected { agent });
        crate::logger::log(&format!("🧟 Creeper {:?} rises again", agent));

        ctx.request_hiss(clips::HISS, CreeperState::Chase);
        Step::Done
    }

    fn finalize(&mut self, ctx: &mut CreeperBody, end: TaskEnd) {
        if end != TaskEnd::Completed {
            ctx.flags.is_resurrecting = false;
        }
    }
}
