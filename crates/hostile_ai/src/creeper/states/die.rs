//! Die: терминальное состояние. FSM запечатывается при входе.

use crate::agent::AgentEvent;
use crate::creeper::{clips, sounds, CreeperBody};
use crate::fsm::State;
use crate::sequence::{Sequence, Step};

use super::{by_facing, spawn_owned};

pub struct DieState;

impl State<CreeperBody> for DieState {
    fn enter(&mut self, ctx: &mut CreeperBody) {
        ctx.machine.seal();

        ctx.flags.is_processing_hit = false;
        ctx.flags.queued_state_after_hit = None;
        ctx.flags.is_resurrecting = false;
        ctx.end_surge();

        ctx.core.set_audio_loop(None);
        ctx.core.one_shot(sounds::DEATH);
        if let Some(nav) = ctx.core.nav() {
            nav.stop();
            nav.set_enabled(false);
        }
        ctx.core.set_sensor_enabled(false);

        let facing = ctx.flags.last_hit.facing(ctx.core.forward());
        let clip = by_facing(facing, clips::DIE_FRONT, clips::DIE_BACK);
        spawn_owned(ctx, Death { clip, played: false });

        let agent = ctx.core.id;
        ctx.core.emit(AgentEvent::Died { agent });
        crate::logger::log(&format!("💀 Creeper {:?} died", agent));
    }
}

struct Death {
    clip: &'static str,
    played: bool,
}

impl Sequence<CreeperBody> for Death {
    fn label(&self) -> &'static str {
        "creeper_death"
    }

    fn resume(&mut self, ctx: &mut CreeperBody, _dt: f32) -> Step {
        if !self.played {
            self.played = true;
            let blend = ctx.config.blend_time;
            return ctx.core.play_and_wait(self.clip, blend, 0.0);
        }
        // Поза трупа больше не меняется
        ctx.core.lock_animator();
        Step::Done
    }
}
