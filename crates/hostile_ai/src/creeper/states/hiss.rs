//! Hiss: стоим, шипим (клип известной длины), смотрим на цель, потом `next_after_hiss`.

use crate::creeper::{clips, sounds, CreeperBody};
use crate::fsm::State;
use crate::sequence::{Sequence, Step};

use super::spawn_owned;

pub struct HissState;

impl State<CreeperBody> for HissState {
    fn enter(&mut self, ctx: &mut CreeperBody) {
        ctx.core.stop_moving();
        if let Some(nav) = ctx.core.nav() {
            nav.set_rotation_authority(false);
        }

        let clip = ctx.hiss_clip;
        let duration = ctx
            .core
            .clip_duration(clip)
            .unwrap_or(ctx.config.hiss_fallback_duration);
        let blend = ctx.config.blend_time;
        ctx.core.play(clip, blend);
        if clip == clips::HISS {
            ctx.core.one_shot(sounds::HISS);
        }

        spawn_owned(ctx, HissSequence { remaining: duration });
    }

    fn exit(&mut self, ctx: &mut CreeperBody) {
        if let Some(nav) = ctx.core.nav() {
            nav.set_rotation_authority(true);
            nav.resume();
        }
        ctx.hiss_clip = clips::HISS;
    }
}

struct HissSequence {
    remaining: f32,
}

impl Sequence<CreeperBody> for HissSequence {
    fn label(&self) -> &'static str {
        "creeper_hiss"
    }

    fn resume(&mut self, ctx: &mut CreeperBody, dt: f32) -> Step {
        if let Some(target) = ctx.core.target.best_known() {
            let step = ctx.config.turn_speed * dt;
            ctx.core.face_towards(target, step);
        }

        self.remaining -= dt;
        if self.remaining > 0.0 {
            return Step::frame();
        }

        let next = ctx.next_after_hiss;
        ctx.request_state(next);
        Step::Done
    }
}
