//! Wander: placeholder (idle hook), узел графа без собственного поведения.

use crate::boss::{clips, BossBody};
use crate::fsm::State;

pub struct WanderState;

impl State<BossBody> for WanderState {
    fn enter(&mut self, ctx: &mut BossBody) {
        ctx.core.stop_moving();
        ctx.core.set_audio_loop(None);
        let blend = ctx.config.blend_time;
        ctx.core.play(clips::IDLE, blend);
    }
}
