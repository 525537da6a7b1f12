//! Search: чистый таймер → Wander.

use crate::boss::{BossBody, BossState};
use crate::fsm::State;

#[derive(Default)]
pub struct SearchState {
    remaining: f32,
}

impl State<BossBody> for SearchState {
    fn enter(&mut self, ctx: &mut BossBody) {
        self.remaining = ctx.config.search_duration;

        let speed = ctx.config.walk_speed;
        match ctx.core.target.last_known {
            Some(last) => {
                ctx.core.move_to(last, speed);
            }
            None => ctx.core.stop_moving(),
        }
    }

    fn update(&mut self, ctx: &mut BossBody, dt: f32) {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            ctx.machine.request(BossState::Wander, false);
        }
    }
}
