//! Chase: сближение с hysteresis и броском special attack раз в секунду.
//!
//! Special attack не сокращает дистанцию входа: dash становится первым ударом Attack.

use rand::Rng;

use crate::boss::range::{clamp_stopping_distance, should_enter_attack};
use crate::boss::{sounds, BossBody, BossState};
use crate::fsm::State;

#[derive(Default)]
pub struct ChaseState {
    unseen: f32,
    /// Накопитель для броска special attack (раз в секунду).
    roll_clock: f32,
}

impl State<BossBody> for ChaseState {
    fn enter(&mut self, ctx: &mut BossBody) {
        self.unseen = 0.0;
        self.roll_clock = 0.0;

        let config = &ctx.config;
        let stopping = clamp_stopping_distance(
            config.stopping_distance,
            config.attack_range,
            config.attack_range_buffer,
        );
        let speed = config.chase_speed;
        if let Some(nav) = ctx.core.nav() {
            nav.set_position_authority(true);
            nav.set_rotation_authority(true);
            nav.set_stopping_distance(stopping);
            nav.set_speed(speed);
            nav.resume();
        }
        ctx.core.set_audio_loop(Some(sounds::COMBAT_LOOP));
    }

    fn update(&mut self, ctx: &mut BossBody, dt: f32) {
        let Some(target) = ctx.core.target.position else {
            self.unseen += dt;
            if self.unseen >= ctx.config.lose_target_after {
                crate::logger::log(&format!(
                    "👀 Boss {:?}: target lost, searching",
                    ctx.core.id
                ));
                ctx.machine.request(BossState::Search, false);
            } else if let Some(last) = ctx.core.target.last_known {
                if let Some(nav) = ctx.core.nav() {
                    nav.set_destination(last);
                }
            }
            return;
        };

        self.unseen = 0.0;
        if let Some(nav) = ctx.core.nav() {
            nav.set_destination(target);
        }

        let distance = ctx.core.distance_to_target().unwrap_or(f32::MAX);
        if should_enter_attack(distance, ctx.config.attack_range, ctx.config.attack_range_buffer) {
            ctx.machine.request(BossState::Attack, false);
            return;
        }

        // Бросок только ставит dash в очередь: в Attack пускает тот же порог R - B
        if ctx.flags.dash_queued {
            return;
        }
        self.roll_clock += dt;
        while self.roll_clock >= 1.0 {
            self.roll_clock -= 1.0;
            let chance = ctx.config.special_attack_chance.clamp(0.0, 1.0) as f64;
            if ctx.core.rng.gen_bool(chance) {
                ctx.flags.dash_queued = true;
                crate::logger::log(&format!(
                    "⚔️ Boss {:?}: special attack (dash) queued at {:.1}m",
                    ctx.core.id, distance
                ));
                return;
            }
        }
    }
}
