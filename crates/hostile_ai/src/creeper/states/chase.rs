//! Chase: преследование цели, power surge, удар в stopping distance.
//!
//! Surge заканчивается по таймеру или при выходе из боя (`CreeperBody::on_state_changed`),
//! hiss собственного удара боем считается.

use rand::Rng;

use crate::agent::AgentEvent;
use crate::creeper::{clips, sounds, CreeperBody, CreeperState};
use crate::fsm::State;
use crate::shared::flat_direction;

#[derive(Default)]
pub struct ChaseState {
    /// Секунд без line of sight в этом заходе в Chase.
    unseen: f32,
}

impl State<CreeperBody> for ChaseState {
    fn enter(&mut self, ctx: &mut CreeperBody) {
        self.unseen = 0.0;
        ctx.investigate_point = None;
        ctx.strike_in_progress = false;

        // Возврат после собственного удара: surge продолжается со своим темпом
        let surging = ctx.flags.is_power_surging;
        let speed = if surging {
            ctx.config.chase_speed * ctx.config.surge_speed_multiplier
        } else {
            ctx.config.chase_speed
        };
        let stopping = ctx.config.stopping_distance;
        if let Some(nav) = ctx.core.nav() {
            nav.set_position_authority(true);
            nav.set_rotation_authority(true);
            nav.set_stopping_distance(stopping);
            nav.set_speed(speed);
            nav.resume();
        }
        ctx.core
            .set_audio_loop(Some(if surging { sounds::SURGE_LOOP } else { sounds::CHASE_LOOP }));

        if !surging {
            let chance = ctx.config.surge_chance.clamp(0.0, 1.0) as f64;
            if ctx.core.rng.gen_bool(chance) {
                ctx.start_surge();
            }
        }

        // Атакующий не виден: бежим туда, откуда прилетело
        if ctx.core.target.best_known().is_none() {
            if let Some(direction) = flat_direction(ctx.flags.last_hit.direction) {
                let guess = ctx.core.position() + direction * ctx.config.stopping_distance.max(1.0);
                ctx.core.target.last_known = Some(guess);
            }
        }
        if let Some(target) = ctx.core.target.best_known() {
            if let Some(nav) = ctx.core.nav() {
                nav.set_destination(target);
            }
        }
    }

    fn update(&mut self, ctx: &mut CreeperBody, dt: f32) {
        if let Some(target) = ctx.core.target.position {
            self.unseen = 0.0;
            if let Some(nav) = ctx.core.nav() {
                nav.set_destination(target);
            }

            let in_reach = ctx
                .core
                .distance_to_target()
                .is_some_and(|d| d <= ctx.config.stopping_distance);
            if in_reach {
                strike(ctx, target);
            }
            return;
        }

        self.unseen += dt;
        if self.unseen >= ctx.config.lose_target_after {
            crate::logger::log(&format!(
                "👀 Creeper {:?}: lost target, investigating {:?}",
                ctx.core.id, ctx.core.target.last_known
            ));
            ctx.investigate_point = ctx.core.target.last_known;
            ctx.request_state(CreeperState::Wander);
            return;
        }

        if let Some(last) = ctx.core.target.last_known {
            if let Some(nav) = ctx.core.nav() {
                nav.set_destination(last);
            }
        }
    }
}

/// Attack-equivalent: удар + attack-hiss, потом снова Chase.
fn strike(ctx: &mut CreeperBody, target: bevy::prelude::Vec3) {
    let agent = ctx.core.id;
    ctx.core.emit(AgentEvent::Strike { agent, target });
    crate::logger::log(&format!("🗡️ Creeper {:?} strikes at {:?}", agent, target));
    ctx.strike_in_progress = ctx.request_hiss(clips::ATTACK, CreeperState::Chase);
}
