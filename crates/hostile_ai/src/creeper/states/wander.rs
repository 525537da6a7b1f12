//! Wander: случайная точка вокруг якоря → идём → hiss → пауза → повтор.

use std::f32::consts::TAU;

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::collab::NavigationAgent;
use crate::creeper::{clips, sounds, CreeperBody, CreeperState};
use crate::fsm::State;
use crate::sequence::{PollTimeout, Sequence, Step};

use super::spawn_owned;

pub struct WanderState;

impl State<CreeperBody> for WanderState {
    fn enter(&mut self, ctx: &mut CreeperBody) {
        ctx.flags.has_hissed_after_hit = false;
        if let Some(nav) = ctx.core.nav() {
            nav.set_position_authority(true);
            nav.set_rotation_authority(true);
        }
        spawn_owned(ctx, WanderSequence::new());
    }

    fn update(&mut self, ctx: &mut CreeperBody, _dt: f32) {
        if ctx.core.target_in_sight() {
            ctx.request_state(CreeperState::Chase);
        }
    }
}

/// Случайная точка в круге `radius` вокруг `center`, прижатая к проходимой
/// поверхности. Если поверхности рядом нет: `anchor`.
pub fn pick_wander_destination(
    rng: &mut ChaCha8Rng,
    nav: Option<&dyn NavigationAgent>,
    center: Vec3,
    anchor: Vec3,
    radius: f32,
    sample_distance: f32,
) -> Vec3 {
    let angle = rng.gen_range(0.0..TAU);
    let distance = radius.max(0.0) * rng.gen::<f32>().sqrt();
    let candidate = center + Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance);

    match nav {
        Some(nav) => nav.sample_position(candidate, sample_distance).unwrap_or(anchor),
        None => candidate,
    }
}

fn random_wait(rng: &mut ChaCha8Rng, min: f32, max: f32) -> f32 {
    let (lo, hi) = (min.min(max).max(0.0), min.max(max).max(0.0));
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WanderPhase {
    Pick,
    Walk,
    Flourish,
    Rest,
}

struct WanderSequence {
    phase: WanderPhase,
    arrive: PollTimeout,
}

impl WanderSequence {
    fn new() -> Self {
        Self {
            phase: WanderPhase::Pick,
            arrive: PollTimeout::new(0.0),
        }
    }
}

impl Sequence<CreeperBody> for WanderSequence {
    fn label(&self) -> &'static str {
        "creeper_wander"
    }

    fn resume(&mut self, ctx: &mut CreeperBody, dt: f32) -> Step {
        match self.phase {
            WanderPhase::Pick => {
                let center = ctx.investigate_point.take().unwrap_or(ctx.home);
                let destination = pick_wander_destination(
                    &mut ctx.core.rng,
                    ctx.core.collab.nav.as_deref(),
                    center,
                    ctx.home,
                    ctx.config.wander_radius,
                    ctx.config.wander_sample_distance,
                );

                let speed = ctx.config.walk_speed;
                if !ctx.core.move_to(destination, speed) {
                    let home = ctx.home;
                    crate::logger::log_warning(&format!(
                        "Creeper {:?}: wander point {:?} rejected, heading home {:?}",
                        ctx.core.id, destination, home
                    ));
                    ctx.core.move_to(home, speed);
                }

                self.arrive = PollTimeout::new(ctx.config.arrive_timeout);
                self.phase = WanderPhase::Walk;
                Step::frame()
            }
            WanderPhase::Walk => {
                if !ctx.core.arrived() && !self.arrive.tick(dt) {
                    return Step::frame();
                }
                ctx.core.stop_moving();
                self.phase = WanderPhase::Flourish;
                Step::frame()
            }
            WanderPhase::Flourish => {
                self.phase = WanderPhase::Rest;
                ctx.core.one_shot(sounds::HISS);
                let blend = ctx.config.blend_time;
                let fallback = ctx.config.hiss_fallback_duration;
                ctx.core.play_and_wait(clips::HISS, blend, fallback)
            }
            WanderPhase::Rest => {
                self.phase = WanderPhase::Pick;
                let wait = random_wait(
                    &mut ctx.core.rng,
                    ctx.config.wander_wait_min,
                    ctx.config.wander_wait_max,
                );
                Step::seconds(wait)
            }
        }
    }
}
