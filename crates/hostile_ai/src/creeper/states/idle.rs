//! Idle: идём к месту кормёжки, ложимся, едим.

use crate::creeper::{clips, sounds, CreeperBody, CreeperState};
use crate::fsm::State;
use crate::sequence::{PollTimeout, Sequence, Step};

use super::spawn_owned;

pub struct IdleState;

impl State<CreeperBody> for IdleState {
    fn enter(&mut self, ctx: &mut CreeperBody) {
        ctx.flags.has_hissed_after_hit = false;

        match ctx.eating_spot {
            Some(spot) => {
                let speed = ctx.config.walk_speed;
                if !ctx.core.move_to(spot, speed) {
                    crate::logger::log_warning(&format!(
                        "Creeper {:?}: eating spot {:?} unreachable, eating in place",
                        ctx.core.id, spot
                    ));
                    ctx.core.stop_moving();
                }
                let timeout = ctx.config.arrive_timeout;
                spawn_owned(ctx, EatSequence::new(timeout));
            }
            None => {
                ctx.core.stop_moving();
                let blend = ctx.config.blend_time;
                ctx.core.play(clips::IDLE, blend);
            }
        }
    }

    fn update(&mut self, ctx: &mut CreeperBody, _dt: f32) {
        if ctx.core.target_in_sight() {
            ctx.request_state(CreeperState::Chase);
        }
    }

    fn exit(&mut self, ctx: &mut CreeperBody) {
        if ctx.eating_spot.is_some() && ctx.config.idle_ambient_loop {
            ctx.core.set_audio_loop(None);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EatPhase {
    Walk,
    GetDown,
    Eat,
    Settled,
}

/// get-down → eat → ambient loop. Отменяется выходом из Idle.
struct EatSequence {
    phase: EatPhase,
    arrive: PollTimeout,
}

impl EatSequence {
    fn new(arrive_timeout: f32) -> Self {
        Self {
            phase: EatPhase::Walk,
            arrive: PollTimeout::new(arrive_timeout),
        }
    }
}

impl Sequence<CreeperBody> for EatSequence {
    fn label(&self) -> &'static str {
        "creeper_eat"
    }

    fn resume(&mut self, ctx: &mut CreeperBody, dt: f32) -> Step {
        let blend = ctx.config.blend_time;
        match self.phase {
            EatPhase::Walk => {
                if !ctx.core.arrived() {
                    if !self.arrive.tick(dt) {
                        return Step::frame();
                    }
                    crate::logger::log_warning(&format!(
                        "Creeper {:?}: eating spot not reached in {:.1}s",
                        ctx.core.id,
                        self.arrive.elapsed()
                    ));
                }
                ctx.core.stop_moving();
                self.phase = EatPhase::GetDown;
                Step::frame()
            }
            EatPhase::GetDown => {
                self.phase = EatPhase::Eat;
                ctx.core.play_and_wait(clips::GET_DOWN, blend, 0.0)
            }
            EatPhase::Eat => {
                self.phase = EatPhase::Settled;
                ctx.core.play_and_wait(clips::EAT, blend, 0.0)
            }
            EatPhase::Settled => {
                if ctx.config.idle_ambient_loop {
                    ctx.core.set_audio_loop(Some(sounds::EAT_LOOP));
                }
                Step::Done
            }
        }
    }
}
