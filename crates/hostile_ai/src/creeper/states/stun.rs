//! Stun: hit клип → stunned idle (или crossfade слоя с timeout) → пауза → маршрут.

use crate::creeper::{clips, CreeperBody, CreeperState};
use crate::fsm::State;
use crate::sequence::{PollTimeout, Sequence, Step};

use super::spawn_owned;

pub struct StunState;

impl State<CreeperBody> for StunState {
    fn enter(&mut self, ctx: &mut CreeperBody) {
        ctx.core.stop_moving();
        let timeout = ctx.config.animation_poll_timeout;
        spawn_owned(ctx, StunSequence::new(timeout));
    }

    fn exit(&mut self, ctx: &mut CreeperBody) {
        if let Some(nav) = ctx.core.nav() {
            nav.resume();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StunPhase {
    Start,
    Stunned,
    AwaitLayer,
    Route,
}

struct StunSequence {
    phase: StunPhase,
    layer_timeout: PollTimeout,
}

impl StunSequence {
    fn new(poll_timeout: f32) -> Self {
        Self {
            phase: StunPhase::Start,
            layer_timeout: PollTimeout::new(poll_timeout),
        }
    }
}

impl Sequence<CreeperBody> for StunSequence {
    fn label(&self) -> &'static str {
        "creeper_stun"
    }

    fn resume(&mut self, ctx: &mut CreeperBody, dt: f32) -> Step {
        let blend = ctx.config.blend_time;
        let hold = ctx.config.stun_duration;

        match self.phase {
            StunPhase::Start => {
                if ctx.core.has_animator() {
                    self.phase = StunPhase::Stunned;
                    return ctx.core.play_and_wait(clips::STUN_HIT, blend, 0.0);
                }
                if let Some(layer) = ctx.core.collab.layer.as_deref_mut() {
                    layer.crossfade(clips::STUNNED, blend);
                    self.phase = StunPhase::AwaitLayer;
                    return Step::frame();
                }
                self.phase = StunPhase::Route;
                Step::seconds(hold)
            }
            StunPhase::Stunned => {
                ctx.core.play(clips::STUNNED, blend);
                self.phase = StunPhase::Route;
                Step::seconds(hold)
            }
            StunPhase::AwaitLayer => {
                let entered = ctx
                    .core
                    .collab
                    .layer
                    .as_deref()
                    .is_none_or(|layer| layer.is_in_state(clips::STUNNED));
                if !entered {
                    if !self.layer_timeout.tick(dt) {
                        return Step::frame();
                    }
                    crate::logger::log_warning(&format!(
                        "Creeper {:?}: animator layer never reached '{}' ({:.1}s), continuing",
                        ctx.core.id,
                        clips::STUNNED,
                        self.layer_timeout.elapsed()
                    ));
                }
                self.phase = StunPhase::Route;
                Step::seconds(hold)
            }
            StunPhase::Route => {
                let next = route_after_stun(ctx);
                ctx.request_state(next);
                Step::Done
            }
        }
    }
}

/// Цепочка после стана → цель видна → последняя известная позиция → Wander.
fn route_after_stun(ctx: &mut CreeperBody) -> CreeperState {
    if let Some(next) = ctx.after_stun.take() {
        return next;
    }
    if ctx.core.target_in_sight() {
        return CreeperState::Chase;
    }
    if let Some(last) = ctx.core.target.last_known {
        ctx.investigate_point = Some(last);
    }
    CreeperState::Wander
}
