//! Stun: stun meter сброшен, навигация заморожена, hit → stunned → пауза.
//!
//! Без богатого animator: ручной polling слоя с timeout.

use crate::boss::{clips, BossBody, BossState};
use crate::fsm::State;
use crate::sequence::{PollTimeout, Sequence, Step};

use super::spawn_owned;

pub struct StunState;

impl State<BossBody> for StunState {
    fn enter(&mut self, ctx: &mut BossBody) {
        ctx.flags.stun_meter = 0.0;
        ctx.flags.pending_stun = false;
        ctx.flags.dash_queued = false;
        ctx.core.stop_moving();

        crate::logger::log(&format!("💫 Boss {:?} stunned", ctx.core.id));

        let sequence = if ctx.core.has_animator() {
            StunSequence::Animated { stunned: false }
        } else if ctx.core.collab.layer.is_some() {
            StunSequence::Layer {
                requested: false,
                timeout: PollTimeout::new(ctx.config.animation_poll_timeout),
            }
        } else {
            StunSequence::Bare
        };
        spawn_owned(ctx, sequence);
    }

    fn exit(&mut self, ctx: &mut BossBody) {
        if let Some(nav) = ctx.core.nav() {
            nav.resume();
        }
    }
}

/// Варианты по доступному animation стеку.
enum StunSequence {
    Animated { stunned: bool },
    Layer { requested: bool, timeout: PollTimeout },
    Bare,
    Holding,
}

impl Sequence<BossBody> for StunSequence {
    fn label(&self) -> &'static str {
        "boss_stun"
    }

    fn resume(&mut self, ctx: &mut BossBody, dt: f32) -> Step {
        let blend = ctx.config.blend_time;
        let hold = ctx.config.stun_duration;

        match self {
            StunSequence::Animated { stunned: false } => {
                *self = StunSequence::Animated { stunned: true };
                ctx.core.play_and_wait(clips::STUN_HIT, blend, 0.0)
            }
            StunSequence::Animated { stunned: true } => {
                ctx.core.play(clips::STUNNED, blend);
                *self = StunSequence::Holding;
                Step::seconds(hold)
            }
            StunSequence::Layer { requested, timeout } => {
                let Some(layer) = ctx.core.collab.layer.as_deref_mut() else {
                    *self = StunSequence::Holding;
                    return Step::seconds(hold);
                };
                if !*requested {
                    layer.crossfade(clips::STUNNED, blend);
                    *requested = true;
                    return Step::frame();
                }
                if !layer.is_in_state(clips::STUNNED) {
                    if !timeout.tick(dt) {
                        return Step::frame();
                    }
                    crate::logger::log_warning(&format!(
                        "Boss {:?}: animator layer stuck before '{}' after {:.1}s",
                        ctx.core.id,
                        clips::STUNNED,
                        timeout.elapsed()
                    ));
                }
                *self = StunSequence::Holding;
                Step::seconds(hold)
            }
            StunSequence::Bare => {
                *self = StunSequence::Holding;
                Step::seconds(hold)
            }
            StunSequence::Holding => {
                // Приоритет знания о цели: видна → последняя позиция → ничего
                let next = if ctx.core.target_in_sight() {
                    BossState::Chase
                } else if ctx.core.target.last_known.is_some() {
                    BossState::Search
                } else {
                    BossState::Wander
                };
                ctx.machine.request(next, false);
                Step::Done
            }
        }
    }
}
