//! Attack: цикл ударов под desync protocol.
//!
//! Enter: агент остановлен, позицию пишет Transform, стартуют две задачи:
//! `SyncTask` (каждый кадр) и `AttackLoop`. Exit: lock снят, финальный sync,
//! authority обратно агенту.

use rand::Rng;

use crate::agent::AgentEvent;
use crate::boss::range::should_continue_attack;
use crate::boss::sync::SyncTask;
use crate::boss::{clips, sounds, BossBody, BossState};
use crate::fsm::State;
use crate::sequence::{Sequence, Step};

use super::spawn_owned;

pub struct AttackState;

impl State<BossBody> for AttackState {
    fn enter(&mut self, ctx: &mut BossBody) {
        let Some(token) = ctx.machine.token() else {
            return;
        };
        ctx.hand_position_to_transform(token);

        if let Some(target) = ctx.core.target.best_known() {
            ctx.core.face_towards(target, std::f32::consts::PI);
        }

        spawn_owned(ctx, SyncTask);
        spawn_owned(ctx, AttackLoop::new());
    }

    fn exit(&mut self, ctx: &mut BossBody) {
        ctx.machine.unlock();
        ctx.core.unlock_animator();

        let owner = ctx.machine.token();
        ctx.return_position_to_agent(owner);
        if let Some(nav) = ctx.core.nav() {
            nav.resume();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttackPhase {
    Swing,
    FollowUp,
    Release,
}

struct AttackLoop {
    phase: AttackPhase,
    swings: u32,
}

impl AttackLoop {
    fn new() -> Self {
        Self {
            phase: AttackPhase::Swing,
            swings: 0,
        }
    }

    fn swing(&mut self, ctx: &mut BossBody) -> Step {
        let clip = if std::mem::take(&mut ctx.flags.dash_queued) {
            clips::DASH_SLASH
        } else {
            let index = ctx.core.rng.gen_range(0..clips::SLASHES.len());
            clips::SLASHES[index]
        };

        if let Some(target) = ctx.core.target.position {
            ctx.core.face_towards(target, std::f32::consts::PI);
        }

        self.swings += 1;
        let agent = ctx.core.id;
        ctx.core.emit(AgentEvent::Slash { agent, clip });
        ctx.core.one_shot(sounds::SLASH);

        let blend = ctx.config.blend_time;
        let step = ctx.core.play_and_wait(clip, blend, 0.0);
        ctx.core.lock_animator();
        self.phase = AttackPhase::FollowUp;
        step
    }

    fn evaluate(&mut self, ctx: &mut BossBody) -> Step {
        if std::mem::take(&mut ctx.flags.pending_stun) {
            crate::logger::log(&format!(
                "🔓 Boss {:?}: lock released, applying deferred stun",
                ctx.core.id
            ));
            ctx.machine.request(BossState::Stun, true);
            return Step::Done;
        }

        let in_sight = ctx.core.target_in_sight();
        let distance = ctx.core.distance_to_target().unwrap_or(f32::MAX);
        let config = &ctx.config;
        if should_continue_attack(distance, config.attack_range, config.attack_range_slack, in_sight) {
            self.phase = AttackPhase::Swing;
            return Step::frame();
        }

        if in_sight {
            ctx.machine.request(BossState::Chase, false);
        } else {
            let agent = ctx.core.id;
            let last_known = ctx.core.target.last_known;
            ctx.core.emit(AgentEvent::PlayerLost { agent, last_known });
            crate::logger::log(&format!(
                "👀 Boss {:?}: player lost after {} swings",
                agent, self.swings
            ));
            ctx.machine.request(BossState::Search, false);
        }
        Step::Done
    }
}

impl Sequence<BossBody> for AttackLoop {
    fn label(&self) -> &'static str {
        "boss_attack_loop"
    }

    fn resume(&mut self, ctx: &mut BossBody, _dt: f32) -> Step {
        match self.phase {
            AttackPhase::Swing => self.swing(ctx),
            AttackPhase::FollowUp => {
                ctx.core.unlock_animator();

                let chance = ctx.config.after_slash_chance.clamp(0.0, 1.0) as f64;
                if ctx.core.rng.gen_bool(chance) {
                    // Follow-up нельзя прервать обычным переходом
                    ctx.machine.lock();
                    let blend = ctx.config.blend_time;
                    let step = ctx.core.play_and_wait(clips::AFTER_SLASH, blend, 0.0);
                    ctx.core.lock_animator();
                    self.phase = AttackPhase::Release;
                    return step;
                }
                self.evaluate(ctx)
            }
            AttackPhase::Release => {
                ctx.machine.unlock();
                ctx.core.unlock_animator();
                self.evaluate(ctx)
            }
        }
    }
}
