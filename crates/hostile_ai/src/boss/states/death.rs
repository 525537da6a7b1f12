//! Death: терминальное состояние.

use crate::agent::AgentEvent;
use crate::boss::{clips, sounds, BossBody};
use crate::fsm::State;

pub struct DeathState;

impl State<BossBody> for DeathState {
    fn enter(&mut self, ctx: &mut BossBody) {
        ctx.machine.seal();
        ctx.flags.pending_stun = false;
        ctx.flags.dash_queued = false;

        ctx.return_position_to_agent(None);
        if let Some(nav) = ctx.core.nav() {
            nav.stop();
            nav.set_enabled(false);
        }
        ctx.core.set_sensor_enabled(false);
        ctx.core.set_audio_loop(None);
        ctx.core.one_shot(sounds::DEATH);

        ctx.core.unlock_animator();
        let blend = ctx.config.blend_time;
        ctx.core.play(clips::DEATH, blend);
        ctx.core.lock_animator();

        let agent = ctx.core.id;
        ctx.core.emit(AgentEvent::Died { agent });
        crate::logger::log(&format!("💀 Boss {:?} died", agent));
    }
}
