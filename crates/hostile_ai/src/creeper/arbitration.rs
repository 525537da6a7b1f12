//! Hit-reaction arbitration (Health component Creeper).
//!
//! TakeDamage:
//! 1. resurrecting / мёртв → no-op
//! 2. "incapacitated-at-start": урон будит навсегда
//! 3. health -= amount (clamp), is_dead = health <= 0
//! 4. запись last hit (direction/hard/stun)
//! 5. surge resistance: в бою (Chase или hiss своего удара) + surge + обычный хит → поглощаем до N хитов
//! 6. successor: Die > Chase (hard) > Stun (→ Hiss → Chase) > Hiss→Chase (первый хит) > Chase

use bevy::prelude::*;

use super::{CreeperBody, CreeperState};
use crate::agent::{AgentEvent, HitRecord};

/// Куда идти после hit reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Successor {
    pub state: CreeperState,
    /// Stun → этот state (двухуровневая цепочка Stun → Hiss → Chase).
    pub after_stun: Option<CreeperState>,
    /// Hiss → этот state.
    pub hiss_then: Option<CreeperState>,
    /// Выставить `has_hissed_after_hit`.
    pub marks_hissed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitDecision {
    Ignore,
    /// Урон применён, реакции нет.
    Absorb,
    Die,
    React(Successor),
}

/// Surge "hit resistance": `hits_while_surging` уже включает текущий хит.
pub fn surge_absorbs(
    engaged: bool,
    surging: bool,
    is_normal_hit: bool,
    is_dead: bool,
    hits_while_surging: u32,
    normal_hits_to_interrupt: u32,
) -> bool {
    engaged && surging && is_normal_hit && !is_dead && hits_while_surging <= normal_hits_to_interrupt
}

/// Приоритет: Die > Chase (hard) > Stun > Hiss→Chase (первый обычный хит) > Chase.
pub fn select_successor(is_dead: bool, is_hard: bool, is_stun: bool, has_hissed: bool) -> Successor {
    let plain = |state| Successor {
        state,
        after_stun: None,
        hiss_then: None,
        marks_hissed: false,
    };

    if is_dead {
        return plain(CreeperState::Die);
    }
    if is_hard {
        return plain(CreeperState::Chase);
    }
    if is_stun {
        return Successor {
            state: CreeperState::Stun,
            after_stun: Some(CreeperState::Hiss),
            hiss_then: Some(CreeperState::Chase),
            marks_hissed: false,
        };
    }
    if !has_hissed {
        return Successor {
            state: CreeperState::Hiss,
            after_stun: None,
            hiss_then: Some(CreeperState::Chase),
            marks_hissed: true,
        };
    }
    plain(CreeperState::Chase)
}

impl CreeperBody {
    /// Применяет урон и решает, что делать. Переход выполняет контроллер.
    pub fn classify_hit(&mut self, amount: f32, origin: Vec3, is_hard: bool, is_stun: bool) -> HitDecision {
        let agent = self.core.id;

        if self.flags.is_resurrecting || self.core.health.is_dead() {
            crate::logger::log(&format!(
                "🛡️ Creeper {:?}: hit ignored (resurrecting: {}, dead: {})",
                agent,
                self.flags.is_resurrecting,
                self.core.health.is_dead()
            ));
            return HitDecision::Ignore;
        }

        let woke = self.flags.start_incapacitated;
        if woke {
            self.flags.start_incapacitated = false;
            crate::logger::log(&format!("🧟 Creeper {:?}: woken by damage", agent));
        }

        let remaining = self.core.health.apply_damage(amount);
        let is_dead = self.core.health.is_dead();
        self.core.emit(AgentEvent::Damaged {
            agent,
            amount,
            remaining,
            hard: is_hard,
        });

        self.flags.last_hit = HitRecord::new(self.core.position(), origin, is_hard, is_stun);

        crate::logger::log(&format!(
            "💥 Creeper {:?}: took {:.1} damage (hard: {}, stun: {}) → {:.1} HP",
            agent, amount, is_hard, is_stun, remaining
        ));

        if is_dead {
            return HitDecision::Die;
        }

        // Лежачий (не стартовый) агент не реагирует на хиты
        if self.machine.is_in(CreeperState::Incapacitated) && !woke {
            return HitDecision::Absorb;
        }

        let is_normal_hit = !is_hard && !is_stun;
        let engaged = self.surge_engaged();
        if engaged && self.flags.is_power_surging && is_normal_hit {
            self.flags.surge_normal_hits_count += 1;
        }

        if surge_absorbs(
            engaged,
            self.flags.is_power_surging,
            is_normal_hit,
            is_dead,
            self.flags.surge_normal_hits_count,
            self.flags.normal_hits_to_interrupt,
        ) {
            let absorbed = self.flags.surge_normal_hits_count;
            self.core.emit(AgentEvent::HitAbsorbed { agent, absorbed });
            crate::logger::log(&format!(
                "⚡ Creeper {:?}: surge absorbed hit {}/{}",
                agent, absorbed, self.flags.normal_hits_to_interrupt
            ));
            return HitDecision::Absorb;
        }

        let successor = select_successor(false, is_hard, is_stun, self.flags.has_hissed_after_hit);
        if successor.marks_hissed {
            self.flags.has_hissed_after_hit = true;
        }
        HitDecision::React(successor)
    }
}
