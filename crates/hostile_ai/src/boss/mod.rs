//! Boss (BossAI): отдельное семейство состояний.
//!
//! Attack / Chase / Death / Search / Stun / Wander.
//!
//! Отличия от Creeper:
//! - transform/agent desync protocol: пока играет атака, позицию пишет Transform
//!   (root motion), а sync-задача каждый кадр подтягивает агента (см. `sync.rs`)
//! - hysteresis на границе attack range (см. `range.rs`)
//! - transition lock на время after-slash
//! - stun meter вместо hit reactions

use bevy::prelude::*;

use crate::agent::{
    AgentController, AgentCore, AgentEvent, AgentFlagsSnapshot, AgentId, AgentKind,
    AgentSnapshot, BossFlagsSnapshot, Health, HitOutcome, HitRecord, RestoreError,
};
use crate::collab::Collaborators;
use crate::config::BossConfig;
use crate::fsm::{Host, StateKey, StateMachine, StateTable, StateToken};
use crate::sequence::TaskSet;

pub mod range;
pub mod states;
pub mod sync;


pub use range::{clamp_stopping_distance, should_continue_attack, should_enter_attack};

pub mod clips {
    pub const IDLE: &str = "boss_idle";
    pub const SLASH_1: &str = "boss_slash_1";
    pub const SLASH_2: &str = "boss_slash_2";
    pub const SLASH_3: &str = "boss_slash_3";
    pub const DASH_SLASH: &str = "boss_dash_slash";
    pub const AFTER_SLASH: &str = "boss_after_slash";
    pub const STUN_HIT: &str = "boss_stun_hit";
    pub const STUNNED: &str = "boss_stunned";
    pub const DEATH: &str = "boss_death";

    pub const SLASHES: [&str; 3] = [SLASH_1, SLASH_2, SLASH_3];
}

pub mod sounds {
    pub const COMBAT_LOOP: &str = "boss_combat_loop";
    pub const SLASH: &str = "boss_slash";
    pub const DEATH: &str = "boss_death";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BossState {
    Attack,
    Chase,
    Death,
    Search,
    Stun,
    Wander,
}

impl BossState {
    pub const ALL: [BossState; 6] = [
        BossState::Attack,
        BossState::Chase,
        BossState::Death,
        BossState::Search,
        BossState::Stun,
        BossState::Wander,
    ];
}

impl StateKey for BossState {
    fn name(self) -> &'static str {
        match self {
            BossState::Attack => "Attack",
            BossState::Chase => "Chase",
            BossState::Death => "Death",
            BossState::Search => "Search",
            BossState::Stun => "Stun",
            BossState::Wander => "Wander",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.name() == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BossFlags {
    pub stun_meter: f32,
    /// Special attack: следующий удар: dash-slash.
    pub dash_queued: bool,
    /// Stun пришёл во время lock, применится когда lock снимется.
    pub pending_stun: bool,
    pub last_hit: HitRecord,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossSpawn {
    pub id: AgentId,
    pub position: Vec3,
    pub seed: u64,
}

impl BossSpawn {
    pub fn new(id: AgentId, position: Vec3) -> Self {
        Self {
            id,
            position,
            seed: id.0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

pub struct BossBody {
    pub core: AgentCore,
    pub config: BossConfig,
    pub machine: StateMachine<BossState>,
    pub tasks: TaskSet<BossState, BossBody>,
    pub flags: BossFlags,
    /// Кто сейчас снял position authority с агента (один владелец).
    pub authority_holder: Option<StateToken<BossState>>,
}

impl Host<BossState> for BossBody {
    fn machine(&mut self) -> &mut StateMachine<BossState> {
        &mut self.machine
    }

    fn tasks(&mut self) -> &mut TaskSet<BossState, Self> {
        &mut self.tasks
    }

    fn on_state_changed(&mut self, from: Option<BossState>, to: BossState) {
        crate::logger::log(&format!(
            "👹 Boss {:?}: {} → {}",
            self.core.id,
            from.map(|s| s.name()).unwrap_or("∅"),
            to.name()
        ));
        let agent = self.core.id;
        self.core.emit(AgentEvent::StateChanged {
            agent,
            from: from.map(|s| s.name()),
            to: to.name(),
        });
    }
}

impl BossBody {
    pub fn state(&self) -> Option<BossState> {
        self.machine.current()
    }

    /// Perception hook: цель появилась, пока босс не в бою → Chase.
    fn react_to_sighting(&mut self) {
        let idle = self.machine.is_in(BossState::Search) || self.machine.is_in(BossState::Wander);
        if idle && self.core.target_in_sight() {
            self.machine.request(BossState::Chase, false);
        }
    }

    fn suspend(&mut self) {
        self.return_position_to_agent(None);
        self.core.stop_moving();
        self.core.unlock_animator();
        self.machine.unlock();
        self.core.set_audio_loop(None);
    }
}

pub struct BossAi {
    body: BossBody,
    states: StateTable<BossState, BossBody>,
}

impl BossAi {
    pub fn new(spawn: BossSpawn, config: BossConfig, collab: Collaborators) -> Self {
        let core = AgentCore::new(
            spawn.id,
            AgentKind::Boss,
            config.max_health,
            spawn.position,
            collab,
            spawn.seed,
        );

        let mut ai = Self {
            body: BossBody {
                core,
                config,
                machine: StateMachine::new(),
                tasks: TaskSet::new(),
                flags: BossFlags::default(),
                authority_holder: None,
            },
            states: states::build_table(),
        };
        ai.states.change_state(&mut ai.body, BossState::Wander, true);

        crate::logger::log(&format!(
            "✅ Boss {:?} spawned at {:?}",
            spawn.id, spawn.position
        ));
        ai
    }

    pub fn body(&self) -> &BossBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut BossBody {
        &mut self.body
    }

    pub fn flags(&self) -> &BossFlags {
        &self.body.flags
    }

    pub fn state(&self) -> Option<BossState> {
        self.body.machine.current()
    }

    pub fn machine(&self) -> &StateMachine<BossState> {
        &self.body.machine
    }

    pub fn task_labels(&self) -> Vec<&'static str> {
        self.body.tasks.labels()
    }

    pub fn change_state(&mut self, next: BossState, force: bool) -> bool {
        self.states.change_state(&mut self.body, next, force)
    }

    fn request_stun(&mut self) -> HitOutcome {
        if self.states.change_state(&mut self.body, BossState::Stun, false) {
            return HitOutcome::Reacted {
                successor: BossState::Stun.name(),
            };
        }
        self.body.flags.pending_stun = true;
        crate::logger::log(&format!(
            "🔒 Boss {:?}: stun deferred, transitions locked",
            self.body.core.id
        ));
        HitOutcome::Blocked
    }
}

impl AgentController for BossAi {
    fn id(&self) -> AgentId {
        self.body.core.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Boss
    }

    fn state_name(&self) -> Option<&'static str> {
        self.state().map(|s| s.name())
    }

    fn position(&self) -> Vec3 {
        self.body.core.position()
    }

    fn health(&self) -> Health {
        self.body.core.health
    }

    fn tick(&mut self, dt: f32) {
        if !self.body.core.enabled {
            return;
        }

        let body = &mut self.body;
        body.core.advance_collaborators(dt);
        body.core.sync_transform();
        body.core.perceive(dt);
        body.react_to_sighting();

        self.states.update(&mut self.body, dt);
        self.states.run_tasks(&mut self.body, dt);
    }

    fn is_enabled(&self) -> bool {
        self.body.core.enabled
    }

    fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.body.core.enabled == enabled {
            return false;
        }

        if enabled {
            self.body.core.enabled = true;
            self.states.reenter(&mut self.body);
            crate::logger::log(&format!("▶️ Boss {:?} enabled", self.body.core.id));
        } else {
            self.states.cancel_all_tasks(&mut self.body);
            self.body.suspend();
            self.body.core.enabled = false;
            crate::logger::log(&format!("⏸️ Boss {:?} disabled", self.body.core.id));
        }
        true
    }

    fn take_damage(&mut self, amount: f32, origin: Vec3, is_hard: bool, is_stun: bool) -> HitOutcome {
        let body = &mut self.body;
        if !body.core.enabled || body.core.health.is_dead() {
            return HitOutcome::Ignored;
        }

        let agent = body.core.id;
        let remaining = body.core.health.apply_damage(amount);
        body.core.emit(AgentEvent::Damaged {
            agent,
            amount,
            remaining,
            hard: is_hard,
        });
        body.flags.last_hit = HitRecord::new(body.core.position(), origin, is_hard, is_stun);

        if body.core.health.is_dead() {
            self.states.change_state(&mut self.body, BossState::Death, true);
            return HitOutcome::Died;
        }

        let config = &body.config;
        let mut gain = amount.max(0.0) * config.stun_meter_per_damage;
        if is_hard {
            gain += config.hard_hit_stun_bonus;
        }
        body.flags.stun_meter = (body.flags.stun_meter + gain).min(config.stun_meter_max);

        crate::logger::log(&format!(
            "💥 Boss {:?}: took {:.1} damage → {:.1} HP, stun meter {:.0}/{:.0}",
            agent, amount, remaining, body.flags.stun_meter, config.stun_meter_max
        ));

        if is_stun || body.flags.stun_meter >= config.stun_meter_max {
            return self.request_stun();
        }
        HitOutcome::Absorbed
    }

    fn force_into_stun(&mut self) -> bool {
        if self.body.core.health.is_dead() || self.body.machine.is_sealed() {
            return false;
        }
        self.states.change_state(&mut self.body, BossState::Stun, true)
    }

    fn warp_to(&mut self, destination: Vec3) -> bool {
        self.body.core.warp(destination)
    }

    fn snapshot(&self) -> AgentSnapshot {
        let body = &self.body;
        AgentSnapshot {
            id: body.core.id,
            kind: AgentKind::Boss,
            state: self.state_name().unwrap_or_default().to_string(),
            health: body.core.health.current(),
            max_health: body.core.health.max(),
            position: body.core.position().to_array(),
            enabled: body.core.enabled,
            flags: AgentFlagsSnapshot::Boss(BossFlagsSnapshot {
                stun_meter: body.flags.stun_meter,
                dash_queued: body.flags.dash_queued,
                pending_stun: body.flags.pending_stun,
                last_known_target: body.core.target.last_known.map(|p| p.to_array()),
            }),
        }
    }

    fn restore(&mut self, snapshot: &AgentSnapshot) -> Result<(), RestoreError> {
        let (AgentKind::Boss, AgentFlagsSnapshot::Boss(saved)) = (snapshot.kind, &snapshot.flags)
        else {
            return Err(RestoreError::KindMismatch {
                expected: AgentKind::Boss,
                found: snapshot.kind,
            });
        };
        if self.body.machine.is_sealed() {
            return Err(RestoreError::Dead(self.body.core.id));
        }

        let state = BossState::from_name(&snapshot.state).ok_or_else(|| RestoreError::UnknownState {
            kind: AgentKind::Boss,
            state: snapshot.state.clone(),
        })?;
        if state == BossState::Death && snapshot.health > 0.0 {
            return Err(RestoreError::TerminalWhileAlive {
                state: snapshot.state.clone(),
                health: snapshot.health,
            });
        }

        let body = &mut self.body;
        body.core.health.set(snapshot.health, snapshot.max_health);
        body.flags.stun_meter = saved.stun_meter.clamp(0.0, body.config.stun_meter_max);
        body.flags.dash_queued = saved.dash_queued;
        body.flags.pending_stun = saved.pending_stun;

        body.core.target.forget();
        body.core.target.last_known = saved.last_known_target.map(Vec3::from_array);

        body.return_position_to_agent(None);
        body.core.warp(Vec3::from_array(snapshot.position));

        let target = if body.core.health.is_dead() {
            BossState::Death
        } else {
            state
        };
        body.core.enabled = true;
        self.states.change_state(&mut self.body, target, true);

        if !snapshot.enabled {
            self.set_enabled(false);
        }

        crate::logger::log(&format!(
            "💾 Boss {:?} restored into {} (health {:.1})",
            snapshot.id,
            target.name(),
            snapshot.health
        ));
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<AgentEvent> {
        self.body.core.drain_events()
    }
}
