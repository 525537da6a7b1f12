//! Creeper (MonsterAI): многосостояний монстр.
//!
//! Граф состояний:
//! Idle/Wander → Chase → (strike) Hiss → Chase
//! любой хит → Hit → Hiss/Chase/Stun/Incapacitated
//! Stun → Hiss → Chase
//! Incapacitated → (resurrection) Hiss → Chase
//! health == 0 → Die (терминальное)
//!
//! Архитектура:
//! - `CreeperBody`: флаги + коллабораторы + задачи (Host для состояний)
//! - `MonsterAi`: контроллер: body + StateTable, реализует `AgentController`
//! - hit arbitration: `arbitration.rs`

use bevy::prelude::*;
use rand::Rng;

use crate::agent::{
    AgentController, AgentCore, AgentEvent, AgentFlagsSnapshot, AgentId, AgentKind,
    AgentSnapshot, CreeperFlagsSnapshot, Health, HitOutcome, HitRecord, RestoreError,
};
use crate::collab::Collaborators;
use crate::config::CreeperConfig;
use crate::fsm::{Host, StateKey, StateMachine, StateTable};
use crate::sequence::TaskSet;

pub mod arbitration;
pub mod states;


pub use arbitration::{select_successor, surge_absorbs, HitDecision, Successor};

/// Имена клипов Creeper.
pub mod clips {
    pub const IDLE: &str = "creeper_idle";
    pub const GET_DOWN: &str = "creeper_get_down";
    pub const EAT: &str = "creeper_eat";
    pub const HISS: &str = "creeper_hiss";
    pub const ATTACK: &str = "creeper_attack";
    pub const HIT_FRONT: &str = "creeper_hit_front";
    pub const HIT_BACK: &str = "creeper_hit_back";
    pub const HARD_HIT_FRONT: &str = "creeper_hard_hit_front";
    pub const HARD_HIT_BACK: &str = "creeper_hard_hit_back";
    pub const COLLAPSE_FRONT: &str = "creeper_collapse_front";
    pub const COLLAPSE_BACK: &str = "creeper_collapse_back";
    pub const GET_UP_FRONT: &str = "creeper_get_up_front";
    pub const GET_UP_BACK: &str = "creeper_get_up_back";
    pub const STUN_HIT: &str = "creeper_stun_hit";
    pub const STUNNED: &str = "creeper_stunned";
    pub const DOWN_FRONT: &str = "creeper_down_front";
    pub const DOWN_BACK: &str = "creeper_down_back";
    pub const DIE_FRONT: &str = "creeper_die_front";
    pub const DIE_BACK: &str = "creeper_die_back";
}

/// Audio ключи (непрозрачны для AI, интерпретирует AudioEmitter).
pub mod sounds {
    pub const CHASE_LOOP: &str = "creeper_chase_loop";
    pub const SURGE_LOOP: &str = "creeper_surge_loop";
    pub const EAT_LOOP: &str = "creeper_eat_loop";
    pub const HISS: &str = "creeper_hiss";
    pub const DEATH: &str = "creeper_death";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreeperState {
    Idle,
    Wander,
    Chase,
    Hiss,
    Hit,
    Stun,
    Incapacitated,
    Die,
}

impl CreeperState {
    pub const ALL: [CreeperState; 8] = [
        CreeperState::Idle,
        CreeperState::Wander,
        CreeperState::Chase,
        CreeperState::Hiss,
        CreeperState::Hit,
        CreeperState::Stun,
        CreeperState::Incapacitated,
        CreeperState::Die,
    ];
}

impl StateKey for CreeperState {
    fn name(self) -> &'static str {
        match self {
            CreeperState::Idle => "Idle",
            CreeperState::Wander => "Wander",
            CreeperState::Chase => "Chase",
            CreeperState::Hiss => "Hiss",
            CreeperState::Hit => "Hit",
            CreeperState::Stun => "Stun",
            CreeperState::Incapacitated => "Incapacitated",
            CreeperState::Die => "Die",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.name() == name)
    }
}

/// Классификационные флаги контроллера.
#[derive(Debug, Clone, PartialEq)]
pub struct CreeperFlags {
    pub is_processing_hit: bool,
    /// One-slot mailbox: более поздний запрос перезаписывает ранний.
    pub queued_state_after_hit: Option<CreeperState>,

    pub is_incapacitated: bool,
    pub is_resurrecting: bool,
    /// Спавн лёжа; первый урон будит навсегда.
    pub start_incapacitated: bool,
    pub incapacitated_detection_count: u32,
    pub resurrection_chance: f32,

    pub is_power_surging: bool,
    pub surge_normal_hits_count: u32,
    pub normal_hits_to_interrupt: u32,

    pub has_hissed_after_hit: bool,
    pub last_hit: HitRecord,
}

impl CreeperFlags {
    fn from_config(config: &CreeperConfig) -> Self {
        Self {
            is_processing_hit: false,
            queued_state_after_hit: None,
            is_incapacitated: false,
            is_resurrecting: false,
            start_incapacitated: config.start_incapacitated,
            incapacitated_detection_count: 0,
            resurrection_chance: config.resurrection_chance,
            is_power_surging: false,
            surge_normal_hits_count: 0,
            normal_hits_to_interrupt: config.normal_hits_to_interrupt,
            has_hissed_after_hit: false,
            last_hit: HitRecord::default(),
        }
    }
}

/// Spawn-time геометрия.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreeperSpawn {
    pub id: AgentId,
    pub position: Vec3,
    /// Якорь Wander (по умолчанию: точка спавна).
    pub home: Option<Vec3>,
    /// Idle идёт сюда есть.
    pub eating_spot: Option<Vec3>,
    pub seed: u64,
}

impl CreeperSpawn {
    pub fn new(id: AgentId, position: Vec3) -> Self {
        Self {
            id,
            position,
            home: None,
            eating_spot: None,
            seed: id.0,
        }
    }

    pub fn with_home(mut self, home: Vec3) -> Self {
        self.home = Some(home);
        self
    }

    pub fn with_eating_spot(mut self, spot: Vec3) -> Self {
        self.eating_spot = Some(spot);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Тело Creeper: всё, что видят состояния и sequences.
pub struct CreeperBody {
    pub core: AgentCore,
    pub config: CreeperConfig,
    pub machine: StateMachine<CreeperState>,
    pub tasks: TaskSet<CreeperState, CreeperBody>,
    pub flags: CreeperFlags,

    pub home: Vec3,
    pub eating_spot: Option<Vec3>,
    /// Wander вокруг этой точки (последняя известная позиция цели).
    pub investigate_point: Option<Vec3>,

    /// Единственный указатель "куда после Hiss" (не стек).
    pub next_after_hiss: CreeperState,
    pub hiss_clip: &'static str,
    pub after_stun: Option<CreeperState>,

    /// Хит, который должен отыграть Hit.enter.
    pub pending_reaction: Option<HitRecord>,
    pub surge_time_left: f32,
    /// Chase → Hiss(attack) → Chase: удар не выводит из боя, surge продолжается.
    pub strike_in_progress: bool,
    /// Detection radius до падения (восстанавливается при подъёме).
    pub normal_detection_radius: Option<f32>,
}

impl Host<CreeperState> for CreeperBody {
    fn machine(&mut self) -> &mut StateMachine<CreeperState> {
        &mut self.machine
    }

    fn tasks(&mut self) -> &mut TaskSet<CreeperState, Self> {
        &mut self.tasks
    }

    fn on_state_changed(&mut self, from: Option<CreeperState>, to: CreeperState) {
        crate::logger::log(&format!(
            "🧟 Creeper {:?}: {} → {}",
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

        // Surge живёт, пока агент в бою: Chase или hiss собственного удара
        let engaged = to == CreeperState::Chase || (to == CreeperState::Hiss && self.strike_in_progress);
        if !engaged {
            self.strike_in_progress = false;
            self.end_surge();
        }
    }
}

impl CreeperBody {
    pub fn state(&self) -> Option<CreeperState> {
        self.machine.current()
    }

    /// Обычный запрос перехода.
    ///
    /// Пока идёт hit reaction, запрос кладётся в mailbox (перезаписывая прежний).
    pub fn request_state(&mut self, next: CreeperState) -> bool {
        if self.flags.is_processing_hit {
            if let Some(previous) = self.flags.queued_state_after_hit {
                crate::logger::log(&format!(
                    "🧟 Creeper {:?}: mailbox {} overwritten by {}",
                    self.core.id,
                    previous.name(),
                    next.name()
                ));
            }
            self.flags.queued_state_after_hit = Some(next);
            return true;
        }
        self.machine.request(next, false)
    }

    /// Hiss с указанным клипом, затем `next`.
    pub fn request_hiss(&mut self, clip: &'static str, next: CreeperState) -> bool {
        self.hiss_clip = clip;
        self.next_after_hiss = next;
        self.request_state(CreeperState::Hiss)
    }

    pub fn start_surge(&mut self) {
        self.flags.is_power_surging = true;
        self.flags.surge_normal_hits_count = 0;
        self.surge_time_left = self.config.surge_duration;

        let speed = self.config.chase_speed * self.config.surge_speed_multiplier;
        if let Some(nav) = self.core.nav() {
            nav.set_speed(speed);
        }
        self.core.set_audio_loop(Some(sounds::SURGE_LOOP));

        let agent = self.core.id;
        self.core.emit(AgentEvent::PowerSurge { agent, active: true });
        crate::logger::log(&format!("⚡ Creeper {:?}: power surge!", agent));
    }

    /// Surge в бою: в Chase или в hiss удара из Chase.
    pub fn surge_engaged(&self) -> bool {
        self.machine.is_in(CreeperState::Chase)
            || (self.machine.is_in(CreeperState::Hiss) && self.strike_in_progress)
    }

    /// Отсчёт `surge_duration`, в том числе во время удара.
    fn tick_surge(&mut self, dt: f32) {
        if !self.flags.is_power_surging {
            return;
        }
        self.surge_time_left -= dt;
        if self.surge_time_left <= 0.0 {
            crate::logger::log(&format!("⚡ Creeper {:?}: surge faded", self.core.id));
            self.end_surge();
        }
    }

    /// Темп и звук Chase возвращаются только если агент всё ещё в Chase:
    /// новое состояние уже выставило свои.
    pub fn end_surge(&mut self) {
        if !self.flags.is_power_surging {
            return;
        }
        self.flags.is_power_surging = false;
        self.flags.surge_normal_hits_count = 0;
        self.surge_time_left = 0.0;

        if self.machine.is_in(CreeperState::Chase) {
            let speed = self.config.chase_speed;
            if let Some(nav) = self.core.nav() {
                nav.set_speed(speed);
            }
            self.core.set_audio_loop(Some(sounds::CHASE_LOOP));
        }

        let agent = self.core.id;
        self.core.emit(AgentEvent::PowerSurge { agent, active: false });
    }

    /// Уронить detection radius до "can-be-revived".
    pub fn shrink_detection(&mut self) {
        if self.normal_detection_radius.is_none() {
            self.normal_detection_radius = self.core.detection_radius();
        }
        let radius = self.config.revive_detection_radius;
        self.core.set_detection_radius(radius);
    }

    pub fn restore_detection(&mut self) {
        if let Some(radius) = self.normal_detection_radius.take() {
            self.core.set_detection_radius(radius);
        }
    }

    /// Пока лежит: каждое новое обнаружение цели: бросок на воскрешение.
    fn watch_for_resurrection(&mut self) {
        if !self.machine.is_in(CreeperState::Incapacitated)
            || self.flags.is_resurrecting
            || !self.core.target.sighted_this_frame()
        {
            return;
        }

        self.flags.incapacitated_detection_count += 1;
        let chance = self.flags.resurrection_chance.clamp(0.0, 1.0);
        let roll: f32 = self.core.rng.gen();

        if roll < chance {
            crate::logger::log(&format!(
                "🧟 Creeper {:?}: resurrecting (detection #{}, chance {:.2})",
                self.core.id, self.flags.incapacitated_detection_count, chance
            ));
            states::incapacitated::begin_resurrection(self);
        } else {
            self.flags.resurrection_chance =
                (chance + self.config.resurrection_chance_step).min(1.0);
            crate::logger::log(&format!(
                "🧟 Creeper {:?}: stays down (detection #{}, chance now {:.2})",
                self.core.id, self.flags.incapacitated_detection_count, self.flags.resurrection_chance
            ));
        }
    }

    /// Остановка всего (disable): задачи отменены снаружи, здесь: коллабораторы.
    fn suspend(&mut self) {
        self.core.stop_moving();
        self.core.unlock_animator();
        self.machine.unlock();
        self.end_surge();
        self.core.set_audio_loop(None);
    }
}

/// Creeper контроллер (MonsterAI).
pub struct MonsterAi {
    body: CreeperBody,
    states: StateTable<CreeperState, CreeperBody>,
}

impl MonsterAi {
    pub fn new(spawn: CreeperSpawn, config: CreeperConfig, collab: Collaborators) -> Self {
        let core = AgentCore::new(
            spawn.id,
            AgentKind::Creeper,
            config.max_health,
            spawn.position,
            collab,
            spawn.seed,
        );

        let body = CreeperBody {
            core,
            flags: CreeperFlags::from_config(&config),
            machine: StateMachine::new(),
            tasks: TaskSet::new(),
            home: spawn.home.unwrap_or(spawn.position),
            eating_spot: spawn.eating_spot,
            investigate_point: None,
            next_after_hiss: CreeperState::Chase,
            hiss_clip: clips::HISS,
            after_stun: None,
            pending_reaction: None,
            surge_time_left: 0.0,
            strike_in_progress: false,
            normal_detection_radius: None,
            config,
        };

        let mut ai = Self {
            body,
            states: states::build_table(),
        };

        let initial = if ai.body.flags.start_incapacitated {
            CreeperState::Incapacitated
        } else if ai.body.eating_spot.is_some() {
            CreeperState::Idle
        } else {
            CreeperState::Wander
        };
        ai.states.change_state(&mut ai.body, initial, true);

        crate::logger::log(&format!(
            "✅ Creeper {:?} spawned at {:?} in {}",
            spawn.id,
            spawn.position,
            initial.name()
        ));
        ai
    }

    pub fn body(&self) -> &CreeperBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut CreeperBody {
        &mut self.body
    }

    pub fn flags(&self) -> &CreeperFlags {
        &self.body.flags
    }

    pub fn state(&self) -> Option<CreeperState> {
        self.body.machine.current()
    }

    pub fn machine(&self) -> &StateMachine<CreeperState> {
        &self.body.machine
    }

    pub fn task_labels(&self) -> Vec<&'static str> {
        self.body.tasks.labels()
    }

    /// ChangeState на контроллере (тот же путь, что у внутренних переходов).
    pub fn change_state(&mut self, next: CreeperState, force: bool) -> bool {
        self.states.change_state(&mut self.body, next, force)
    }

    /// Hit arbitration + применение решения.
    fn apply_hit(&mut self, amount: f32, origin: Vec3, is_hard: bool, is_stun: bool) -> HitOutcome {
        match self.body.classify_hit(amount, origin, is_hard, is_stun) {
            HitDecision::Ignore => HitOutcome::Ignored,
            HitDecision::Absorb => HitOutcome::Absorbed,
            HitDecision::Die => {
                self.states.change_state(&mut self.body, CreeperState::Die, true);
                HitOutcome::Died
            }
            HitDecision::React(successor) => {
                self.body.flags.queued_state_after_hit = Some(successor.state);
                if let Some(next) = successor.hiss_then {
                    self.body.next_after_hiss = next;
                    self.body.hiss_clip = clips::HISS;
                }
                if successor.state == CreeperState::Stun {
                    self.body.after_stun = successor.after_stun;
                }
                self.body.pending_reaction = Some(self.body.flags.last_hit);

                if self.states.change_state(&mut self.body, CreeperState::Hit, true) {
                    HitOutcome::Reacted {
                        successor: successor.state.name(),
                    }
                } else {
                    HitOutcome::Blocked
                }
            }
        }
    }
}

impl AgentController for MonsterAi {
    fn id(&self) -> AgentId {
        self.body.core.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Creeper
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
        body.watch_for_resurrection();
        body.tick_surge(dt);

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
            crate::logger::log(&format!("▶️ Creeper {:?} enabled", self.body.core.id));
        } else {
            self.states.cancel_all_tasks(&mut self.body);
            self.body.suspend();
            self.body.core.enabled = false;
            crate::logger::log(&format!("⏸️ Creeper {:?} disabled", self.body.core.id));
        }
        true
    }

    fn take_damage(&mut self, amount: f32, origin: Vec3, is_hard: bool, is_stun: bool) -> HitOutcome {
        if !self.body.core.enabled {
            return HitOutcome::Ignored;
        }
        self.apply_hit(amount, origin, is_hard, is_stun)
    }

    fn force_into_stun(&mut self) -> bool {
        if self.body.core.health.is_dead() || self.body.machine.is_sealed() {
            return false;
        }
        self.body.flags.is_processing_hit = false;
        self.body.flags.queued_state_after_hit = None;
        self.body.after_stun = None;
        self.states.change_state(&mut self.body, CreeperState::Stun, true)
    }

    fn warp_to(&mut self, destination: Vec3) -> bool {
        self.body.core.warp(destination)
    }

    fn snapshot(&self) -> AgentSnapshot {
        let body = &self.body;
        let flags = &body.flags;
        AgentSnapshot {
            id: body.core.id,
            kind: AgentKind::Creeper,
            state: self.state_name().unwrap_or_default().to_string(),
            health: body.core.health.current(),
            max_health: body.core.health.max(),
            position: body.core.position().to_array(),
            enabled: body.core.enabled,
            flags: AgentFlagsSnapshot::Creeper(CreeperFlagsSnapshot {
                is_processing_hit: flags.is_processing_hit,
                queued_state_after_hit: flags
                    .queued_state_after_hit
                    .map(|s| s.name().to_string()),
                is_incapacitated: flags.is_incapacitated,
                is_resurrecting: flags.is_resurrecting,
                start_incapacitated: flags.start_incapacitated,
                incapacitated_detection_count: flags.incapacitated_detection_count,
                resurrection_chance: flags.resurrection_chance,
                is_power_surging: flags.is_power_surging,
                surge_normal_hits_count: flags.surge_normal_hits_count,
                has_hissed_after_hit: flags.has_hissed_after_hit,
                last_hit_direction: flags.last_hit.direction.to_array(),
                last_hit_hard: flags.last_hit.hard,
                last_hit_stun: flags.last_hit.stun,
            }),
        }
    }

    fn restore(&mut self, snapshot: &AgentSnapshot) -> Result<(), RestoreError> {
        let AgentFlagsSnapshot::Creeper(saved) = &snapshot.flags else {
            return Err(RestoreError::KindMismatch {
                expected: AgentKind::Creeper,
                found: snapshot.kind,
            });
        };
        if snapshot.kind != AgentKind::Creeper {
            return Err(RestoreError::KindMismatch {
                expected: AgentKind::Creeper,
                found: snapshot.kind,
            });
        }
        if self.body.machine.is_sealed() {
            return Err(RestoreError::Dead(self.body.core.id));
        }

        let state = CreeperState::from_name(&snapshot.state).ok_or_else(|| {
            RestoreError::UnknownState {
                kind: AgentKind::Creeper,
                state: snapshot.state.clone(),
            }
        })?;
        if state == CreeperState::Die && snapshot.health > 0.0 {
            return Err(RestoreError::TerminalWhileAlive {
                state: snapshot.state.clone(),
                health: snapshot.health,
            });
        }

        let queued = match &saved.queued_state_after_hit {
            Some(name) => Some(CreeperState::from_name(name).ok_or_else(|| {
                RestoreError::UnknownState {
                    kind: AgentKind::Creeper,
                    state: name.clone(),
                }
            })?),
            None => None,
        };

        let body = &mut self.body;
        body.core.health.set(snapshot.health, snapshot.max_health);

        let flags = &mut body.flags;
        // Hit/Incapacitated выставляют свои флаги сами при входе
        flags.is_processing_hit = false;
        flags.queued_state_after_hit = queued;
        flags.is_incapacitated = false;
        flags.is_resurrecting = false;
        flags.start_incapacitated = saved.start_incapacitated;
        flags.incapacitated_detection_count = saved.incapacitated_detection_count;
        flags.resurrection_chance = saved.resurrection_chance;
        // Surge заново роллится при входе в Chase
        flags.is_power_surging = false;
        flags.surge_normal_hits_count = 0;
        body.surge_time_left = 0.0;
        body.strike_in_progress = false;
        flags.has_hissed_after_hit = saved.has_hissed_after_hit;
        flags.last_hit = HitRecord {
            direction: Vec3::from_array(saved.last_hit_direction),
            hard: saved.last_hit_hard,
            stun: saved.last_hit_stun,
        };

        body.core.warp(Vec3::from_array(snapshot.position));
        body.core.target.forget();

        let target = if body.core.health.is_dead() {
            CreeperState::Die
        } else {
            state
        };
        if target == CreeperState::Hit {
            body.pending_reaction = Some(body.flags.last_hit);
        }

        body.core.enabled = true;
        self.states.change_state(&mut self.body, target, true);

        if !snapshot.enabled {
            self.set_enabled(false);
        }

        crate::logger::log(&format!(
            "💾 Creeper {:?} restored into {} (health {:.1})",
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
