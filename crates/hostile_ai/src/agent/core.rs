//! AgentCore: общая часть тела агента.
//!
//! Все обращения к коллабораторам идут через helpers этого типа:
//! отсутствующий коллаборатор = no-op на месте вызова.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::{AgentEvent, AgentId, AgentKind, Health};
use crate::collab::{Collaborators, NavigationAgent};
use crate::sequence::Step;
use crate::shared::{flat_direction, flat_distance};

/// Память о цели (игроке), обновляется `perceive` раз в кадр.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TargetMemory {
    pub in_sight: bool,
    pub was_in_sight: bool,
    /// Позиция цели на этом кадре (только если видна).
    pub position: Option<Vec3>,
    pub last_known: Option<Vec3>,
    /// Секунд без line of sight.
    pub unseen_for: f32,
}

impl TargetMemory {
    /// Rising edge: цель появилась на этом кадре.
    pub fn sighted_this_frame(&self) -> bool {
        self.in_sight && !self.was_in_sight
    }

    /// Лучшее знание о позиции цели.
    pub fn best_known(&self) -> Option<Vec3> {
        self.position.or(self.last_known)
    }

    pub fn forget(&mut self) {
        *self = TargetMemory::default();
    }
}

pub struct AgentCore {
    pub id: AgentId,
    pub kind: AgentKind,
    pub enabled: bool,
    pub health: Health,
    /// Визуальный Transform (принадлежит агенту).
    pub transform: Transform,
    pub collab: Collaborators,
    pub rng: ChaCha8Rng,
    pub target: TargetMemory,
    events: Vec<AgentEvent>,
}

impl AgentCore {
    pub fn new(
        id: AgentId,
        kind: AgentKind,
        max_health: f32,
        position: Vec3,
        collab: Collaborators,
        seed: u64,
    ) -> Self {
        Self {
            id,
            kind,
            enabled: true,
            health: Health::new(max_health),
            transform: Transform::from_translation(position),
            collab,
            rng: ChaCha8Rng::seed_from_u64(seed),
            target: TargetMemory::default(),
            events: Vec::new(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    pub fn forward(&self) -> Vec3 {
        self.transform.forward().as_vec3()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn emit(&mut self, event: AgentEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<AgentEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Perception
    // ------------------------------------------------------------------

    pub fn perceive(&mut self, dt: f32) {
        let position = self.position();
        let sensed = match self.collab.sensor.as_deref_mut() {
            Some(sensor) => {
                sensor.track_observer(position);
                sensor.target_in_sight().then(|| sensor.target_position()).flatten()
            }
            None => None,
        };

        let memory = &mut self.target;
        memory.was_in_sight = memory.in_sight;
        memory.in_sight = sensed.is_some();
        memory.position = sensed;

        if let Some(seen) = sensed {
            memory.last_known = Some(seen);
            memory.unseen_for = 0.0;
        } else {
            memory.unseen_for += dt;
        }
    }

    pub fn target_in_sight(&self) -> bool {
        self.target.in_sight
    }

    /// XZ дистанция до видимой цели.
    pub fn distance_to_target(&self) -> Option<f32> {
        self.target
            .position
            .map(|target| flat_distance(self.position(), target))
    }

    pub fn detection_radius(&self) -> Option<f32> {
        self.collab.sensor.as_deref().map(|s| s.detection_radius())
    }

    pub fn set_detection_radius(&mut self, radius: f32) {
        if let Some(sensor) = self.collab.sensor.as_deref_mut() {
            sensor.set_detection_radius(radius);
        }
    }

    pub fn set_sensor_enabled(&mut self, enabled: bool) {
        if let Some(sensor) = self.collab.sensor.as_deref_mut() {
            sensor.set_enabled(enabled);
        }
    }

    // ------------------------------------------------------------------
    // Animation
    // ------------------------------------------------------------------

    pub fn play(&mut self, clip: &str, blend_time: f32) {
        if let Some(animator) = self.collab.animator.as_deref_mut() {
            animator.play(clip, blend_time);
        }
    }

    pub fn clip_duration(&self, clip: &str) -> Option<f32> {
        self.collab
            .animator
            .as_deref()
            .and_then(|animator| animator.clip_duration(clip))
    }

    pub fn has_animator(&self) -> bool {
        self.collab.animator.is_some()
    }

    /// "Play and wait": старт клипа + ожидание его длительности.
    ///
    /// Без animator: ожидание в один кадр. Неизвестный клип ждёт `fallback`.
    pub fn play_and_wait(&mut self, clip: &str, blend_time: f32, fallback: f32) -> Step {
        match self.collab.animator.as_deref_mut() {
            Some(animator) => {
                animator.play(clip, blend_time);
                let duration = animator.clip_duration(clip).unwrap_or(fallback);
                Step::seconds(duration)
            }
            None => Step::frame(),
        }
    }

    pub fn lock_animator(&mut self) {
        if let Some(animator) = self.collab.animator.as_deref_mut() {
            animator.force_lock();
        }
    }

    pub fn unlock_animator(&mut self) {
        if let Some(animator) = self.collab.animator.as_deref_mut() {
            animator.force_unlock();
        }
    }

    // ------------------------------------------------------------------
    // Audio
    // ------------------------------------------------------------------

    pub fn set_audio_loop(&mut self, key: Option<&str>) {
        if let Some(audio) = self.collab.audio.as_deref_mut() {
            audio.set_loop(key);
        }
    }

    pub fn one_shot(&mut self, key: &str) {
        if let Some(audio) = self.collab.audio.as_deref_mut() {
            audio.play_one_shot(key);
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn nav(&mut self) -> Option<&mut (dyn NavigationAgent + 'static)> {
        self.collab.nav.as_deref_mut()
    }

    pub fn nav_ref(&self) -> Option<&(dyn NavigationAgent + 'static)> {
        self.collab.nav.as_deref()
    }

    pub fn has_nav(&self) -> bool {
        self.collab.nav.is_some()
    }

    /// Move order: скорость + destination + resume.
    pub fn move_to(&mut self, destination: Vec3, speed: f32) -> bool {
        let Some(nav) = self.nav() else {
            return false;
        };
        nav.set_speed(speed);
        nav.resume();
        nav.set_destination(destination)
    }

    pub fn stop_moving(&mut self) {
        if let Some(nav) = self.nav() {
            nav.stop();
        }
    }

    /// Прибыл к destination (или навигации нет: считаем что прибыл).
    pub fn arrived(&self) -> bool {
        match self.nav_ref() {
            Some(nav) => {
                nav.destination().is_none() || nav.remaining_distance() <= nav.stopping_distance() + 0.05
            }
            None => true,
        }
    }

    /// Hard teleport агента + визуального Transform.
    pub fn warp(&mut self, destination: Vec3) -> bool {
        if let Some(nav) = self.nav() {
            if !nav.warp(destination) {
                crate::logger::log_warning(&format!(
                    "{:?} {:?}: warp to {:?} rejected by navigation",
                    self.kind, self.id, destination
                ));
                return false;
            }
        }
        self.transform.translation = destination;
        true
    }

    /// Поворот к точке не быстрее `max_step` радиан.
    pub fn face_towards(&mut self, point: Vec3, max_step: f32) {
        let Some(desired) = flat_direction(point - self.position()) else {
            return;
        };
        let Some(forward) = flat_direction(self.forward()) else {
            return;
        };

        let angle = forward.angle_between(desired);
        if angle <= max_step {
            self.transform.look_to(desired, Vec3::Y);
        } else {
            let sign = forward.cross(desired).y.signum();
            self.transform.rotate_y(sign * max_step);
        }
    }

    // ------------------------------------------------------------------
    // Per-frame
    // ------------------------------------------------------------------

    /// Engine step коллабораторов (headless движки двигаются здесь).
    pub fn advance_collaborators(&mut self, dt: f32) {
        if let Some(nav) = self.collab.nav.as_deref_mut() {
            nav.advance(dt);
        }
        if let Some(animator) = self.collab.animator.as_deref_mut() {
            animator.advance(dt);
        }
        if let Some(layer) = self.collab.layer.as_deref_mut() {
            layer.advance(dt);
        }
    }

    /// Кто владеет позицией, тот и пишет Transform.
    ///
    /// Authority у агента → Transform следует за агентом.
    /// Authority снята → Transform двигает root motion, агент догоняет через sync.
    pub fn sync_transform(&mut self) {
        let root_motion = self
            .collab
            .animator
            .as_deref_mut()
            .map(|animator| animator.take_root_motion())
            .unwrap_or(Vec3::ZERO);

        let Some(nav) = self.collab.nav.as_deref() else {
            self.transform.translation += root_motion;
            return;
        };

        if nav.has_position_authority() {
            self.transform.translation = nav.position();
            if nav.has_rotation_authority() {
                if let Some(heading) = flat_direction(nav.velocity()) {
                    self.transform.look_to(heading, Vec3::Y);
                }
            }
        } else {
            self.transform.translation += root_motion;
        }
    }
}
