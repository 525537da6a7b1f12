//! Headless коллабораторы: детерминированная in-process симуляция.
//!
//! Используются headless binary и тестами (без Godot).
//! Каждый тип: дешёвый `Clone` handle на общее состояние: один клон
//! уходит в агента (`Box<dyn ..>`), второй остаётся у вызывающего
//! для наблюдения и управления (двигать игрока, смотреть проигранные клипы).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bevy::prelude::*;

use super::{AnimationController, AnimatorLayer, AudioEmitter, NavigationAgent, Sensor};
use crate::shared::{flat_distance, lock};

// ============================================================================
// Navigation
// ============================================================================

/// Состояние headless навигации (прямолинейное движение в прямоугольнике XZ).
#[derive(Debug, Clone)]
pub struct NavState {
    pub position: Vec3,
    pub destination: Option<Vec3>,
    pub velocity: Vec3,
    pub speed: f32,
    pub stopping_distance: f32,
    pub stopped: bool,
    pub position_authority: bool,
    pub rotation_authority: bool,
    pub enabled: bool,
    pub walkable_min: Vec2,
    pub walkable_max: Vec2,
    pub warps: u32,
    /// Сколько раз позицию агента записали снаружи (`set_internal_position`).
    pub internal_syncs: u32,
    pub destinations: Vec<Vec3>,
}

impl NavState {
    fn contains(&self, p: Vec3) -> bool {
        p.x >= self.walkable_min.x
            && p.x <= self.walkable_max.x
            && p.z >= self.walkable_min.y
            && p.z <= self.walkable_max.y
    }

    fn clamp(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x.clamp(self.walkable_min.x, self.walkable_max.x),
            p.y,
            p.z.clamp(self.walkable_min.y, self.walkable_max.y),
        )
    }
}

#[derive(Clone)]
pub struct HeadlessNav {
    state: Arc<Mutex<NavState>>,
}

impl HeadlessNav {
    /// Проходимая область: квадрат `[-half_extent, half_extent]` по X/Z.
    pub fn new(position: Vec3, half_extent: f32) -> Self {
        Self::with_area(
            position,
            Vec2::splat(-half_extent),
            Vec2::splat(half_extent),
        )
    }

    pub fn with_area(position: Vec3, walkable_min: Vec2, walkable_max: Vec2) -> Self {
        Self {
            state: Arc::new(Mutex::new(NavState {
                position,
                destination: None,
                velocity: Vec3::ZERO,
                speed: 2.0,
                stopping_distance: 0.1,
                stopped: false,
                position_authority: true,
                rotation_authority: true,
                enabled: true,
                walkable_min,
                walkable_max,
                warps: 0,
                internal_syncs: 0,
                destinations: Vec::new(),
            })),
        }
    }

    pub fn state(&self) -> NavState {
        lock(&self.state).clone()
    }
}

impl NavigationAgent for HeadlessNav {
    fn position(&self) -> Vec3 {
        lock(&self.state).position
    }

    fn set_destination(&mut self, destination: Vec3) -> bool {
        let mut s = lock(&self.state);
        if !s.enabled || !s.contains(destination) {
            return false;
        }
        s.destination = Some(destination);
        s.destinations.push(destination);
        true
    }

    fn destination(&self) -> Option<Vec3> {
        lock(&self.state).destination
    }

    fn stop(&mut self) {
        let mut s = lock(&self.state);
        s.stopped = true;
        s.velocity = Vec3::ZERO;
    }

    fn resume(&mut self) {
        lock(&self.state).stopped = false;
    }

    fn is_stopped(&self) -> bool {
        lock(&self.state).stopped
    }

    fn set_position_authority(&mut self, enabled: bool) {
        lock(&self.state).position_authority = enabled;
    }

    fn has_position_authority(&self) -> bool {
        lock(&self.state).position_authority
    }

    fn set_rotation_authority(&mut self, enabled: bool) {
        lock(&self.state).rotation_authority = enabled;
    }

    fn has_rotation_authority(&self) -> bool {
        lock(&self.state).rotation_authority
    }

    fn velocity(&self) -> Vec3 {
        lock(&self.state).velocity
    }

    fn remaining_distance(&self) -> f32 {
        let s = lock(&self.state);
        s.destination
            .map(|d| flat_distance(s.position, d))
            .unwrap_or(0.0)
    }

    fn stopping_distance(&self) -> f32 {
        lock(&self.state).stopping_distance
    }

    fn set_stopping_distance(&mut self, distance: f32) {
        lock(&self.state).stopping_distance = distance.max(0.0);
    }

    fn speed(&self) -> f32 {
        lock(&self.state).speed
    }

    fn set_speed(&mut self, speed: f32) {
        lock(&self.state).speed = speed.max(0.0);
    }

    fn warp(&mut self, position: Vec3) -> bool {
        let mut s = lock(&self.state);
        if !s.contains(position) {
            return false;
        }
        s.position = position;
        s.destination = None;
        s.velocity = Vec3::ZERO;
        s.warps += 1;
        true
    }

    fn set_internal_position(&mut self, position: Vec3) {
        let mut s = lock(&self.state);
        s.position = s.clamp(position);
        s.internal_syncs += 1;
    }

    fn move_by(&mut self, offset: Vec3) {
        let mut s = lock(&self.state);
        let target = s.position + offset;
        s.position = s.clamp(target);
    }

    fn is_on_walkable_surface(&self) -> bool {
        let s = lock(&self.state);
        s.contains(s.position)
    }

    fn sample_position(&self, position: Vec3, max_distance: f32) -> Option<Vec3> {
        let s = lock(&self.state);
        if s.contains(position) {
            return Some(position);
        }
        let nearest = s.clamp(position);
        (flat_distance(nearest, position) <= max_distance).then_some(nearest)
    }

    fn set_enabled(&mut self, enabled: bool) {
        let mut s = lock(&self.state);
        s.enabled = enabled;
        if !enabled {
            s.velocity = Vec3::ZERO;
        }
    }

    fn is_enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    fn advance(&mut self, dt: f32) {
        let mut s = lock(&self.state);
        s.velocity = Vec3::ZERO;
        if !s.enabled || s.stopped {
            return;
        }
        let Some(destination) = s.destination else {
            return;
        };

        let mut to_target = destination - s.position;
        to_target.y = 0.0;
        let distance = to_target.length();
        if distance <= s.stopping_distance {
            return;
        }

        let direction = to_target / distance;
        let step = (s.speed * dt).min(distance - s.stopping_distance);
        s.position += direction * step;
        s.velocity = direction * s.speed;
    }
}

// ============================================================================
// Animation
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AnimState {
    pub durations: HashMap<String, f32>,
    pub default_duration: Option<f32>,
    /// Root motion клипа (м/сек) пока клип играет.
    pub root_motion: HashMap<String, Vec3>,
    pub played: Vec<String>,
    pub current: Option<String>,
    pub elapsed: f32,
    pub locked: bool,
    pub pending_root_motion: Vec3,
}

impl AnimState {
    fn duration_of(&self, clip: &str) -> Option<f32> {
        self.durations.get(clip).copied().or(self.default_duration)
    }
}

#[derive(Clone, Default)]
pub struct HeadlessAnimator {
    state: Arc<Mutex<AnimState>>,
}

impl HeadlessAnimator {
    /// Все неизвестные клипы длятся `default_duration` секунд.
    pub fn new(default_duration: f32) -> Self {
        let animator = Self::default();
        lock(&animator.state).default_duration = Some(default_duration);
        animator
    }

    pub fn with_clip(self, clip: &str, duration: f32) -> Self {
        lock(&self.state).durations.insert(clip.to_string(), duration);
        self
    }

    pub fn with_root_motion(self, clip: &str, velocity: Vec3) -> Self {
        lock(&self.state)
            .root_motion
            .insert(clip.to_string(), velocity);
        self
    }

    pub fn played(&self) -> Vec<String> {
        lock(&self.state).played.clone()
    }

    pub fn has_played(&self, clip: &str) -> bool {
        lock(&self.state).played.iter().any(|c| c == clip)
    }

    pub fn current(&self) -> Option<String> {
        lock(&self.state).current.clone()
    }

    pub fn locked(&self) -> bool {
        lock(&self.state).locked
    }
}

impl AnimationController for HeadlessAnimator {
    fn play(&mut self, clip: &str, _blend_time: f32) {
        let mut s = lock(&self.state);
        s.current = Some(clip.to_string());
        s.elapsed = 0.0;
        s.played.push(clip.to_string());
    }

    fn clip_duration(&self, clip: &str) -> Option<f32> {
        lock(&self.state).duration_of(clip)
    }

    fn force_lock(&mut self) {
        lock(&self.state).locked = true;
    }

    fn force_unlock(&mut self) {
        lock(&self.state).locked = false;
    }

    fn is_locked(&self) -> bool {
        lock(&self.state).locked
    }

    fn take_root_motion(&mut self) -> Vec3 {
        std::mem::take(&mut lock(&self.state).pending_root_motion)
    }

    fn advance(&mut self, dt: f32) {
        let mut s = lock(&self.state);
        let Some(clip) = s.current.clone() else {
            return;
        };

        if let Some(velocity) = s.root_motion.get(&clip).copied() {
            let duration = s.duration_of(&clip).unwrap_or(0.0);
            let active = dt.min(duration - s.elapsed).max(0.0);
            s.pending_root_motion += velocity * active;
        }
        s.elapsed += dt;
    }
}

// ============================================================================
// Animator layer (fallback)
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LayerState {
    pub current: Option<String>,
    pub target: Option<String>,
    pub fade_left: f32,
    pub crossfades: Vec<String>,
    /// Crossfade никогда не доходит до состояния (проверка timeout'ов).
    pub stuck: bool,
}

#[derive(Clone, Default)]
pub struct HeadlessLayer {
    state: Arc<Mutex<LayerState>>,
}

impl HeadlessLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stuck() -> Self {
        let layer = Self::default();
        lock(&layer.state).stuck = true;
        layer
    }

    pub fn state(&self) -> LayerState {
        lock(&self.state).clone()
    }
}

impl AnimatorLayer for HeadlessLayer {
    fn crossfade(&mut self, state: &str, duration: f32) {
        let mut s = lock(&self.state);
        s.target = Some(state.to_string());
        s.fade_left = duration;
        s.crossfades.push(state.to_string());
    }

    fn is_in_state(&self, state: &str) -> bool {
        lock(&self.state).current.as_deref() == Some(state)
    }

    fn advance(&mut self, dt: f32) {
        let mut s = lock(&self.state);
        if s.target.is_none() || s.stuck {
            return;
        }
        s.fade_left -= dt;
        if s.fade_left <= 0.0 {
            s.current = s.target.take();
        }
    }
}

// ============================================================================
// Sensor
// ============================================================================

#[derive(Debug, Clone)]
pub struct SensorState {
    pub target: Option<Vec3>,
    pub visible: bool,
    pub detection_radius: f32,
    pub enabled: bool,
    pub observer: Vec3,
}

#[derive(Clone)]
pub struct HeadlessSensor {
    state: Arc<Mutex<SensorState>>,
}

impl HeadlessSensor {
    pub fn new(detection_radius: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(SensorState {
                target: None,
                visible: false,
                detection_radius,
                enabled: true,
                observer: Vec3::ZERO,
            })),
        }
    }

    /// Игрок виден (в пределах detection radius) в точке `position`.
    pub fn show_target(&self, position: Vec3) {
        let mut s = lock(&self.state);
        s.target = Some(position);
        s.visible = true;
    }

    pub fn move_target(&self, position: Vec3) {
        lock(&self.state).target = Some(position);
    }

    /// Line of sight потерян (позиция остаётся, но цель не воспринимается).
    pub fn hide_target(&self) {
        lock(&self.state).visible = false;
    }

    pub fn state(&self) -> SensorState {
        lock(&self.state).clone()
    }
}

impl Sensor for HeadlessSensor {
    fn target_in_sight(&self) -> bool {
        let s = lock(&self.state);
        match s.target {
            Some(target) => {
                s.enabled && s.visible && s.observer.distance(target) <= s.detection_radius
            }
            None => false,
        }
    }

    fn target_position(&self) -> Option<Vec3> {
        if self.target_in_sight() {
            lock(&self.state).target
        } else {
            None
        }
    }

    fn detection_radius(&self) -> f32 {
        lock(&self.state).detection_radius
    }

    fn set_detection_radius(&mut self, radius: f32) {
        lock(&self.state).detection_radius = radius.max(0.0);
    }

    fn set_enabled(&mut self, enabled: bool) {
        lock(&self.state).enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    fn track_observer(&mut self, position: Vec3) {
        lock(&self.state).observer = position;
    }
}

// ============================================================================
// Audio
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AudioState {
    pub current_loop: Option<String>,
    pub loop_history: Vec<Option<String>>,
    pub one_shots: Vec<String>,
}

#[derive(Clone, Default)]
pub struct HeadlessAudio {
    state: Arc<Mutex<AudioState>>,
}

impl HeadlessAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AudioState {
        lock(&self.state).clone()
    }
}

impl AudioEmitter for HeadlessAudio {
    fn set_loop(&mut self, key: Option<&str>) {
        let mut s = lock(&self.state);
        s.current_loop = key.map(str::to_string);
        let current = s.current_loop.clone();
        s.loop_history.push(current);
    }

    fn play_one_shot(&mut self, key: &str) {
        lock(&self.state).one_shots.push(key.to_string());
    }
}
