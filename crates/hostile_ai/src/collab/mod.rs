//! Внешние коллабораторы AI ядра (contract only).
//!
//! Transform ownership: визуальный Transform принадлежит агенту,
//! NavigationAgent - отдельный pathfinding body. Кто пишет позицию,
//! решает флаг position authority на NavigationAgent.
//!
//! Все коллабораторы опциональны: отсутствующий = no-op на месте вызова.

use bevy::prelude::*;

pub mod headless;

/// Pathfinding body (NavMeshAgent / NavigationAgent3D).
pub trait NavigationAgent: Send {
    /// Внутренняя (симулируемая) позиция агента.
    fn position(&self) -> Vec3;

    /// false если точка недостижима (путь не построен).
    fn set_destination(&mut self, destination: Vec3) -> bool;

    fn destination(&self) -> Option<Vec3>;

    fn stop(&mut self);

    fn resume(&mut self);

    fn is_stopped(&self) -> bool;

    /// Агент пишет позицию в Transform (true) или Transform ведёт агента (false).
    fn set_position_authority(&mut self, enabled: bool);

    fn has_position_authority(&self) -> bool;

    fn set_rotation_authority(&mut self, enabled: bool);

    fn has_rotation_authority(&self) -> bool;

    fn velocity(&self) -> Vec3;

    fn remaining_distance(&self) -> f32;

    fn stopping_distance(&self) -> f32;

    fn set_stopping_distance(&mut self, distance: f32);

    fn speed(&self) -> f32;

    fn set_speed(&mut self, speed: f32);

    /// Hard teleport + сброс внутреннего состояния пути.
    fn warp(&mut self, position: Vec3) -> bool;

    /// Запись внутренней позиции без сброса пути ("next position").
    fn set_internal_position(&mut self, position: Vec3);

    /// Ручное перемещение (knockback).
    fn move_by(&mut self, offset: Vec3);

    fn is_on_walkable_surface(&self) -> bool;

    /// Ближайшая проходимая точка в радиусе `max_distance`.
    fn sample_position(&self, position: Vec3, max_distance: f32) -> Option<Vec3>;

    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Engine-side шаг. Движки, которые интегрируют агента сами, оставляют пустым.
    fn advance(&mut self, _dt: f32) {}
}

/// Animation controller с поддержкой "play and wait".
pub trait AnimationController: Send {
    fn play(&mut self, clip: &str, blend_time: f32);

    /// None: клип неизвестен контроллеру.
    fn clip_duration(&self, clip: &str) -> Option<f32>;

    /// Запрещает смену клипа снаружи текущей sequence.
    fn force_lock(&mut self);

    fn force_unlock(&mut self);

    fn is_locked(&self) -> bool;

    /// Смещение визуального Transform от root motion с прошлого вызова.
    fn take_root_motion(&mut self) -> Vec3 {
        Vec3::ZERO
    }

    fn advance(&mut self, _dt: f32) {}
}

/// Raw animator layer: fallback когда богатого контроллера нет.
pub trait AnimatorLayer: Send {
    fn crossfade(&mut self, state: &str, duration: f32);

    fn is_in_state(&self, state: &str) -> bool;

    fn advance(&mut self, _dt: f32) {}
}

/// Vision sensor (VisionCone / line-of-sight).
pub trait Sensor: Send {
    fn target_in_sight(&self) -> bool;

    /// Позиция воспринимаемой цели (игрока), если известна сенсору.
    fn target_position(&self) -> Option<Vec3>;

    fn detection_radius(&self) -> f32;

    fn set_detection_radius(&mut self, radius: f32);

    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Позиция наблюдателя на этом кадре.
    fn track_observer(&mut self, _position: Vec3) {}
}

/// Audio events. Ключи непрозрачны для AI ядра.
pub trait AudioEmitter: Send {
    /// None: выключить ambient loop.
    fn set_loop(&mut self, key: Option<&str>);

    fn play_one_shot(&mut self, key: &str);
}

/// Набор коллабораторов одного агента.
#[derive(Default)]
pub struct Collaborators {
    pub nav: Option<Box<dyn NavigationAgent>>,
    pub animator: Option<Box<dyn AnimationController>>,
    pub layer: Option<Box<dyn AnimatorLayer>>,
    pub sensor: Option<Box<dyn Sensor>>,
    pub audio: Option<Box<dyn AudioEmitter>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nav(mut self, nav: impl NavigationAgent + 'static) -> Self {
        self.nav = Some(Box::new(nav));
        self
    }

    pub fn with_animator(mut self, animator: impl AnimationController + 'static) -> Self {
        self.animator = Some(Box::new(animator));
        self
    }

    pub fn with_layer(mut self, layer: impl AnimatorLayer + 'static) -> Self {
        self.layer = Some(Box::new(layer));
        self
    }

    pub fn with_sensor(mut self, sensor: impl Sensor + 'static) -> Self {
        self.sensor = Some(Box::new(sensor));
        self
    }

    pub fn with_audio(mut self, audio: impl AudioEmitter + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }
}
