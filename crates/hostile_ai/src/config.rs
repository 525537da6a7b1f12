//! Tunables для hostile агентов.
//!
//! Plain serde структуры: встраиваются в любой внешний data-файл,
//! отсутствующие поля берутся из `Default`.

use serde::{Deserialize, Serialize};

/// Параметры Creeper (MonsterAI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreeperConfig {
    pub max_health: f32,

    /// Скорость в Idle/Wander (м/сек)
    pub walk_speed: f32,
    /// Скорость в Chase без surge
    pub chase_speed: f32,
    /// Chance power surge при входе в Chase (0..1)
    pub surge_chance: f32,
    pub surge_speed_multiplier: f32,
    /// Surge ограничен по времени (секунды)
    pub surge_duration: f32,
    /// Сколько обычных хитов surge поглощает до прерывания
    pub normal_hits_to_interrupt: u32,
    /// Дистанция остановки/удара в Chase
    pub stopping_distance: f32,

    pub wander_radius: f32,
    /// Макс. расстояние от случайной точки до проходимой поверхности
    pub wander_sample_distance: f32,
    pub wander_wait_min: f32,
    pub wander_wait_max: f32,
    /// Сколько ждать прибытия прежде чем сдаться
    pub arrive_timeout: f32,

    /// Длительность hiss если клип неизвестен
    pub hiss_fallback_duration: f32,
    /// Скорость поворота к цели (рад/сек)
    pub turn_speed: f32,

    pub stun_duration: f32,
    /// Пауза "дрожи" после collapse при hard hit
    pub tremble_duration: f32,
    pub knockback_on_hard_hit: bool,
    pub knockback_distance: f32,
    pub knockback_duration: f32,

    /// Сколько секунд без line-of-sight до отказа от Chase
    pub lose_target_after: f32,

    /// Спавн в лежачем состоянии (просыпается от первого урона)
    pub start_incapacitated: bool,
    /// Hard hit, после которого health fraction ≤ порога, роняет агента (Incapacitated)
    pub incapacitate_below: f32,
    /// Detection radius пока лежит ("can-be-revived")
    pub revive_detection_radius: f32,
    pub resurrection_chance: f32,
    /// Прибавка к chance после каждой неудачной детекции
    pub resurrection_chance_step: f32,

    /// Timeout для polling внешнего animator статуса
    pub animation_poll_timeout: f32,
    pub blend_time: f32,
    /// Ambient loop после еды в Idle
    pub idle_ambient_loop: bool,
}

impl Default for CreeperConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            walk_speed: 1.5,
            chase_speed: 3.5,
            surge_chance: 0.3,
            surge_speed_multiplier: 1.6,
            surge_duration: 8.0,
            normal_hits_to_interrupt: 2,
            stopping_distance: 1.6,
            wander_radius: 8.0,
            wander_sample_distance: 2.0,
            wander_wait_min: 2.0,
            wander_wait_max: 5.0,
            arrive_timeout: 15.0,
            hiss_fallback_duration: 1.2,
            turn_speed: 6.0,
            stun_duration: 3.0,
            tremble_duration: 1.2,
            knockback_on_hard_hit: true,
            knockback_distance: 1.5,
            knockback_duration: 0.35,
            lose_target_after: 4.0,
            start_incapacitated: false,
            incapacitate_below: 0.25,
            revive_detection_radius: 3.0,
            resurrection_chance: 0.25,
            resurrection_chance_step: 0.15,
            animation_poll_timeout: 2.0,
            blend_time: 0.15,
            idle_ambient_loop: true,
        }
    }
}

/// Параметры Boss (BossAI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    pub max_health: f32,
    pub walk_speed: f32,
    pub chase_speed: f32,

    /// Радиус атаки (R)
    pub attack_range: f32,
    /// Hysteresis buffer (B): вход в Attack только при distance <= R - B
    pub attack_range_buffer: f32,
    /// Slack: Attack продолжается пока distance <= R * slack
    pub attack_range_slack: f32,
    /// Желаемая дистанция остановки (clamp'ится ниже R - B)
    pub stopping_distance: f32,

    /// Chance special attack (dash) за секунду вне радиуса атаки
    pub special_attack_chance: f32,
    /// Chance locked after-slash follow-up после удара
    pub after_slash_chance: f32,

    pub stun_meter_max: f32,
    pub stun_meter_per_damage: f32,
    pub hard_hit_stun_bonus: f32,
    pub stun_duration: f32,

    pub search_duration: f32,
    pub lose_target_after: f32,

    /// Drift² между агентом и Transform, после которого делаем warp
    pub desync_warp_threshold_sq: f32,

    pub animation_poll_timeout: f32,
    pub blend_time: f32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            max_health: 1000.0,
            walk_speed: 1.2,
            chase_speed: 4.5,
            attack_range: 3.0,
            attack_range_buffer: 0.5,
            attack_range_slack: 1.2,
            stopping_distance: 2.5,
            special_attack_chance: 0.15,
            after_slash_chance: 0.5,
            stun_meter_max: 100.0,
            stun_meter_per_damage: 1.0,
            hard_hit_stun_bonus: 25.0,
            stun_duration: 4.0,
            search_duration: 6.0,
            lose_target_after: 2.0,
            desync_warp_threshold_sq: 2.0,
            animation_poll_timeout: 2.0,
            blend_time: 0.1,
        }
    }
}
