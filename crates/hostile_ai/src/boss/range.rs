//! Attack range hysteresis (чистые функции).
//!
//! R: attack range, B: buffer, slack: множитель удержания.
//! Вход в Attack: distance ≤ R − B. Удержание: distance ≤ R × slack и цель видна.

/// Запас между stopping distance и порогом входа в Attack.
pub const STOPPING_MARGIN: f32 = 0.1;

pub fn attack_entry_distance(attack_range: f32, buffer: f32) -> f32 {
    (attack_range - buffer).max(0.0)
}

pub fn should_enter_attack(distance: f32, attack_range: f32, buffer: f32) -> bool {
    distance <= attack_entry_distance(attack_range, buffer)
}

pub fn should_continue_attack(distance: f32, attack_range: f32, slack: f32, in_sight: bool) -> bool {
    in_sight && distance <= attack_range * slack.max(1.0)
}

/// Stopping distance всегда строго внутри зоны входа в Attack,
/// иначе агент останавливается снаружи и никогда не атакует.
pub fn clamp_stopping_distance(desired: f32, attack_range: f32, buffer: f32) -> f32 {
    let ceiling = (attack_entry_distance(attack_range, buffer) - STOPPING_MARGIN).max(0.0);
    desired.clamp(0.0, ceiling)
}
