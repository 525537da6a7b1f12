//! Shared domain: cross-cutting helpers.
//!
//! - `lock`: poison-tolerant Mutex lock (агенты/коллабораторы делятся через Arc<Mutex<..>>)
//! - плоская геометрия (XZ) для AI решений

use std::sync::{Mutex, MutexGuard, PoisonError};

use bevy::prelude::*;

/// Lock без паники: poisoned mutex восстанавливаем, симуляция продолжает работу.
pub fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Дистанция по XZ (высоту AI не учитывает).
pub fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}

/// Нормализованное направление по XZ; None для нулевого вектора.
pub fn flat_direction(v: Vec3) -> Option<Vec3> {
    let flat = Vec3::new(v.x, 0.0, v.z);
    let len = flat.length();
    (len > 1e-4).then(|| flat / len)
}
