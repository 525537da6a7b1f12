//! Hierarchical FSM для hostile агентов.
//!
//! Архитектура:
//! - `StateKey`: закрытый enum идентификаторов состояний семейства (Creeper/Boss)
//! - `State<C>`: поведение одного состояния (enter/update/exit), создаётся ОДИН раз на агента
//! - `StateMachine<K>`: current state + guard'ы (transitioning, lock, seal) + один pending слот
//! - `StateTable<K, C>`: владеет объектами состояний и выполняет переходы
//! - `Host<K>`: "тело" агента (флаги, коллабораторы, задачи), которое передаётся в состояния
//!
//! Состояния не держат ссылку на машину: переходы изнутри состояния/sequence
//! делаются через `StateMachine::request`, таблица применяет их после текущего прохода.

use std::fmt;
use std::hash::Hash;

use crate::sequence::TaskSet;

pub mod machine;
pub mod table;


pub use machine::{Admission, StateMachine, StateToken, TransitionRequest};
pub use table::StateTable;

/// Идентификатор состояния (tagged variant).
pub trait StateKey: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Стабильное имя (логи, snapshot).
    fn name(self) -> &'static str;

    /// Обратное преобразование для restore из snapshot.
    fn from_name(name: &str) -> Option<Self>;
}

/// Одно состояние агента.
///
/// Lifecycle: `enter` → `update`* → `exit`. Между `enter` одного состояния
/// и `enter` следующего всегда ровно один `exit`.
pub trait State<C>: Send {
    fn enter(&mut self, ctx: &mut C);

    fn update(&mut self, _ctx: &mut C, _dt: f32) {}

    fn exit(&mut self, _ctx: &mut C) {}
}

/// Контекст, в котором живут состояния одного агента.
pub trait Host<K: StateKey>: Sized + 'static {
    fn machine(&mut self) -> &mut StateMachine<K>;

    fn tasks(&mut self) -> &mut TaskSet<K, Self>;

    /// Hook после завершения перехода (события, логи).
    fn on_state_changed(&mut self, _from: Option<K>, _to: K) {}
}
