//! Suspendable sequences (cooperative, single-threaded).
//!
//! Многокадровое поведение (анимационные цепочки, ожидания, polling) -
//! это объект `Sequence`, который возвращает `Step::Wait(..)` в каждой точке
//! приостановки и продолжается с того же места на следующем `resume`.
//!
//! Каждая задача помечена `StateToken` состояния-владельца. Перед каждым
//! `resume` runner проверяет `StateMachine::is_current(token)`: устаревшая
//! задача молча выбрасывается и ничего не мутирует.
//! Выход из состояния отменяет ВСЕ его задачи (их может быть несколько).

use crate::fsm::{Host, StateKey, StateToken};

#[cfg(test)]
mod sequence_tests;

/// Меньше этого остатка ожидание считается завершённым.
const WAIT_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wait {
    /// Продолжить на следующем кадре.
    Frame,
    /// Продолжить через N секунд симуляции.
    Seconds(f32),
}

impl Wait {
    fn seconds(self) -> f32 {
        match self {
            Wait::Frame => 0.0,
            Wait::Seconds(s) => s.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Wait(Wait),
    Done,
}

impl Step {
    pub fn frame() -> Self {
        Step::Wait(Wait::Frame)
    }

    pub fn seconds(seconds: f32) -> Self {
        Step::Wait(Wait::Seconds(seconds))
    }
}

/// Почему задача закончилась.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEnd {
    /// `resume` вернул `Step::Done`.
    Completed,
    /// Владелец вышел из состояния / агент отключён.
    Cancelled,
    /// Владелец уже не текущий (обнаружено после приостановки).
    Stale,
}

pub trait Sequence<C>: Send {
    fn label(&self) -> &'static str;

    /// `dt`: время кадра, на котором произошло продолжение.
    fn resume(&mut self, ctx: &mut C, dt: f32) -> Step;

    /// Гарантированный finalizer: вызывается при ЛЮБОМ завершении задачи.
    fn finalize(&mut self, _ctx: &mut C, _end: TaskEnd) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

struct Task<K, C> {
    id: TaskId,
    owner: StateToken<K>,
    remaining: f32,
    sequence: Box<dyn Sequence<C>>,
}

/// Активные задачи одного агента.
pub struct TaskSet<K, C> {
    active: Vec<Task<K, C>>,
    next_id: u64,
}

impl<K: StateKey, C> Default for TaskSet<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: StateKey, C> TaskSet<K, C> {
    pub fn new() -> Self {
        Self {
            active: Vec::new(),
            next_id: 0,
        }
    }

    /// Новая задача стартует на ближайшем прогоне runner'а.
    pub fn spawn(&mut self, owner: StateToken<K>, sequence: impl Sequence<C> + 'static) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.active.push(Task {
            id,
            owner,
            remaining: 0.0,
            sequence: Box::new(sequence),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn count_owned(&self, state: K) -> usize {
        self.active.iter().filter(|t| t.owner.state == state).count()
    }

    pub fn is_running(&self, id: TaskId) -> bool {
        self.active.iter().any(|t| t.id == id)
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.active.iter().map(|t| t.sequence.label()).collect()
    }

    /// Извлекает все задачи состояния `state` (любой generation).
    pub fn cancel_owned(&mut self, state: K) -> Vec<Box<dyn Sequence<C>>> {
        let (cancelled, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|t| t.owner.state == state);
        self.active = kept;
        cancelled.into_iter().map(|t| t.sequence).collect()
    }

    pub fn cancel_all(&mut self) -> Vec<Box<dyn Sequence<C>>> {
        std::mem::take(&mut self.active)
            .into_iter()
            .map(|t| t.sequence)
            .collect()
    }
}

pub fn finalize_all<C>(ctx: &mut C, sequences: Vec<Box<dyn Sequence<C>>>, end: TaskEnd) {
    for mut sequence in sequences {
        sequence.finalize(ctx, end);
    }
}

/// Один прогон всех задач агента.
///
/// Задачи на время прогона вынимаются из контекста, чтобы `resume` мог
/// мутировать контекст; порождённые во время прогона задачи стартуют
/// на следующем кадре.
pub fn run_tasks<K: StateKey, C: Host<K>>(ctx: &mut C, dt: f32) {
    let running = std::mem::take(&mut ctx.tasks().active);
    let mut kept = Vec::with_capacity(running.len());

    for mut task in running {
        if !ctx.machine().is_current(task.owner) {
            crate::logger::log(&format!(
                "⏹️ Sequence '{}' is stale (owner {} gen {}), dropped",
                task.sequence.label(),
                task.owner.state.name(),
                task.owner.generation
            ));
            task.sequence.finalize(ctx, TaskEnd::Stale);
            continue;
        }

        task.remaining -= dt;
        if task.remaining > WAIT_EPSILON {
            kept.push(task);
            continue;
        }

        match task.sequence.resume(ctx, dt) {
            Step::Wait(wait) => {
                task.remaining = wait.seconds();
                kept.push(task);
            }
            Step::Done => task.sequence.finalize(ctx, TaskEnd::Completed),
        }
    }

    let spawned = std::mem::take(&mut ctx.tasks().active);
    let tasks = ctx.tasks();
    tasks.active = kept;
    tasks.active.extend(spawned);
}

/// Bounded wait-loop: polling внешнего статуса с явным timeout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollTimeout {
    elapsed: f32,
    timeout: f32,
}

impl PollTimeout {
    pub fn new(timeout: f32) -> Self {
        Self {
            elapsed: 0.0,
            timeout: timeout.max(0.0),
        }
    }

    /// Возвращает true когда время вышло.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        self.expired()
    }

    pub fn expired(&self) -> bool {
        self.elapsed >= self.timeout
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}
