//! StateMachine: current state + transition guards.

use super::StateKey;

/// Идентичность "входа" в состояние: ключ + generation перехода.
///
/// Sequence держит token владельца вместо ссылки на состояние;
/// после каждой точки приостановки проверяется `StateMachine::is_current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateToken<K> {
    pub state: K,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRequest<K> {
    pub next: K,
    pub force: bool,
}

/// Результат попытки начать переход.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Переход начат, вызывающий обязан выполнить exit/commit/enter/finish.
    Accepted,
    /// Forced запрос во время другого перехода: применится сразу после него.
    Deferred,
    Rejected,
}

/// Инварианты:
/// - переходы сериализованы: пока `transitioning`, новый переход не начинается
/// - `sealed` (терминальное состояние) отклоняет всё, даже forced
/// - `locked` отклоняет не-forced переходы; forced переход снимает lock
#[derive(Debug)]
pub struct StateMachine<K> {
    current: Option<K>,
    previous: Option<K>,
    generation: u64,
    entered: bool,
    transitioning: bool,
    locked: bool,
    sealed: bool,
    pending: Option<TransitionRequest<K>>,
}

impl<K: StateKey> Default for StateMachine<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: StateKey> StateMachine<K> {
    pub fn new() -> Self {
        Self {
            current: None,
            previous: None,
            generation: 0,
            entered: false,
            transitioning: false,
            locked: false,
            sealed: false,
            pending: None,
        }
    }

    pub fn current(&self) -> Option<K> {
        self.current
    }

    pub fn previous(&self) -> Option<K> {
        self.previous
    }

    pub fn is_in(&self, state: K) -> bool {
        self.current == Some(state)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// true когда `enter` текущего состояния завершён.
    pub fn is_entered(&self) -> bool {
        self.entered
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn token(&self) -> Option<StateToken<K>> {
        self.current.map(|state| StateToken {
            state,
            generation: self.generation,
        })
    }

    /// "Моё состояние всё ещё активно?"
    pub fn is_current(&self, token: StateToken<K>) -> bool {
        self.current == Some(token.state) && self.generation == token.generation
    }

    /// Hard lock на не-forced переходы (boss after-slash).
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Терминальное состояние: больше никаких переходов.
    pub fn seal(&mut self) {
        self.sealed = true;
        self.pending = None;
    }

    pub fn pending(&self) -> Option<TransitionRequest<K>> {
        self.pending
    }

    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Запрос перехода изнутри состояния/sequence.
    ///
    /// Применяется `StateTable` после текущего update/task прохода.
    /// Слот один: более поздний запрос перезаписывает ранний,
    /// кроме случая когда в слоте forced, а новый: нет.
    pub fn request(&mut self, next: K, force: bool) -> bool {
        if self.sealed {
            crate::logger::log(&format!(
                "FSM: sealed, request → {} ignored",
                next.name()
            ));
            return false;
        }

        if self.transitioning && !force {
            crate::logger::log_warning(&format!(
                "FSM: re-entrant request → {} ignored (transition in progress)",
                next.name()
            ));
            return false;
        }

        if self.locked && !force {
            crate::logger::log(&format!(
                "FSM: locked, request → {} ignored",
                next.name()
            ));
            return false;
        }

        if let Some(existing) = self.pending {
            if existing.force && !force {
                return false;
            }
        }

        self.pending = Some(TransitionRequest { next, force });
        true
    }

    pub fn take_request(&mut self) -> Option<TransitionRequest<K>> {
        self.pending.take()
    }

    pub fn begin(&mut self, next: K, force: bool) -> Admission {
        if self.sealed {
            crate::logger::log(&format!(
                "FSM: sealed in {:?}, transition → {} rejected",
                self.current.map(|s| s.name()),
                next.name()
            ));
            return Admission::Rejected;
        }

        if self.transitioning {
            if force {
                self.pending = Some(TransitionRequest { next, force });
                return Admission::Deferred;
            }
            crate::logger::log_warning(&format!(
                "FSM: re-entrant transition → {} ignored",
                next.name()
            ));
            return Admission::Rejected;
        }

        if self.locked && !force {
            crate::logger::log(&format!(
                "FSM: locked, transition → {} rejected",
                next.name()
            ));
            return Admission::Rejected;
        }

        if force {
            self.locked = false;
        }
        self.transitioning = true;
        Admission::Accepted
    }

    pub fn commit(&mut self, next: K) {
        self.previous = self.current;
        self.current = Some(next);
        self.generation += 1;
        self.entered = false;
    }

    pub fn finish(&mut self) {
        self.entered = true;
        self.transitioning = false;
    }
}
