//! StateTable: объекты состояний агента + выполнение переходов.

use std::collections::HashMap;

use super::{Admission, Host, State, StateKey};
use crate::sequence::{self, TaskEnd};

/// Максимум цепочки переходов за один drain (защита от ping-pong).
const MAX_CHAINED_TRANSITIONS: usize = 8;

pub struct StateTable<K, C> {
    states: HashMap<K, Box<dyn State<C>>>,
}

impl<K: StateKey, C: Host<K>> Default for StateTable<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: StateKey, C: Host<K>> StateTable<K, C> {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    pub fn with(mut self, key: K, state: impl State<C> + 'static) -> Self {
        self.states.insert(key, Box::new(state));
        self
    }

    pub fn contains(&self, key: K) -> bool {
        self.states.contains_key(&key)
    }

    /// ChangeState(next, force).
    ///
    /// Возвращает true если переход выполнен или отложен (forced во время перехода).
    pub fn change_state(&mut self, ctx: &mut C, next: K, force: bool) -> bool {
        match ctx.machine().begin(next, force) {
            Admission::Accepted => {
                self.transition(ctx, next);
                self.drain_requests(ctx);
                true
            }
            Admission::Deferred => true,
            Admission::Rejected => false,
        }
    }

    /// Forced Exit + Enter текущего состояния.
    pub fn reenter(&mut self, ctx: &mut C) -> bool {
        match ctx.machine().current() {
            Some(current) => self.change_state(ctx, current, true),
            None => false,
        }
    }

    /// Per-frame Update текущего состояния (только после завершённого Enter).
    pub fn update(&mut self, ctx: &mut C, dt: f32) {
        let Some(current) = ctx.machine().current() else {
            return;
        };
        if !ctx.machine().is_entered() {
            return;
        }

        if let Some(state) = self.states.get_mut(&current) {
            state.update(ctx, dt);
        }

        self.drain_requests(ctx);
    }

    /// Прогон suspendable sequences + применение запрошенных ими переходов.
    pub fn run_tasks(&mut self, ctx: &mut C, dt: f32) {
        sequence::run_tasks(ctx, dt);
        self.drain_requests(ctx);
    }

    /// Отмена всех sequences агента (disable, death).
    pub fn cancel_all_tasks(&mut self, ctx: &mut C) {
        let cancelled = ctx.tasks().cancel_all();
        sequence::finalize_all(ctx, cancelled, TaskEnd::Cancelled);
    }

    fn transition(&mut self, ctx: &mut C, next: K) {
        let previous = ctx.machine().current();

        if let Some(prev) = previous {
            if let Some(state) = self.states.get_mut(&prev) {
                state.exit(ctx);
            }
            // Exit завершается вместе с отменой всех sequences владельца
            let cancelled = ctx.tasks().cancel_owned(prev);
            sequence::finalize_all(ctx, cancelled, TaskEnd::Cancelled);
        }

        ctx.machine().commit(next);

        match self.states.get_mut(&next) {
            Some(state) => state.enter(ctx),
            None => crate::logger::log_error(&format!(
                "FSM: no state object registered for {}",
                next.name()
            )),
        }

        ctx.machine().finish();
        ctx.on_state_changed(previous, next);
    }

    fn drain_requests(&mut self, ctx: &mut C) {
        for _ in 0..MAX_CHAINED_TRANSITIONS {
            let Some(request) = ctx.machine().take_request() else {
                return;
            };
            if ctx.machine().begin(request.next, request.force) == Admission::Accepted {
                self.transition(ctx, request.next);
            }
        }

        if let Some(dropped) = ctx.machine().take_request() {
            crate::logger::log_warning(&format!(
                "FSM: transition chain exceeded {} steps, request → {} dropped",
                MAX_CHAINED_TRANSITIONS,
                dropped.next.name()
            ));
        }
    }
}
