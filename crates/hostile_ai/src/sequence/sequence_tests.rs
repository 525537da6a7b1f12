//! Tests for suspendable sequences.

use super::*;
use crate::fsm::{Host, State, StateKey, StateMachine, StateTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Phase {
    Busy,
    Calm,
}

impl StateKey for Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Busy => "Busy",
            Phase::Calm => "Calm",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Busy" => Some(Phase::Busy),
            "Calm" => Some(Phase::Calm),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Ctx {
    fsm: StateMachine<Phase>,
    tasks: TaskSet<Phase, Ctx>,
    ticks: u32,
    ends: Vec<(&'static str, TaskEnd)>,
}

impl Host<Phase> for Ctx {
    fn machine(&mut self) -> &mut StateMachine<Phase> {
        &mut self.fsm
    }

    fn tasks(&mut self) -> &mut TaskSet<Phase, Self> {
        &mut self.tasks
    }
}

/// Каждые `period` секунд увеличивает счётчик, `limit` раз.
struct Counter {
    label: &'static str,
    period: f32,
    limit: u32,
    done: u32,
}

impl Sequence<Ctx> for Counter {
    fn label(&self) -> &'static str {
        self.label
    }

    fn resume(&mut self, ctx: &mut Ctx, _dt: f32) -> Step {
        if self.done == self.limit {
            return Step::Done;
        }
        self.done += 1;
        ctx.ticks += 1;
        Step::seconds(self.period)
    }

    fn finalize(&mut self, ctx: &mut Ctx, end: TaskEnd) {
        ctx.ends.push((self.label, end));
    }
}

struct Busy;

impl State<Ctx> for Busy {
    fn enter(&mut self, ctx: &mut Ctx) {
        let owner = ctx.fsm.token().expect("entered state has a token");
        ctx.tasks.spawn(
            owner,
            Counter {
                label: "first",
                period: 0.5,
                limit: 10,
                done: 0,
            },
        );
        ctx.tasks.spawn(
            owner,
            Counter {
                label: "second",
                period: 0.0,
                limit: 100,
                done: 0,
            },
        );
    }
}

struct Calm;

impl State<Ctx> for Calm {
    fn enter(&mut self, _ctx: &mut Ctx) {}
}

fn table() -> StateTable<Phase, Ctx> {
    StateTable::new().with(Phase::Busy, Busy).with(Phase::Calm, Calm)
}

#[test]
fn test_wait_seconds_delays_resume() {
    let mut ctx = Ctx::default();
    let owner = {
        let mut states = table();
        states.change_state(&mut ctx, Phase::Calm, false);
        ctx.fsm.token().unwrap()
    };
    ctx.tasks.spawn(
        owner,
        Counter {
            label: "slow",
            period: 1.0,
            limit: 3,
            done: 0,
        },
    );

    // Первый resume сразу, дальше раз в секунду (dt = 0.25)
    run_tasks(&mut ctx, 0.25);
    assert_eq!(ctx.ticks, 1);
    for _ in 0..3 {
        run_tasks(&mut ctx, 0.25);
    }
    assert_eq!(ctx.ticks, 1);
    for _ in 0..1 {
        run_tasks(&mut ctx, 0.25);
    }
    assert_eq!(ctx.ticks, 2);
    for _ in 0..8 {
        run_tasks(&mut ctx, 0.25);
    }
    assert_eq!(ctx.ticks, 3);

    // Следующий resume возвращает Done → finalizer Completed
    for _ in 0..4 {
        run_tasks(&mut ctx, 0.25);
    }
    assert_eq!(ctx.ends, vec![("slow", TaskEnd::Completed)]);
    assert!(ctx.tasks.is_empty());
}

#[test]
fn test_exit_cancels_every_owned_task() {
    let mut ctx = Ctx::default();
    let mut states = table();

    states.change_state(&mut ctx, Phase::Busy, false);
    states.run_tasks(&mut ctx, 0.1);
    assert_eq!(ctx.tasks.count_owned(Phase::Busy), 2);

    states.change_state(&mut ctx, Phase::Calm, false);

    assert!(ctx.tasks.is_empty());
    assert_eq!(ctx.ends.len(), 2);
    assert!(ctx.ends.iter().all(|(_, end)| *end == TaskEnd::Cancelled));
}

#[test]
fn test_stale_task_is_dropped_without_resume() {
    let mut ctx = Ctx::default();
    let mut states = table();

    states.change_state(&mut ctx, Phase::Calm, false);
    let stale_owner = ctx.fsm.token().unwrap();
    // Токен от прошлого входа в Calm: после re-enter generation другой
    states.reenter(&mut ctx);
    ctx.tasks.spawn(
        stale_owner,
        Counter {
            label: "ghost",
            period: 0.0,
            limit: 5,
            done: 0,
        },
    );

    run_tasks(&mut ctx, 0.1);

    assert_eq!(ctx.ticks, 0);
    assert_eq!(ctx.ends, vec![("ghost", TaskEnd::Stale)]);
}

#[test]
fn test_cancel_all_finalizes() {
    let mut ctx = Ctx::default();
    let mut states = table();

    states.change_state(&mut ctx, Phase::Busy, false);
    states.cancel_all_tasks(&mut ctx);

    assert!(ctx.tasks.is_empty());
    assert_eq!(ctx.ends.len(), 2);
}

#[test]
fn test_poll_timeout() {
    let mut poll = PollTimeout::new(1.0);
    assert!(!poll.tick(0.4));
    assert!(!poll.tick(0.4));
    assert!(poll.tick(0.4));
    assert!(poll.expired());
}
