//! Periodic activity scheduler.
//!
//! Each registered [`PeriodicActivity`] gets its own core-pinned thread and
//! steps on a fixed-rate [`Cadence`].  Activities never wait on one
//! another; they share state only through the snapshot handles they were
//! constructed with.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  probe-poll  (250 ms)   TemperatureAggregator::poll          │
//! │      │ publishes ProbeSnapshot                               │
//! │      ▼                                                       │
//! │  fan1-ctl / fan2-ctl (100 ms)   ControlLoop::step            │
//! │      │ publishes duty state                                  │
//! │      ▼                                                       │
//! │  diagnostics (1 s)   reads FanHandle + TemperatureView       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info};

use crate::app::ports::ClockPort;
use crate::drivers::task_pin::{self, Core};
use crate::error::Result;

/// Work that repeats for the life of the process.
pub trait PeriodicActivity: Send {
    /// Thread name.
    fn name(&self) -> &'static str;

    /// Target interval between the starts of consecutive steps.
    fn period(&self) -> Duration;

    /// One iteration.  Must not block indefinitely.
    fn step(&mut self);
}

/// Fixed-rate deadline tracker over a wrapping millisecond clock.
///
/// Deadlines advance by exactly one period per step, so a late step does
/// not shift the phase of later ones.  A step that overruns a whole period
/// re-anchors the schedule at "now" instead of firing a burst of catch-up
/// steps.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    period_ms: u32,
    deadline_ms: u32,
}

impl Cadence {
    /// The first step is due immediately.
    pub fn new(period_ms: u32, now_ms: u32) -> Self {
        Self {
            period_ms: period_ms.max(1),
            deadline_ms: now_ms,
        }
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Advance to the next deadline and return how long to sleep for it.
    pub fn advance(&mut self, now_ms: u32) -> u32 {
        let next = self.deadline_ms.wrapping_add(self.period_ms);
        let remaining = next.wrapping_sub(now_ms);
        if remaining > self.period_ms {
            // Already past `next`.
            self.deadline_ms = now_ms;
            0
        } else {
            self.deadline_ms = next;
            remaining
        }
    }
}

struct Registered {
    activity: Box<dyn PeriodicActivity>,
    priority: u8,
    stack_kb: usize,
}

/// Owns the activities until [`Scheduler::start`] hands each one to its
/// own thread.
pub struct Scheduler<C: ClockPort + Clone + Send + 'static> {
    clock: C,
    core: Core,
    activities: Vec<Registered>,
}

impl<C: ClockPort + Clone + Send + 'static> Scheduler<C> {
    pub fn new(clock: C, core: Core) -> Self {
        Self {
            clock,
            core,
            activities: Vec::new(),
        }
    }

    /// Register an activity.  Nothing runs until [`start`](Self::start).
    pub fn add(&mut self, activity: impl PeriodicActivity + 'static, priority: u8, stack_kb: usize) {
        info!(
            "Scheduler: added '{}' every {} ms",
            activity.name(),
            activity.period().as_millis()
        );
        self.activities.push(Registered {
            activity: Box::new(activity),
            priority,
            stack_kb,
        });
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Spawn every activity on its own thread.
    pub fn start(self) -> Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::with_capacity(self.activities.len());
        for registered in self.activities {
            let name = registered.activity.name();
            let clock = self.clock.clone();
            let mut activity = registered.activity;
            let handle = task_pin::spawn_on_core(
                self.core,
                registered.priority,
                registered.stack_kb,
                name,
                move || run_forever(activity.as_mut(), &clock),
            )?;
            handles.push(handle);
        }
        Ok(handles)
    }
}

/// Watch the started activities until every one has exited, checking
/// every `interval`.  Activities never return, so each thread that does
/// finish is logged by name as soon as it is seen.  Returns how many
/// panicked.
pub fn join_all(mut handles: Vec<JoinHandle<()>>, interval: Duration) -> usize {
    let mut panicked = 0;
    while !handles.is_empty() {
        let (finished, running): (Vec<_>, Vec<_>) =
            handles.into_iter().partition(JoinHandle::is_finished);
        for handle in finished {
            let name = handle.thread().name().unwrap_or("<unnamed>").to_owned();
            if handle.join().is_err() {
                error!("{}: activity panicked", name);
                panicked += 1;
            } else {
                error!("{}: activity returned", name);
            }
        }
        handles = running;
        if !handles.is_empty() {
            std::thread::sleep(interval);
        }
    }
    panicked
}

fn run_forever(activity: &mut dyn PeriodicActivity, clock: &impl ClockPort) {
    let period_ms = u32::try_from(activity.period().as_millis()).unwrap_or(u32::MAX);
    let mut cadence = Cadence::new(period_ms, clock.millis());
    loop {
        activity.step();
        let sleep_ms = cadence.advance(clock.millis());
        if sleep_ms == 0 {
            debug!("{}: overran its {} ms period", activity.name(), period_ms);
        }
        std::thread::sleep(Duration::from_millis(u64::from(sleep_ms)));
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
