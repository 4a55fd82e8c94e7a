//! Fixed-period tick loop
//!
//! The scheduler calls [`SessionController::tick`] once per period and then
//! sleeps for whatever is left of that period. A tick that runs a whole
//! capture session overruns its period by tens of seconds; the next tick
//! simply starts immediately afterwards, without trying to catch up.
//!
//! Elapsed time is measured with `std::time::Instant` for monotonic
//! guarantees. Sleeping goes through [`Clock`] so tests never block.

use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::primitives::TerminationKind;
use crate::session::{SessionController, TickOutcome};

/// Wall time and blocking sleeps.
pub trait Clock {
    /// Local wall-clock time, used to stamp sessions.
    fn now(&self) -> DateTime<Local>;

    /// Block the control thread.
    fn sleep(&self, duration: Duration);
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How a scheduler run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks executed, including the terminating one.
    pub ticks: u64,

    /// `None` when the tick budget ran out first.
    pub termination: Option<TerminationKind>,
}

/// Drives a [`SessionController`] at a fixed period.
pub struct TickScheduler {
    period: Duration,
    clock: Rc<dyn Clock>,
    max_ticks: Option<u64>,
}

impl TickScheduler {
    pub fn new(period: Duration, clock: Rc<dyn Clock>) -> Self {
        Self {
            period,
            clock,
            max_ticks: None,
        }
    }

    /// Stop after `ticks` ticks even if the booth never terminates.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Run until the controller terminates or the tick budget is spent.
    pub fn run(&self, controller: &mut SessionController) -> RunSummary {
        info!("tick loop started ({}ms period)", self.period.as_millis());
        let mut ticks = 0u64;

        loop {
            if self.max_ticks.is_some_and(|max| ticks >= max) {
                info!("tick budget of {} spent, stopping", ticks);
                return RunSummary {
                    ticks,
                    termination: None,
                };
            }

            let started = Instant::now();
            let outcome = controller.tick();
            ticks += 1;

            if let TickOutcome::Terminated(kind) = outcome {
                info!("tick loop finished after {} ticks ({})", ticks, kind);
                return RunSummary {
                    ticks,
                    termination: Some(kind),
                };
            }

            let elapsed = started.elapsed();
            match self.period.checked_sub(elapsed) {
                Some(remaining) => self.clock.sleep(remaining),
                None => debug!(
                    "tick {} overran period by {}ms",
                    ticks,
                    (elapsed - self.period).as_millis()
                ),
            }
        }
    }
}
