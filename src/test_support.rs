use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::api::{AcquireOutcome, LockResult, MutexService, RefreshOutcome};
use crate::error::Error;
use crate::pacer::Pacer;

/// Pacer over a fake clock: sleeping advances virtual time instantly and the
/// requested durations are recorded for assertion.
pub(crate) struct VirtualPacer {
    start: Instant,
    elapsed: Duration,
    pub(crate) slept: Vec<Duration>,
}

impl VirtualPacer {
    pub(crate) fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Duration::ZERO,
            slept: Vec::new(),
        }
    }
}

impl Pacer for VirtualPacer {
    fn now(&self) -> Instant {
        self.start + self.elapsed
    }

    fn sleep(&mut self, duration: Duration) {
        self.slept.push(duration);
        self.elapsed += duration;
    }
}

/// One scripted service response.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    /// HTTP 200 with the given body.
    Grant(&'static str),
    /// Non-success status: contention for acquire, denial for refresh.
    Busy,
    /// Connection-level failure.
    Fail,
}

/// Service whose acquire/refresh responses follow a preset script. Calls
/// beyond the script panic, so a test also pins the exact number of
/// requests the code under test is allowed to make.
pub(crate) struct ScriptedService {
    acquire_steps: RefCell<VecDeque<Step>>,
    refresh_steps: RefCell<VecDeque<Step>>,
    acquire_calls: RefCell<usize>,
    refresh_calls: RefCell<usize>,
    pub(crate) release_calls: RefCell<Vec<(String, String)>>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self {
            acquire_steps: RefCell::new(VecDeque::new()),
            refresh_steps: RefCell::new(VecDeque::new()),
            acquire_calls: RefCell::new(0),
            refresh_calls: RefCell::new(0),
            release_calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn script_acquire(&self, steps: impl IntoIterator<Item = Step>) {
        self.acquire_steps.borrow_mut().extend(steps);
    }

    pub(crate) fn script_refresh(&self, steps: impl IntoIterator<Item = Step>) {
        self.refresh_steps.borrow_mut().extend(steps);
    }

    pub(crate) fn acquire_calls(&self) -> usize {
        *self.acquire_calls.borrow()
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        *self.refresh_calls.borrow()
    }
}

impl MutexService for ScriptedService {
    fn acquire(&self, _name: &str, _owner: Option<&str>) -> Result<AcquireOutcome, Error> {
        *self.acquire_calls.borrow_mut() += 1;
        let step = self
            .acquire_steps
            .borrow_mut()
            .pop_front()
            .expect("acquire called more often than scripted");
        match step {
            Step::Grant(body) => Ok(AcquireOutcome::Acquired(LockResult {
                raw: body.to_string(),
            })),
            Step::Busy => Ok(AcquireOutcome::Contended),
            Step::Fail => Err(Error::Transport("connection refused".to_string())),
        }
    }

    fn inspect(&self, _name: &str) -> Result<String, Error> {
        unimplemented!("inspect is not scripted")
    }

    fn refresh(&self, _name: &str, _token: &str) -> Result<RefreshOutcome, Error> {
        *self.refresh_calls.borrow_mut() += 1;
        let step = self
            .refresh_steps
            .borrow_mut()
            .pop_front()
            .expect("refresh called more often than scripted");
        match step {
            Step::Grant(body) => Ok(RefreshOutcome::Refreshed(LockResult {
                raw: body.to_string(),
            })),
            Step::Busy => Ok(RefreshOutcome::Denied("denied".to_string())),
            Step::Fail => Err(Error::Transport("connection refused".to_string())),
        }
    }

    fn release(&self, name: &str, token: &str) -> Result<String, Error> {
        self.release_calls
            .borrow_mut()
            .push((name.to_string(), token.to_string()));
        Ok("Mutex released".to_string())
    }
}
