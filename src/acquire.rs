//! Bounded acquisition under contention.
//!
//! One immediate attempt, then a fixed-interval poll until a deadline. Only
//! logical contention is retried; a transport failure anywhere in the
//! sequence is fatal.

use std::time::Duration;

use crate::api::{AcquireOutcome, LockResult, MutexService};
use crate::error::Error;
use crate::pacer::Pacer;
use crate::trace;

/// Base wait between acquisition retries, capped by the remaining budget.
const BASE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Everything one acquisition sequence needs. Built once from parsed input
/// and passed by reference; nothing here outlives the sequence.
#[derive(Debug, Clone)]
pub struct LockRequest {
    pub name: String,
    pub owner: Option<String>,
    pub timeout: Duration,
}

/// Tries to take the named mutex, polling while it is contended.
///
/// The first attempt is issued immediately. On contention with a zero
/// timeout this fails right away; otherwise the deadline is fixed at
/// `now + timeout` and the loop sleeps `min(5s, timeout)` between attempts.
/// The deadline is checked strictly before issuing a request, never
/// mid-sleep: an attempt started before the deadline may complete after it,
/// but no new attempt starts once the deadline has passed.
pub fn acquire<S: MutexService, P: Pacer>(
    service: &S,
    request: &LockRequest,
    pacer: &mut P,
) -> Result<LockResult, Error> {
    match service.acquire(&request.name, request.owner.as_deref())? {
        AcquireOutcome::Acquired(result) => return Ok(result),
        AcquireOutcome::Contended => {}
    }

    if request.timeout.is_zero() {
        return Err(Error::LockUnavailable);
    }

    let deadline = pacer.now() + request.timeout;
    let poll_interval = request.timeout.min(BASE_POLL_INTERVAL);
    trace::trace(&format!(
        "Mutex `{}` is locked, retrying for up to {:?}",
        request.name, request.timeout
    ));

    loop {
        trace::trace(&format!("Sleeping for {poll_interval:?}"));
        pacer.sleep(poll_interval);

        if pacer.now() > deadline {
            return Err(Error::AcquisitionTimeout);
        }

        match service.acquire(&request.name, request.owner.as_deref())? {
            AcquireOutcome::Acquired(result) => {
                trace::trace(&format!("Lock successful for name `{}`", request.name));
                return Ok(result);
            }
            AcquireOutcome::Contended => {
                trace::trace(&format!("Mutex `{}` still in use", request.name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedService, Step, VirtualPacer};

    const BODY: &str = r#"{"Token":"abc123","ExpiresAt":"2024-01-01T00:00:00Z"}"#;

    fn request(timeout_secs: u64) -> LockRequest {
        LockRequest {
            name: "build".to_string(),
            owner: None,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    #[test]
    fn immediate_success_makes_exactly_one_call() {
        let service = ScriptedService::new();
        service.script_acquire([Step::Grant(BODY)]);
        let mut pacer = VirtualPacer::new();

        let result = acquire(&service, &request(30), &mut pacer).unwrap();

        assert_eq!(result.raw, BODY);
        assert_eq!(service.acquire_calls(), 1);
        assert!(pacer.slept.is_empty());
    }

    #[test]
    fn contended_with_zero_timeout_fails_without_waiting() {
        let service = ScriptedService::new();
        service.script_acquire([Step::Busy]);
        let mut pacer = VirtualPacer::new();

        let err = acquire(&service, &request(0), &mut pacer).unwrap_err();

        assert!(matches!(err, Error::LockUnavailable));
        assert_eq!(service.acquire_calls(), 1);
        assert!(pacer.slept.is_empty());
    }

    #[test]
    fn polls_until_the_lock_frees_up() {
        // Contended until the third call: two full 5s sleeps, then the
        // attempt at t=10s succeeds inside the 12s budget.
        let service = ScriptedService::new();
        service.script_acquire([Step::Busy, Step::Busy, Step::Grant(BODY)]);
        let mut pacer = VirtualPacer::new();

        let result = acquire(&service, &request(12), &mut pacer).unwrap();

        assert_eq!(result.raw, BODY);
        assert_eq!(service.acquire_calls(), 3);
        assert_eq!(
            pacer.slept,
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
    }

    #[test]
    fn times_out_after_the_budget_is_spent() {
        // floor(12 / 5) + 1 = 3 attempts; the timeout fires at t=15s,
        // strictly after the 12s budget has elapsed.
        let service = ScriptedService::new();
        service.script_acquire([Step::Busy, Step::Busy, Step::Busy]);
        let mut pacer = VirtualPacer::new();

        let err = acquire(&service, &request(12), &mut pacer).unwrap_err();

        assert!(matches!(err, Error::AcquisitionTimeout));
        assert_eq!(service.acquire_calls(), 3);
        assert_eq!(pacer.slept.len(), 3);
    }

    #[test]
    fn short_timeouts_shrink_the_poll_interval() {
        // timeout < 5s: the interval collapses to the whole budget, giving
        // floor(3 / 3) + 1 = 2 attempts.
        let service = ScriptedService::new();
        service.script_acquire([Step::Busy, Step::Busy]);
        let mut pacer = VirtualPacer::new();

        let err = acquire(&service, &request(3), &mut pacer).unwrap_err();

        assert!(matches!(err, Error::AcquisitionTimeout));
        assert_eq!(service.acquire_calls(), 2);
        assert_eq!(
            pacer.slept,
            vec![Duration::from_secs(3), Duration::from_secs(3)]
        );
    }

    #[test]
    fn transport_failure_is_fatal_mid_poll() {
        let service = ScriptedService::new();
        service.script_acquire([Step::Busy, Step::Fail]);
        let mut pacer = VirtualPacer::new();

        let err = acquire(&service, &request(30), &mut pacer).unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(service.acquire_calls(), 2);
    }

    #[test]
    fn transport_failure_on_the_first_attempt_is_fatal() {
        let service = ScriptedService::new();
        service.script_acquire([Step::Fail]);
        let mut pacer = VirtualPacer::new();

        let err = acquire(&service, &request(30), &mut pacer).unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(service.acquire_calls(), 1);
        assert!(pacer.slept.is_empty());
    }
}
