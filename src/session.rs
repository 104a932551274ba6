//! The held-lock session: keep-alive loop plus release coordinator.
//!
//! After a successful acquisition the process settles into two concurrent
//! paths sharing only the immutable `(name, token)` pair: the foreground
//! loop refreshing the lock every five seconds, and a signal handler that
//! releases the lock exactly once when the process is asked to stop.
//! Whichever path reaches its terminal state first decides the exit; the
//! other path's in-flight call, if any, is discarded with the process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::api::{MutexService, RefreshOutcome};
use crate::error::Error;
use crate::pacer::{Pacer, SystemPacer};
use crate::trace;

/// Cadence of the keep-alive loop. Refreshes are strictly serialized: a new
/// one is never issued before the previous call has returned.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// The one live lock episode of this process. Written exactly once, before
/// the keep-alive loop and the release coordinator start; both only read it.
#[derive(Debug, Clone)]
pub struct Session {
    pub name: String,
    pub token: String,
}

/// Refreshes the lock at a fixed cadence until the service says no.
///
/// Each granted refresh's payload is handed to `emit` (the CLI prints it to
/// stdout). Returns the terminal condition (a denied refresh or a transport
/// failure) instead of exiting, so the termination rules are testable; the
/// caller turns the returned error into the process exit.
pub fn keep_alive<S: MutexService, P: Pacer>(
    service: &S,
    session: &Session,
    pacer: &mut P,
    mut emit: impl FnMut(&str),
) -> Error {
    loop {
        trace::trace(&format!("Sleeping for {REFRESH_INTERVAL:?}"));
        pacer.sleep(REFRESH_INTERVAL);

        match service.refresh(&session.name, &session.token) {
            Ok(RefreshOutcome::Refreshed(result)) => emit(&result.raw),
            Ok(RefreshOutcome::Denied(_)) => return Error::RefreshDenied,
            Err(err) => return err,
        }
    }
}

/// Issues the one release call of this process, or nothing at all.
///
/// The first caller wins the `fired` flag and performs the release; every
/// later call observes the flag and returns `None`. A second termination
/// request therefore cannot trigger a second release.
pub fn release_once<S: MutexService>(
    service: &S,
    session: &Session,
    fired: &AtomicBool,
) -> Option<Result<String, Error>> {
    if fired.swap(true, Ordering::SeqCst) {
        return None;
    }
    Some(service.release(&session.name, &session.token))
}

/// Runs the full held-lock session and only returns its terminal error.
///
/// Installs the release coordinator (interrupt and termination signals),
/// then blocks in the keep-alive loop. On the first signal the handler
/// releases the lock, prints the service's response to stderr and exits 1
/// without waiting for a refresh that may be in flight. If the keep-alive
/// loop terminates first, the caller exits and any in-flight release is
/// abandoned with the process.
pub fn hold<S>(service: S, session: Session) -> Error
where
    S: MutexService + Clone + Send + Sync + 'static,
{
    let fired = Arc::new(AtomicBool::new(false));
    {
        let service = service.clone();
        let session = session.clone();
        let fired = Arc::clone(&fired);
        let _ = ctrlc::set_handler(move || {
            trace::trace("Received termination signal");
            let Some(outcome) = release_once(&service, &session, &fired) else {
                return;
            };
            match outcome {
                Ok(body) => eprintln!("{body}"),
                Err(err) => eprintln!("{err}"),
            }
            std::process::exit(1);
        });
    }

    keep_alive(&service, &session, &mut SystemPacer, |body| {
        println!("{body}")
    })
}
