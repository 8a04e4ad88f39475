//! Single-producer, fixed-pool fan-out shared by the copy and scan passes.
//!
//! The producer hands items over a zero-capacity channel, so it blocks until
//! a worker is free to take the next one. The first worker or producer error
//! cancels the whole scope; everything still in flight is abandoned.

use crate::error::Error;
use crossbeam_channel::bounded;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::{trace, warn};

/// Cancellation shared by the producer and all workers of one run.
pub(crate) struct CancelScope {
    external: Arc<AtomicBool>,
    failed: AtomicBool,
    first_error: Mutex<Option<Error>>,
}

impl CancelScope {
    pub(crate) fn new(external: Arc<AtomicBool>) -> Self {
        Self {
            external,
            failed: AtomicBool::new(false),
            first_error: Mutex::new(None),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.failed.load(Ordering::SeqCst) || self.external.load(Ordering::Relaxed)
    }

    /// Record `err` if it is the first one, then cancel.
    pub(crate) fn fail(&self, err: Error) {
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            warn!("Cancelling run: {}", err);
            *slot = Some(err);
        } else {
            trace!("Dropping follow-up error: {}", err);
        }
        drop(slot);
        self.failed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn finish(self) -> Result<(), Error> {
        let first = self
            .first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        match first {
            Some(err) => Err(err),
            None if self.external.load(Ordering::Relaxed) => Err(Error::Cancelled),
            None => Ok(()),
        }
    }
}

/// Run `produce` on its own thread and `work` on `workers` threads.
///
/// `produce` receives an emit function that blocks until a worker takes the
/// item and returns `Break` once the run is cancelled. Workers check for
/// cancellation between items. Returns after every thread has exited, with
/// the first error seen, or [`Error::Cancelled`] when the external token was
/// set.
pub(crate) fn fan_out<T, P, W>(
    workers: usize,
    cancel: &Arc<AtomicBool>,
    produce: P,
    work: W,
) -> Result<(), Error>
where
    T: Send,
    P: FnOnce(&mut dyn FnMut(T) -> ControlFlow<()>) -> Result<(), Error> + Send,
    W: Fn(T) -> Result<(), Error> + Sync,
{
    let scope = CancelScope::new(Arc::clone(cancel));
    let (tx, rx) = bounded::<T>(0);

    thread::scope(|s| {
        for worker_id in 0..workers.max(1) {
            let rx = rx.clone();
            let work = &work;
            let scope = &scope;
            s.spawn(move || {
                for item in rx.iter() {
                    if scope.is_cancelled() {
                        break;
                    }
                    if let Err(err) = work(item) {
                        scope.fail(err);
                        break;
                    }
                }
                trace!("Worker {} exiting", worker_id);
            });
        }
        // Only worker clones remain, so a send fails once they have all quit.
        drop(rx);

        let scope = &scope;
        s.spawn(move || {
            let mut emit = |item: T| {
                if scope.is_cancelled() {
                    return ControlFlow::Break(());
                }
                match tx.send(item) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(_) => ControlFlow::Break(()),
                }
            };
            if let Err(err) = produce(&mut emit) {
                scope.fail(err);
            }
        });
    });

    scope.finish()
}
