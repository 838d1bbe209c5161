//! Thread-backed promise over one in-flight panel call.
//!
//! Constructing a [`Promise`] starts its producer on a dedicated thread
//! right away. Any number of observers may then block on [`Promise::get`],
//! attach continuations with [`Promise::then`] / [`Promise::catch`], or
//! clone the handle across threads; every observer sees the same single
//! resolution.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::error::{CallError, Outcome};

static NEXT_PROMISE_ID: AtomicU64 = AtomicU64::new(1);

/// Shared resolution record: cached outcome plus its broadcast signal.
///
/// The outcome is written exactly once, by the producer thread, under the
/// mutex; readers confirm it is present under the same mutex before cloning
/// it out. Waiters park on the condvar and are woken all at once.
struct Shared<T> {
    outcome: Mutex<Option<Outcome<T>>>,
    done: Condvar,
}

impl<T: Clone> Shared<T> {
    fn resolve(&self, id: u64, outcome: Outcome<T>) {
        let mut slot = self.outcome.lock();
        if slot.is_some() {
            // Single-writer lifecycle; a second resolution is a bug upstream.
            warn!(id, "promise already resolved, keeping first outcome");
            return;
        }
        debug!(id, ok = outcome.is_ok(), "promise resolved");
        *slot = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> Outcome<T> {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut slot);
        }
    }
}

/// Handle to the eventual outcome of one panel call.
///
/// Cloned handles observe the same resolution. Dropping every handle never
/// cancels the call: the producer always runs to completion.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
    id: u64,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            id: self.id,
        }
    }
}

impl<T> Promise<T>
where
    T: Clone + Send + 'static,
{
    /// Starts `producer` on its own thread and returns the pending handle.
    ///
    /// Construction never blocks and never fails. A producer that panics
    /// resolves the promise to [`CallError::ProducerFaulted`] instead of
    /// unwinding into the caller; the same applies when the OS refuses to
    /// spawn the producer thread, so no waiter can hang on a call that will
    /// never run.
    pub fn new<F>(producer: F) -> Self
    where
        F: FnOnce() -> Outcome<T> + Send + 'static,
    {
        let id = NEXT_PROMISE_ID.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(Shared {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        });
        debug!(id, "promise created");

        let worker = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name(format!("outpost-call-{id}"))
            .spawn(move || {
                trace!(id, "producer started");
                let outcome = match panic::catch_unwind(AssertUnwindSafe(producer)) {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(CallError::ProducerFaulted(panic_message(payload))),
                };
                worker.resolve(id, outcome);
            });

        if let Err(e) = spawned {
            warn!(id, error = %e, "failed to spawn producer thread");
            shared.resolve(id, Err(CallError::ProducerFaulted(format!("spawn failed: {e}"))));
        }

        Self { shared, id }
    }

    /// Blocks until the call resolves, then returns its outcome.
    ///
    /// Safe to call any number of times, from any thread, before or after
    /// resolution; every call returns a clone of the same cached outcome.
    pub fn get(&self) -> Outcome<T> {
        trace!(id = self.id, "waiting on promise");
        self.shared.wait()
    }

    /// Runs `continuation` with the resolved value on a consumer thread.
    ///
    /// Skipped entirely when the call resolves to an error. Attaching after
    /// resolution still runs the continuation, asynchronously. Returns the
    /// same promise so attachments can be chained.
    pub fn then<F>(&self, continuation: F) -> &Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        let worker = Arc::clone(&self.shared);
        let id = self.id;
        let spawned = thread::Builder::new()
            .name(format!("outpost-then-{id}"))
            .spawn(move || {
                if let Ok(value) = worker.wait() {
                    continuation(value);
                }
            });
        if let Err(e) = spawned {
            warn!(id, error = %e, "failed to spawn consumer thread, continuation dropped");
        }
        self
    }

    /// Runs `handler` with the resolved error on a consumer thread.
    ///
    /// The mirror of [`Promise::then`]: skipped entirely when the call
    /// resolves to a value.
    pub fn catch<F>(&self, handler: F) -> &Self
    where
        F: FnOnce(CallError) + Send + 'static,
    {
        let worker = Arc::clone(&self.shared);
        let id = self.id;
        let spawned = thread::Builder::new()
            .name(format!("outpost-catch-{id}"))
            .spawn(move || {
                if let Err(err) = worker.wait() {
                    handler(err);
                }
            });
        if let Err(e) = spawned {
            warn!(id, error = %e, "failed to spawn consumer thread, handler dropped");
        }
        self
    }
}

/// Best-effort extraction of a panic payload's message.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    #[test]
    fn test_get_returns_producer_value() {
        let p = Promise::new(|| Ok(42u32));
        assert_eq!(p.get(), Ok(42));
    }

    #[test]
    fn test_producer_runs_exactly_once_across_repeated_gets() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let p = Promise::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok("done".to_string())
        });
        for _ in 0..10 {
            assert_eq!(p.get(), Ok("done".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_blocks_until_resolution() {
        let p = Promise::new(|| {
            thread::sleep(Duration::from_millis(50));
            Ok(7u8)
        });
        let started = Instant::now();
        assert_eq!(p.get(), Ok(7));
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_error_outcome_surfaces_through_get() {
        let p: Promise<u32> =
            Promise::new(|| Err(CallError::RemoteCallFailed("panel offline".into())));
        assert_eq!(
            p.get(),
            Err(CallError::RemoteCallFailed("panel offline".into()))
        );
    }

    #[test]
    fn test_many_waiters_wake_on_one_resolution() {
        let p = Promise::new(|| {
            thread::sleep(Duration::from_millis(30));
            Ok(9u32)
        });
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let observer = p.clone();
                thread::spawn(move || observer.get())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(9));
        }
    }

    #[test]
    fn test_three_observers_all_see_resolution() {
        let p = Promise::new(|| {
            thread::sleep(Duration::from_millis(20));
            Ok(5i32)
        });
        let (value_tx, value_rx) = mpsc::channel();
        let (error_tx, error_rx) = mpsc::channel();
        p.then(move |v| {
            let _ = value_tx.send(v);
        })
        .catch(move |e| {
            let _ = error_tx.send(e);
        });

        assert_eq!(p.get(), Ok(5));
        assert_eq!(value_rx.recv_timeout(Duration::from_secs(2)), Ok(5));
        // Give the catch consumer time to observe the value and exit.
        thread::sleep(Duration::from_millis(50));
        assert!(error_rx.try_recv().is_err());
    }

    #[test]
    fn test_catch_fires_and_then_skips_on_error() {
        let p: Promise<i32> =
            Promise::new(|| Err(CallError::RemoteCallFailed("boom".into())));
        let (value_tx, value_rx) = mpsc::channel();
        let (error_tx, error_rx) = mpsc::channel();
        p.then(move |v| {
            let _ = value_tx.send(v);
        })
        .catch(move |e| {
            let _ = error_tx.send(e);
        });

        let err = error_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(err, CallError::RemoteCallFailed("boom".into()));
        thread::sleep(Duration::from_millis(50));
        assert!(value_rx.try_recv().is_err());
    }

    #[test]
    fn test_then_attached_after_resolution_still_runs() {
        let p = Promise::new(|| Ok(1u64));
        assert_eq!(p.get(), Ok(1));

        let (tx, rx) = mpsc::channel();
        p.then(move |v| {
            let _ = tx.send(v);
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(1));
    }

    #[test]
    fn test_panicking_producer_faults() {
        let p: Promise<u32> = Promise::new(|| panic!("exploded mid-call"));
        match p.get() {
            Err(CallError::ProducerFaulted(msg)) => assert!(msg.contains("exploded mid-call")),
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_panic_with_formatted_message_is_captured() {
        let instance = "alpha";
        let p: Promise<u32> = Promise::new(move || panic!("no route to {instance}"));
        match p.get() {
            Err(CallError::ProducerFaulted(msg)) => assert!(msg.contains("no route to alpha")),
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_non_string_panic_payload_is_still_captured() {
        let p: Promise<u32> = Promise::new(|| std::panic::panic_any(1234i64));
        assert_eq!(
            p.get(),
            Err(CallError::ProducerFaulted("unknown panic payload".to_string()))
        );
    }

    #[test]
    fn test_cloned_handles_share_resolution() {
        let p = Promise::new(|| {
            thread::sleep(Duration::from_millis(10));
            Ok(String::from("shared"))
        });
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let observer = p.clone();
                thread::spawn(move || observer.get())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(String::from("shared")));
        }
        assert_eq!(p.get(), Ok(String::from("shared")));
    }
}
