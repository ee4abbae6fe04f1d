//! Countdown completion barrier
//!
//! The orchestrating task waits on the barrier until every chapter task has
//! signaled completion. Each task holds a [`CompletionToken`]; consuming it
//! signals once, and dropping it unconsumed (early return, panic) signals as
//! well, so a book crawl can never hang on a lost signal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Blocks until `count` completion signals have been received
#[derive(Debug)]
pub struct CompletionBarrier {
    remaining: AtomicUsize,
    signalled: AtomicUsize,
    notify: Notify,
}

impl CompletionBarrier {
    /// Creates a barrier expecting `count` signals
    pub fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(count),
            signalled: AtomicUsize::new(0),
            notify: Notify::new(),
        })
    }

    /// Hands out a token for one worker
    pub fn token(self: &Arc<Self>) -> CompletionToken {
        CompletionToken {
            barrier: Some(Arc::clone(self)),
        }
    }

    /// Number of signals still expected
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Number of signals received so far
    pub fn signalled(&self) -> usize {
        self.signalled.load(Ordering::Acquire)
    }

    fn signal_done(&self) {
        self.signalled.fetch_add(1, Ordering::AcqRel);

        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.notify.notify_waiters(),
            Ok(_) => {}
            Err(_) => tracing::warn!("Completion barrier signaled more times than expected"),
        }
    }

    /// Waits until every expected signal has arrived
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a signal between the check and the
            // await is not lost
            notified.as_mut().enable();

            if self.remaining() == 0 {
                return;
            }

            notified.await;
        }
    }
}

/// One worker's right to signal the barrier exactly once
#[derive(Debug)]
#[must_use = "dropping a token signals completion immediately"]
pub struct CompletionToken {
    barrier: Option<Arc<CompletionBarrier>>,
}

impl CompletionToken {
    /// Signals completion, consuming the token
    pub fn signal_done(mut self) {
        if let Some(barrier) = self.barrier.take() {
            barrier.signal_done();
        }
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        if let Some(barrier) = self.barrier.take() {
            barrier.signal_done();
        }
    }
}
