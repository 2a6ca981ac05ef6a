//! Sync-to-sync/async countdown latch.
//!
//! Each band of a render holds one count; the frame is done when every band has counted down.
//! Waiters may block on the condition variable or await the latch as a future.

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll, Waker},
};

/// A latch that opens once it has been counted down `count` times.
#[derive(Clone)]
pub struct Latch {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    cv: Condvar,
}

struct State {
    remaining: usize,
    wakers: Vec<Waker>,
}

impl Latch {
    pub fn new(count: usize) -> Self {
        Latch {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    remaining: count,
                    wakers: Vec::new(),
                }),
                cv: Condvar::new(),
            }),
        }
    }

    // Poisoning is ignored: every update is a single decrement, so the state is always whole.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts down once; the last count releases all waiters.
    /// Counting down an open latch does nothing.
    pub fn count_down(&self) {
        let mut g = self.lock();
        if g.remaining == 0 {
            return;
        }
        g.remaining -= 1;
        if g.remaining == 0 {
            for w in g.wakers.drain(..) {
                w.wake();
            }
            self.shared.cv.notify_all();
        }
    }

    pub fn remaining(&self) -> usize {
        self.lock().remaining
    }

    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// Blocks until the latch opens.
    pub fn wait(&self) {
        let mut g = self.lock();
        while g.remaining > 0 {
            g = self
                .shared
                .cv
                .wait(g)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// A guard that counts down when dropped, including on unwind.
    pub fn guard(&self) -> CountGuard {
        CountGuard {
            latch: self.clone(),
        }
    }

    /// A future that resolves when the latch opens.
    pub fn completion(&self) -> Completion {
        Completion {
            latch: self.clone(),
        }
    }
}

/// Counts its latch down on drop.
pub struct CountGuard {
    latch: Latch,
}

impl Drop for CountGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}

/// Future side of a [Latch].
pub struct Completion {
    latch: Latch,
}

impl Future for Completion {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut g = self.latch.lock();
        if g.remaining == 0 {
            return Poll::Ready(());
        }
        // Register ourselves:
        if !g.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            g.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
