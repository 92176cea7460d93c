//! Owned set of cancellable timers for one playback session.
//!
//! Every delayed action of a session (the driver loop, read receipts, overlay
//! dismissal) is spawned through the arena. Once [`TimerArena::cancel_all`]
//! has run, outstanding timers are aborted and no new ones can be registered.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// The entry-by-entry reveal loop
    Driver,
    ReadReceipt,
    OverlayDismiss,
}

#[derive(Debug)]
struct Timer {
    kind: TimerKind,
    handle: AbortHandle,
}

#[derive(Debug, Default)]
struct ArenaInner {
    cancelled: bool,
    timers: Vec<Timer>,
}

#[derive(Debug, Default)]
pub struct TimerArena {
    inner: Mutex<ArenaInner>,
}

impl TimerArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task owned by the arena.
    ///
    /// Returns `false` (and spawns nothing) once the arena is cancelled.
    /// Must be called from within a tokio runtime.
    pub fn spawn_task<F>(&self, kind: TimerKind, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if inner.cancelled {
            return false;
        }
        inner.timers.retain(|t| !t.handle.is_finished());

        let handle = tokio::spawn(task).abort_handle();
        inner.timers.push(Timer { kind, handle });
        true
    }

    /// Run `action` once after `delay`, unless cancelled first.
    pub fn spawn_after<F>(&self, kind: TimerKind, delay: Duration, action: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn_task(kind, async move {
            tokio::time::sleep(delay).await;
            action();
        })
    }

    /// Abort every outstanding timer and refuse new ones.
    ///
    /// Returns how many timers were still pending.
    pub fn cancel_all(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.cancelled = true;

        let mut pending = 0;
        for timer in inner.timers.drain(..) {
            if !timer.handle.is_finished() {
                pending += 1;
                timer.handle.abort();
            }
        }
        pending
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// Timers that have not fired yet
    pub fn outstanding(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.timers.retain(|t| !t.handle.is_finished());
        inner.timers.len()
    }

    pub fn outstanding_of(&self, kind: TimerKind) -> usize {
        let mut inner = self.inner.lock();
        inner.timers.retain(|t| !t.handle.is_finished());
        inner.timers.iter().filter(|t| t.kind == kind).count()
    }
}

impl Drop for TimerArena {
    fn drop(&mut self) {
        for timer in self.inner.get_mut().timers.drain(..) {
            timer.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once() {
        let arena = TimerArena::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        assert!(arena.spawn_after(TimerKind::ReadReceipt, Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(arena.outstanding_of(TimerKind::ReadReceipt), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(arena.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_prevents_firing() {
        let arena = TimerArena::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for kind in [TimerKind::ReadReceipt, TimerKind::OverlayDismiss] {
            let counter = fired.clone();
            arena.spawn_after(kind, Duration::from_millis(100), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(arena.cancel_all(), 2);
        assert!(arena.is_cancelled());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(arena.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_arena_refuses_new_timers() {
        let arena = TimerArena::new();
        arena.cancel_all();

        let spawned = arena.spawn_after(TimerKind::OverlayDismiss, Duration::from_millis(1), || {
            panic!("must never run");
        });
        assert!(!spawned);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
