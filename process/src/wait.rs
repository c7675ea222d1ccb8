use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

/// A handle to one suspendable thread of control, provided by the
/// scheduling service.
///
/// `unpark` before `park` must leave a pending wakeup so that `park`
/// returns immediately; this is what makes the subscribe-then-sleep
/// pattern in [`crate::process::Process::wait_exited`] race-free.
pub trait Parker: Send + Sync {
    /// Suspend the calling thread until [`Parker::unpark`] is called, or
    /// return immediately if a wakeup is already pending. Spurious returns
    /// are allowed; callers re-check their condition under the descriptor
    /// lock. Must only be called from the thread this parker belongs to.
    fn park(&self);

    /// Wake the parked thread, or make its next `park` return immediately.
    fn unpark(&self);
}

/// The condition half of a descriptor's lock/condition pair, announcing
/// the one-way `exited` transition.
///
/// Waiters subscribe while holding the descriptor lock, and the exiting
/// process notifies while holding that same lock, after publishing the
/// exit state. Subscribing therefore either happens before the notify
/// (and gets a wakeup) or after the state is visible (and never sleeps).
pub(crate) struct ExitSignal {
    waiters: Mutex<Vec<Arc<dyn Parker>>>,
}

impl ExitSignal {
    pub(crate) const fn new() -> Self {
        Self {
            waiters: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, parker: Arc<dyn Parker>) {
        self.waiters.lock().push(parker);
    }

    pub(crate) fn notify_all(&self) {
        let waiters = core::mem::take(&mut *self.waiters.lock());
        for waiter in waiters {
            waiter.unpark();
        }
    }
}
