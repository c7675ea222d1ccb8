use crate::Pid;
use crate::process::Process;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};
use spin::Mutex;

/// The process registry: allocates unique identifiers and supports
/// identifier-keyed lookup.
///
/// Internally synchronized, independent of any descriptor's lock; the
/// registry lock is a leaf and is never held across calls into a
/// descriptor. Registration and removal are driven by the lifecycle
/// protocol in [`crate::process`]; no exit or wait logic lives here.
pub struct ProcessTable {
    next_pid: AtomicU32,
    procs: Mutex<BTreeMap<Pid, Arc<Process>>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            next_pid: AtomicU32::new(1),
            procs: Mutex::new(BTreeMap::new()),
        }
    }

    /// Allocate a fresh process identifier. Monotonic; uniqueness needs
    /// only atomicity.
    pub fn allocate_pid(&self) -> Pid {
        self.next_pid.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn insert(&self, process: &Arc<Process>) {
        let prev = self.procs.lock().insert(process.pid(), process.clone());
        assert!(
            prev.is_none(),
            "[process] process with id {} already exists",
            process.pid()
        );
    }

    pub(crate) fn remove(&self, pid: Pid) -> Option<Arc<Process>> {
        self.procs.lock().remove(&pid)
    }

    pub fn get(&self, pid: Pid) -> Option<Arc<Process>> {
        self.procs.lock().get(&pid).cloned()
    }

    /// Number of descriptors not yet destroyed, zombies included.
    pub fn len(&self) -> usize {
        self.procs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.lock().is_empty()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
