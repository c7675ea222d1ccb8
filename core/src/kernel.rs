use crate::platform::Platform;
use crate::process::ProcessData;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use kestrel_process::Pid;
use kestrel_process::table::ProcessTable;
use spin::Mutex;

/// Handle bundling the platform services, the process registry, and the
/// per-process resource table.
///
/// There is no ambient global kernel; callers hold an `Arc<Kernel<_>>`
/// and pass it down, and several independent instances can coexist.
pub struct Kernel<P: Platform> {
    pub platform: P,
    pub table: ProcessTable,
    data: Mutex<BTreeMap<Pid, Arc<ProcessData<P>>>>,
}

impl<P: Platform> Kernel<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            table: ProcessTable::new(),
            data: Mutex::new(BTreeMap::new()),
        }
    }

    /// Attach resource data to a freshly created process.
    pub fn register_data(&self, data: &Arc<ProcessData<P>>) {
        let prev = self.data.lock().insert(data.pid(), data.clone());
        assert!(
            prev.is_none(),
            "process {} already has resource data",
            data.pid()
        );
    }

    pub fn remove_data(&self, pid: Pid) -> Option<Arc<ProcessData<P>>> {
        trace!("dropping resource data of process {}", pid);
        self.data.lock().remove(&pid)
    }

    pub fn get_process_data(&self, pid: Pid) -> Option<Arc<ProcessData<P>>> {
        self.data.lock().get(&pid).cloned()
    }
}
