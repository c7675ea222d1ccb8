use crate::platform::Platform;
use alloc::sync::Arc;
use kestrel_process::Pid;
use kestrel_process::process::Process;
use spin::Mutex;

/// Platform resources owned by one process: exactly one address space,
/// held exclusively until exit releases it.
///
/// The descriptor itself (identity, relationships, exit state) lives in
/// [`kestrel_process::process::Process`]; this record carries what the
/// platform attached to it.
pub struct ProcessData<P: Platform> {
    pub proc: Arc<Process>,
    /// `None` once exit has released the space. Taking it is what makes
    /// the release exactly-once.
    pub space: Mutex<Option<P::Space>>,
}

impl<P: Platform> ProcessData<P> {
    pub fn new(proc: Arc<Process>, space: P::Space) -> Self {
        Self {
            proc,
            space: Mutex::new(Some(space)),
        }
    }

    pub fn pid(&self) -> Pid {
        self.proc.pid()
    }
}
