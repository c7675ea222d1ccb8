use crate::Pid;
use crate::table::ProcessTable;
use crate::wait::{ExitSignal, Parker};
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use spin::{Mutex, MutexGuard};

/// What [`Process::exit`] decided about the exiting descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// A live parent remains; the descriptor stays allocated as a zombie
    /// until that parent reaps it.
    AwaitReap,
    /// No parent is left; the descriptor destroyed itself.
    Destroyed,
}

/// Mutable descriptor state, guarded by the descriptor's own lock.
///
/// `parent` and `children` both live under this lock so that the exit
/// disposition of a parent and the exit of one of its children serialize
/// per child: whichever runs second sees the other's decision.
struct ProcessInner {
    parent: Weak<Process>,
    /// Children in creation order. Membership is removed exactly once,
    /// by reap or by this process's own exit.
    children: Vec<Arc<Process>>,
    /// One-way transition; `exit_code` is meaningful only once this is set.
    exited: bool,
    exit_code: i32,
}

/// One process: identity, relationship links, exit state, and the
/// lock/condition pair used to announce the exit transition.
pub struct Process {
    pid: Pid,
    inner: Mutex<ProcessInner>,
    exit_signal: ExitSignal,
}

impl Process {
    fn new(pid: Pid, parent: Weak<Process>) -> Arc<Self> {
        Arc::new(Self {
            pid,
            inner: Mutex::new(ProcessInner {
                parent,
                children: Vec::new(),
                exited: false,
                exit_code: 0,
            }),
            exit_signal: ExitSignal::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ProcessInner> {
        self.inner.lock()
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn parent(&self) -> Option<Arc<Process>> {
        self.lock().parent.upgrade()
    }

    pub fn children(&self) -> Vec<Arc<Process>> {
        self.lock().children.clone()
    }

    /// Look up a direct child by pid under a short-held lock.
    pub fn child(&self, pid: Pid) -> Option<Arc<Process>> {
        self.lock().children.iter().find(|c| c.pid == pid).cloned()
    }

    pub fn is_zombie(&self) -> bool {
        self.lock().exited
    }

    /// The status published by exit. Calling this on a live process is a
    /// protocol bug.
    pub fn exit_code(&self) -> i32 {
        let inner = self.lock();
        assert!(
            inner.exited,
            "[process] process {} has not exited",
            self.pid
        );
        inner.exit_code
    }

    /// Block until this process has exited, then return its exit code.
    ///
    /// Returns without sleeping if the transition already happened; a
    /// caller that never blocks observes the same code as one that was
    /// woken, because code and flag are published together under the
    /// descriptor lock before the signal fires.
    pub fn wait_exited(&self, parker: &Arc<dyn Parker>) -> i32 {
        loop {
            let inner = self.lock();
            if inner.exited {
                return inner.exit_code;
            }
            self.exit_signal.subscribe(parker.clone());
            drop(inner);
            parker.park();
        }
    }

    /// Resolve this process's relationships and publish its exit state.
    ///
    /// Children are disposed of back to front: an exited, unreaped child
    /// has no one left to reap it and is destroyed on the spot; a live
    /// child is orphaned and will destroy itself on its own later exit.
    /// The caller must have released the process's resources already;
    /// from the waiting parent's point of view the signaled exit is the
    /// last thing that happens.
    pub fn exit(self: &Arc<Self>, table: &ProcessTable, exit_code: i32) -> ExitOutcome {
        let mut inner = self.lock();
        assert!(
            !inner.exited,
            "[process] process {} is already exited",
            self.pid
        );

        while let Some(child) = inner.children.pop() {
            let mut child_inner = child.lock();
            if child_inner.exited {
                drop(child_inner);
                table.remove(child.pid);
            } else {
                child_inner.parent = Weak::new();
            }
        }

        inner.exited = true;
        inner.exit_code = exit_code;
        // Publish before waking; waiters re-check under this lock.
        self.exit_signal.notify_all();
        let reapable = inner.parent.upgrade().is_some();
        drop(inner);

        if reapable {
            ExitOutcome::AwaitReap
        } else {
            // Nothing will ever wait on an orphan.
            table.remove(self.pid);
            ExitOutcome::Destroyed
        }
    }

    /// Consume an exited child: unlink it from `children` and destroy its
    /// descriptor. Returns `None` if the child is gone already (a
    /// concurrent wait won the race). Reaping a live child is a protocol
    /// bug.
    pub fn reap_child(&self, pid: Pid, table: &ProcessTable) -> Option<Arc<Process>> {
        let child = self.unlink_child(pid)?;
        assert!(
            child.is_zombie(),
            "[process] reaping process {} before it exited",
            pid
        );
        table.remove(pid);
        Some(child)
    }

    fn unlink_child(&self, pid: Pid) -> Option<Arc<Process>> {
        let mut inner = self.lock();
        let index = inner.children.iter().position(|c| c.pid == pid)?;
        Some(inner.children.remove(index))
    }
}

/// Create the first, parentless process. It self-destructs on exit.
pub fn spawn_init_process(table: &ProcessTable) -> Arc<Process> {
    let pid = table.allocate_pid();
    let process = Process::new(pid, Weak::new());
    table.insert(&process);
    process
}

/// Create a new process as a child of `parent`.
///
/// The child is linked under the parent before anything else can fail in
/// the fork path, so a partial fork never leaves an unrecorded process;
/// [`abort_fork`] undoes exactly this registration.
pub fn fork_process(table: &ProcessTable, parent: &Arc<Process>) -> Arc<Process> {
    let pid = table.allocate_pid();
    let child = Process::new(pid, Arc::downgrade(parent));
    parent.lock().children.push(child.clone());
    table.insert(&child);
    child
}

/// Undo a [`fork_process`] whose resource duplication failed: unlink the
/// child from the parent and drop its registration. The child never ran,
/// so there is no exit state to publish.
pub fn abort_fork(table: &ProcessTable, parent: &Arc<Process>, child: &Arc<Process>) {
    // A concurrent exit of the parent may have disposed of the child
    // already; removal from the table still has to happen exactly once.
    parent.unlink_child(child.pid());
    table.remove(child.pid());
}
