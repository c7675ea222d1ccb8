//! The host platform: OS threads stand in for kernel threads, and
//! address spaces are opaque images charged against a memory budget.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once, OnceLock, Weak};
use std::thread::{self, JoinHandle};

use axerrno::{AxError, AxResult};
use kestrel_core::{Kernel, Platform, ProcessData};
use kestrel_process::Pid;
use kestrel_process::process::spawn_init_process;
use kestrel_process::wait::Parker;

pub type HostKernel = Kernel<HostPlatform>;

/// Knobs for the simulated machine. The limits exist so that the
/// resource-exhaustion paths of fork are reachable from tests.
#[derive(Debug, Clone, Copy)]
pub struct HostConfig {
    /// Total bytes available for address spaces.
    pub memory_limit: usize,
    /// Maximum number of concurrently live processes.
    pub process_limit: usize,
    /// Size of the init process's address space; every fork duplicates
    /// the image size of its parent.
    pub init_space_size: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            memory_limit: usize::MAX,
            process_limit: usize::MAX,
            init_space_size: 0x1000,
        }
    }
}

/// Simulated address space: an opaque image of a fixed size.
///
/// It tracks whether it is installed on a running thread; destroying an
/// active space is the fatal misuse the real service documents as
/// undefined.
pub struct HostSpace {
    size: usize,
    active: bool,
}

/// Execution state a hosted process resumes from. A host cannot
/// checkpoint a running closure, so the "register state at the fork
/// return point" is a cloneable entry the caller supplies.
#[derive(Clone)]
pub struct HostContext {
    entry: Arc<dyn Fn() + Send + Sync>,
}

impl HostContext {
    pub fn new(entry: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            entry: Arc::new(entry),
        }
    }
}

struct ThreadParker(thread::Thread);

impl Parker for ThreadParker {
    fn park(&self) {
        debug_assert_eq!(thread::current().id(), self.0.id());
        thread::park();
    }

    fn unpark(&self) {
        self.0.unpark();
    }
}

/// Carried as a panic payload by `exit_current_thread` and caught by the
/// thread shim, which is how a hosted thread honors a `-> !` exit.
struct ThreadExit;

pub struct HostPlatform {
    config: HostConfig,
    kernel: OnceLock<Weak<HostKernel>>,
    mem_used: AtomicUsize,
    live_spaces: AtomicUsize,
    live_processes: AtomicUsize,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl HostPlatform {
    fn new(config: HostConfig) -> Self {
        Self {
            config,
            kernel: OnceLock::new(),
            mem_used: AtomicUsize::new(0),
            live_spaces: AtomicUsize::new(0),
            live_processes: AtomicUsize::new(0),
            handles: Mutex::new(Vec::new()),
        }
    }

    fn kernel(&self) -> Arc<HostKernel> {
        self.kernel
            .get()
            .and_then(Weak::upgrade)
            .expect("host platform is not attached to a kernel")
    }

    fn charge_memory(&self, size: usize) -> AxResult {
        let mut used = self.mem_used.load(Ordering::Relaxed);
        loop {
            let next = match used.checked_add(size) {
                Some(next) if next <= self.config.memory_limit => next,
                _ => return Err(AxError::NoMemory),
            };
            match self.mem_used.compare_exchange_weak(
                used,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => used = actual,
            }
        }
    }

    fn take_process_slot(&self) -> AxResult {
        let mut live = self.live_processes.load(Ordering::Relaxed);
        loop {
            if live >= self.config.process_limit {
                return Err(AxError::WouldBlock);
            }
            match self.live_processes.compare_exchange_weak(
                live,
                live + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => live = actual,
            }
        }
    }

    fn create_space(&self, size: usize) -> AxResult<HostSpace> {
        self.charge_memory(size)?;
        self.live_spaces.fetch_add(1, Ordering::Relaxed);
        Ok(HostSpace {
            size,
            active: false,
        })
    }

    /// Address spaces not yet destroyed. Zero once every process in every
    /// tree has exited; tests use this as the leak check.
    pub fn space_count(&self) -> usize {
        self.live_spaces.load(Ordering::Relaxed)
    }

    /// Processes whose threads are still running.
    pub fn process_count(&self) -> usize {
        self.live_processes.load(Ordering::Relaxed)
    }

    /// Join every thread this platform has spawned, including ones
    /// spawned while joining. Panics if a hosted process panicked with
    /// anything other than a plain exit.
    pub fn join_all(&self) {
        loop {
            let handle = self.handles.lock().unwrap().pop();
            match handle {
                Some(handle) => handle.join().expect("hosted process panicked"),
                None => break,
            }
        }
    }
}

impl Platform for HostPlatform {
    type Space = HostSpace;
    type Context = HostContext;

    fn duplicate_space(&self, space: &HostSpace) -> AxResult<HostSpace> {
        self.create_space(space.size)
    }

    fn deactivate_space(&self, space: &mut HostSpace) {
        space.active = false;
    }

    fn destroy_space(&self, space: HostSpace) {
        assert!(!space.active, "destroying an active address space");
        self.live_spaces.fetch_sub(1, Ordering::Relaxed);
        self.mem_used.fetch_sub(space.size, Ordering::Relaxed);
    }

    fn duplicate_context(&self, ctx: &HostContext) -> HostContext {
        ctx.clone()
    }

    fn spawn(&self, proc: Arc<ProcessData<Self>>, ctx: HostContext) -> AxResult {
        self.take_process_slot()?;
        let kernel = self.kernel();
        let name = format!("proc-{}", proc.pid());
        match thread::Builder::new()
            .name(name)
            .spawn(move || process_main(kernel, proc, ctx))
        {
            Ok(handle) => {
                self.handles.lock().unwrap().push(handle);
                Ok(())
            }
            Err(err) => {
                warn!("spawn failed: {}", err);
                self.live_processes.fetch_sub(1, Ordering::Relaxed);
                Err(AxError::WouldBlock)
            }
        }
    }

    fn current_parker(&self) -> Arc<dyn Parker> {
        Arc::new(ThreadParker(thread::current()))
    }

    fn detach_current_thread(&self) {
        CURRENT.with(|current| current.borrow_mut().take());
    }

    fn exit_current_thread(&self) -> ! {
        panic::panic_any(ThreadExit)
    }
}

pub(crate) struct Current {
    pub kernel: Arc<HostKernel>,
    pub data: Arc<ProcessData<HostPlatform>>,
}

thread_local! {
    static CURRENT: RefCell<Option<Current>> = const { RefCell::new(None) };
}

pub(crate) fn with_current<T>(f: impl FnOnce(&Current) -> T) -> T {
    CURRENT.with(|current| {
        let current = current.borrow();
        let current = current
            .as_ref()
            .expect("no process is bound to this thread");
        f(current)
    })
}

/// Body of every hosted process thread: install the address space, bind
/// the thread to the process, run the program, and translate the exit
/// protocol's thread teardown back into a normal thread return.
fn process_main(
    kernel: Arc<HostKernel>,
    data: Arc<ProcessData<HostPlatform>>,
    ctx: HostContext,
) {
    if let Some(space) = data.space.lock().as_mut() {
        space.active = true;
    }
    CURRENT.with(|current| {
        *current.borrow_mut() = Some(Current {
            kernel: kernel.clone(),
            data,
        });
    });

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (ctx.entry)()));
    let result = match outcome {
        // the program called `task::exit`
        Err(payload) if payload.is::<ThreadExit>() => Ok(()),
        // fell off the end of the program: an implicit exit(0)
        Ok(()) => match panic::catch_unwind(AssertUnwindSafe(|| {
            crate::task::exit(0);
        })) {
            Err(payload) if payload.is::<ThreadExit>() => Ok(()),
            Err(payload) => Err(payload),
            Ok(()) => unreachable!("exit returned"),
        },
        Err(payload) => Err(payload),
    };

    kernel.platform.live_processes.fetch_sub(1, Ordering::Relaxed);
    if let Err(payload) = result {
        panic::resume_unwind(payload);
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            // a process exit travels as a panic payload on hosted threads
            if info.payload().is::<ThreadExit>() {
                return;
            }
            default_hook(info);
        }));
    });
}

/// Bring up a kernel instance on the default host configuration.
pub fn boot() -> Arc<HostKernel> {
    boot_with(HostConfig::default())
}

pub fn boot_with(config: HostConfig) -> Arc<HostKernel> {
    install_panic_hook();
    let kernel = Arc::new(Kernel::new(HostPlatform::new(config)));
    assert!(
        kernel.platform.kernel.set(Arc::downgrade(&kernel)).is_ok(),
        "platform already attached"
    );
    kernel
}

/// Create and schedule the first, parentless process of a tree. Failures
/// here are boot failures, not errors a caller could handle.
pub fn spawn_init(kernel: &Arc<HostKernel>, entry: impl Fn() + Send + Sync + 'static) -> Pid {
    let proc = spawn_init_process(&kernel.table);
    let space = kernel
        .platform
        .create_space(kernel.platform.config.init_space_size)
        .expect("no memory for the init address space");
    let data = Arc::new(ProcessData::new(proc.clone(), space));
    kernel.register_data(&data);
    kernel
        .platform
        .spawn(data, HostContext::new(entry))
        .expect("could not schedule the init process");
    info!("init process {} scheduled", proc.pid());
    proc.pid()
}
