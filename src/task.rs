//! Syscall-flavored entry points for hosted programs, dispatching on the
//! process bound to the calling thread.

use crate::host::{HostContext, with_current};
use axerrno::LinuxResult;
use kestrel_process::Pid;

/// Duplicate the calling process.
///
/// `child` stands in for the duplicated execution context: it is what the
/// child resumes, in place of returning 0 from the fork. The caller gets
/// the child's pid.
pub fn fork(child: impl Fn() + Send + Sync + 'static) -> LinuxResult<Pid> {
    let ctx = HostContext::new(child);
    with_current(|current| kestrel_api::sys_fork(&current.kernel, &current.data, &ctx))
}

/// Terminate the calling process. Never returns.
pub fn exit(exit_code: i32) -> ! {
    // clone the handles out first: sys_exit detaches the thread, which
    // tears down the binding this call dispatched on
    let (kernel, data) = with_current(|current| (current.kernel.clone(), current.data.clone()));
    kestrel_api::sys_exit(&kernel, &data, exit_code)
}

/// Block until the child `pid` has exited, then reap it, returning its
/// pid and encoded exit status. `options` must be zero.
pub fn waitpid(pid: Pid, options: u32) -> LinuxResult<(Pid, i32)> {
    with_current(|current| kestrel_api::sys_waitpid(&current.kernel, &current.data, pid, options))
}

pub fn getpid() -> LinuxResult<Pid> {
    with_current(|current| kestrel_api::sys_getpid(&current.data))
}

pub fn getppid() -> LinuxResult<Pid> {
    with_current(|current| kestrel_api::sys_getppid(&current.data))
}
