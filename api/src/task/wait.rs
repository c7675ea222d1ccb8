use alloc::sync::Arc;
use axerrno::{LinuxError, LinuxResult};
use kestrel_core::{Kernel, Platform, ProcessData};
use kestrel_process::Pid;

/// Encode an exit code the way wait reports it. The low byte is reserved
/// for the terminating signal; there is none for a plain exit.
pub fn wait_status(exit_code: i32) -> i32 {
    (exit_code & 0xff) << 8
}

/// Block until the child `pid` of `caller` has exited, then reap it:
/// return its pid and encoded status and destroy its descriptor.
///
/// The only supported mode is a blocking wait for one specific child, so
/// any nonzero `options` is rejected before any state is touched. The
/// child search holds the caller's lock only briefly; blocking happens
/// on the target's own exit condition, so it cannot deadlock against the
/// target's exit. Only the calling thread suspends.
pub fn sys_waitpid<P: Platform>(
    kernel: &Kernel<P>,
    caller: &Arc<ProcessData<P>>,
    pid: Pid,
    options: u32,
) -> LinuxResult<(Pid, i32)> {
    info!("sys_waitpid <= pid: {}, options: {}", pid, options);
    if options != 0 {
        return Err(LinuxError::EINVAL);
    }

    let target = caller.proc.child(pid).ok_or(LinuxError::ECHILD)?;

    let exit_code = if target.is_zombie() {
        target.exit_code()
    } else {
        let parker = kernel.platform.current_parker();
        target.wait_exited(&parker)
    };

    // Consume the child. A concurrent wait from another of the caller's
    // threads may have reaped it first; that wait got the child, this one
    // reports not-a-child.
    caller
        .proc
        .reap_child(pid, &kernel.table)
        .ok_or(LinuxError::ECHILD)?;

    debug!("sys_waitpid => pid: {}, exit code: {}", pid, exit_code);
    Ok((pid, wait_status(exit_code)))
}
