use alloc::sync::Arc;
use axerrno::LinuxResult;
use kestrel_core::{Kernel, Platform, ProcessData};
use kestrel_process::Pid;
use kestrel_process::process::{abort_fork, fork_process};

/// Create a new process as a duplicate of `caller`: a fresh descriptor
/// linked under the caller, a duplicated address space, and a duplicated
/// execution context scheduled on its own thread.
///
/// Returns the child's pid to the caller; the platform arranges for the
/// child's context to see the fork return with a success indicator of
/// its own. Every failure after the child became visible in the caller's
/// children unlinks it again, so an error leaves no state behind.
pub fn sys_fork<P: Platform>(
    kernel: &Kernel<P>,
    caller: &Arc<ProcessData<P>>,
    ctx: &P::Context,
) -> LinuxResult<Pid> {
    let child = fork_process(&kernel.table, &caller.proc);
    debug!("sys_fork: process {} -> child {}", caller.pid(), child.pid());

    let new_space = {
        let guard = caller.space.lock();
        let space = guard.as_ref().expect("fork from an exited process");
        match kernel.platform.duplicate_space(space) {
            Ok(space) => space,
            Err(err) => {
                warn!("sys_fork: address space duplication failed: {:?}", err);
                abort_fork(&kernel.table, &caller.proc, &child);
                return Err(err.into());
            }
        }
    };

    let new_ctx = kernel.platform.duplicate_context(ctx);
    let data = Arc::new(ProcessData::new(child.clone(), new_space));
    kernel.register_data(&data);

    if let Err(err) = kernel.platform.spawn(data.clone(), new_ctx) {
        warn!("sys_fork: could not schedule child {}: {:?}", child.pid(), err);
        kernel.remove_data(child.pid());
        if let Some(space) = data.space.lock().take() {
            kernel.platform.destroy_space(space);
        }
        abort_fork(&kernel.table, &caller.proc, &child);
        return Err(err.into());
    }

    Ok(child.pid())
}
