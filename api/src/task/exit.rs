use alloc::sync::Arc;
use kestrel_core::{Kernel, Platform, ProcessData};
use kestrel_process::process::ExitOutcome;

/// Terminate the calling process with `exit_code`. Never returns.
///
/// Resource release comes first: the address space is deactivated and
/// destroyed, exactly once, and the calling thread detaches from the
/// descriptor, all before the exit becomes observable to a waiting
/// parent. Only then are the children disposed of and the exit state
/// published. Exiting twice is a protocol bug, not an error.
pub fn sys_exit<P: Platform>(kernel: &Kernel<P>, caller: &Arc<ProcessData<P>>, exit_code: i32) -> ! {
    info!(
        "[exit] process {} exiting with code {}",
        caller.pid(),
        exit_code
    );

    let mut space = caller
        .space
        .lock()
        .take()
        .expect("exit called twice for one process");
    kernel.platform.deactivate_space(&mut space);
    kernel.platform.destroy_space(space);

    kernel.platform.detach_current_thread();

    match caller.proc.exit(&kernel.table, exit_code) {
        ExitOutcome::AwaitReap => {
            debug!("[exit] process {} awaits reaping by its parent", caller.pid())
        }
        ExitOutcome::Destroyed => {
            debug!("[exit] process {} destroyed, no parent left", caller.pid())
        }
    }
    kernel.remove_data(caller.pid());

    kernel.platform.exit_current_thread()
}
