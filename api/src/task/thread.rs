use alloc::sync::Arc;
use axerrno::LinuxResult;
use kestrel_core::{Platform, ProcessData};
use kestrel_process::Pid;

pub fn sys_getpid<P: Platform>(caller: &Arc<ProcessData<P>>) -> LinuxResult<Pid> {
    Ok(caller.pid())
}

/// The parent's pid, or 0 once the caller has been orphaned.
pub fn sys_getppid<P: Platform>(caller: &Arc<ProcessData<P>>) -> LinuxResult<Pid> {
    Ok(match caller.proc.parent() {
        Some(parent) => parent.pid(),
        None => 0,
    })
}
