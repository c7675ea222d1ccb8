use crate::process::ProcessData;
use alloc::sync::Arc;
use axerrno::AxResult;
use kestrel_process::wait::Parker;

/// The services the lifecycle core consumes but does not implement: the
/// address-space service and the execution/scheduling service.
///
/// Everything behind this trait is opaque to the core. Address-space
/// contents, context-switch mechanics, and how a spawned thread actually
/// starts running are the platform's business; the core only sequences
/// the calls.
pub trait Platform: Sized + Send + Sync + 'static {
    /// Handle to one process's address space.
    type Space: Send + 'static;
    /// Saved execution state a new process resumes from.
    type Context: Send + 'static;

    /// Clone `space` into a fresh address space for a forked child.
    /// Fails on resource exhaustion.
    fn duplicate_space(&self, space: &Self::Space) -> AxResult<Self::Space>;

    /// Take `space` out of service ahead of destruction. Destroying a
    /// still-active address space is undefined.
    fn deactivate_space(&self, space: &mut Self::Space);

    fn destroy_space(&self, space: Self::Space);

    /// Duplicate the caller's execution state, positioned to resume at
    /// the fork call's return point.
    fn duplicate_context(&self, ctx: &Self::Context) -> Self::Context;

    /// Schedule a new thread of control bound to `proc`, resuming `ctx`.
    /// On success the new process runs independently of the caller.
    fn spawn(&self, proc: Arc<ProcessData<Self>>, ctx: Self::Context) -> AxResult;

    /// A parker for the calling thread, used to block on another
    /// process's exit condition.
    fn current_parker(&self) -> Arc<dyn Parker>;

    /// Unbind the calling thread from its process. After this the thread
    /// may no longer reach its own descriptor through the platform.
    fn detach_current_thread(&self);

    /// Terminate the calling thread. Never returns.
    fn exit_current_thread(&self) -> !;
}
