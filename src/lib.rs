//! Hosted rendition of the kestrel process lifecycle core.
//!
//! The `no_std` crates implement the protocol; this crate backs their
//! collaborator interfaces with OS threads and simulated address spaces
//! so whole process trees can run (and race) on a development machine.
//! Programs are closures; `task::fork`, `task::exit` and `task::waitpid`
//! behave like the syscalls they stand in for.

#[macro_use]
extern crate log;

pub mod host;
pub mod task;

pub use axerrno::{LinuxError, LinuxResult};
pub use host::{HostConfig, HostKernel, HostPlatform, boot, boot_with, spawn_init};
pub use kestrel_api::wait_status;
pub use kestrel_process::Pid;
