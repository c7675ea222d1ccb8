//! Process lifecycle: creation, termination, and parent-child
//! synchronization.
//!
//! A [`process::Process`] descriptor records identity, the parent/children
//! relationship, and the exit state, all guarded by the descriptor's own
//! lock. The [`table::ProcessTable`] allocates identifiers and supports
//! lookup; it owns no lifecycle logic. Exiting and reaping follow the
//! classic protocol: an exited child stays allocated as a zombie until its
//! parent reaps it, an orphan destroys itself on exit, and a parent's exit
//! disposes of every remaining child exactly once.
#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod process;
pub mod table;
pub mod wait;

/// Type alias for process IDs. Positive, unique among live descriptors.
pub type Pid = u32;
