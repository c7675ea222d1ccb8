#![no_std]

extern crate alloc;
#[macro_use]
extern crate log;

pub mod kernel;
pub mod platform;
pub mod process;

pub use kernel::Kernel;
pub use platform::Platform;
pub use process::ProcessData;
