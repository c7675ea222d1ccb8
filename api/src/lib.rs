#![no_std]

extern crate alloc;
#[macro_use]
extern crate log;

pub mod task;

pub use task::*;
