#![no_std]

extern crate alloc;

pub mod interrupts;
pub mod platform;
pub mod sched;

#[cfg(feature = "itests")]
pub mod interrupt_tests;
#[cfg(feature = "itests")]
pub mod sched_tests;
