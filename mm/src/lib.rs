//! Memory plumbing for the interrupt core: the higher-half direct map offset,
//! MMIO region mapping on top of it, and the boot heap that backs `alloc`.

#![no_std]

pub mod hhdm;
pub mod kernel_heap;
pub mod mmio;

pub use kernel_heap::BumpAllocator;
