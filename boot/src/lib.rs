#![no_std]

pub mod early_init;
pub mod gdt;
pub mod idt;
pub mod isr_stubs;
pub mod ist_stacks;
pub mod limine_protocol;
pub mod panic;

#[cfg(feature = "itests")]
pub mod idt_tests;

pub use early_init::kernel_init;
pub use panic::panic_handler_impl;
