//! Statically allocated interrupt stacks.
//!
//! Every vector's gate selects IST 1, so a fault taken on a corrupted or
//! nearly-exhausted kernel stack still enters the handler on a known-good
//! one. A second stack backs TSS `rsp0` for completeness; with no user mode
//! the CPU never performs that switch.

pub const INTERRUPT_STACK_SIZE: usize = 32 * 1024;
pub const KERNEL_RSP0_STACK_SIZE: usize = 16 * 1024;

#[repr(C, align(16))]
struct BootStack<const SIZE: usize>([u8; SIZE]);

static mut INTERRUPT_STACK: BootStack<INTERRUPT_STACK_SIZE> = BootStack([0; INTERRUPT_STACK_SIZE]);
static mut RSP0_STACK: BootStack<KERNEL_RSP0_STACK_SIZE> = BootStack([0; KERNEL_RSP0_STACK_SIZE]);

/// Top of the IST 1 stack (the address placed in the TSS; stacks grow down).
pub fn interrupt_stack_top() -> u64 {
    (&raw const INTERRUPT_STACK) as u64 + INTERRUPT_STACK_SIZE as u64
}

/// Top of the rsp0 stack.
pub fn kernel_rsp0_top() -> u64 {
    (&raw const RSP0_STACK) as u64 + KERNEL_RSP0_STACK_SIZE as u64
}
