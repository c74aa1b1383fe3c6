//! Panic reporting.

use core::panic::PanicInfo;

use emberos_lib::kdiag::panic_cpu_state;
use emberos_lib::{cpu, klog_error};

/// Final panic sink for the kernel binary's `#[panic_handler]`.
///
/// Logs the message, source location and any CPU state the interrupt
/// dispatcher recorded, then parks the CPU. Never returns; there is no
/// unwinding in this kernel.
pub fn panic_handler_impl(info: &PanicInfo) -> ! {
    cpu::disable_interrupts();

    klog_error!("KERNEL PANIC: {}", info.message());
    if let Some(location) = info.location() {
        klog_error!(
            "Panic origin: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }
    if let Some((rip, rsp)) = panic_cpu_state() {
        klog_error!("Interrupted at rip=0x{:x} rsp=0x{:x}", rip, rsp);
    }

    cpu::halt_loop();
}
