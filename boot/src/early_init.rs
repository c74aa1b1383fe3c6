//! Boot orchestration.
//!
//! Ordering matters: the IDT is loaded before the PIC/APIC are touched so a
//! stray early vector lands in a present gate, and the EOI service is
//! registered only after the APIC is actually able to accept the write.

use emberos_lib::{InitFlag, klog_info, klog_warn};

use crate::{gdt, idt, limine_protocol};

static KERNEL_INITIALIZED: InitFlag = InitFlag::new();

/// Bring the interrupt core and its collaborators up. Called once from the
/// kernel entry point, interrupts still disabled.
pub fn kernel_init() {
    unsafe { emberos_lib::ports::serial_init(emberos_lib::COM1) };
    emberos_lib::klog_init();
    klog_info!("emberos: early init");

    if !limine_protocol::base_revision_supported() {
        klog_warn!("BOOT: Bootloader base revision not supported");
    }
    match limine_protocol::hhdm_offset() {
        Some(offset) => emberos_mm::hhdm::set_hhdm_offset(offset),
        None => klog_warn!("BOOT: No HHDM response; MMIO mapping unavailable"),
    }

    gdt::gdt_init();

    idt::idt_init();
    idt::idt_load();

    emberos_core::interrupts::init();
    emberos_core::sched::init();

    emberos_drivers::pic::pic_quiesce_disable();
    if emberos_drivers::apic::detect() {
        emberos_drivers::apic::init();
        emberos_core::platform::register_irq_eoi(emberos_drivers::apic::send_eoi);
    } else {
        klog_warn!("BOOT: Running without a Local APIC; EOI writes will be dropped");
    }

    KERNEL_INITIALIZED.mark_set();
    klog_info!("emberos: interrupt core online");
}

pub fn is_kernel_initialized() -> bool {
    KERNEL_INITIALIZED.is_set_relaxed()
}
