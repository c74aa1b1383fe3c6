#![allow(static_mut_refs)]

//! GDT and TSS setup.
//!
//! The interrupt core needs two facts from here: the kernel code selector
//! written into every IDT gate, and the IST index every gate selects.

use core::arch::asm;
use core::mem;

use emberos_abi::arch::x86_64::gdt::{
    GDT_STANDARD_ENTRIES, GdtDescriptor, GdtLayout, SegmentSelector, Tss64,
};
use emberos_lib::klog_debug;

use crate::ist_stacks;

/// IST slot used by every interrupt gate (1-based; 0 means "current stack").
pub const INTERRUPT_IST_INDEX: u8 = 1;

static mut GDT: GdtLayout = GdtLayout::new();
static mut TSS: Tss64 = Tss64::new();

unsafe fn load_gdt(descriptor: &GdtDescriptor) {
    unsafe { asm!("lgdt [{0}]", in(reg) descriptor, options(nostack, preserves_flags)) };

    // Data segments take a plain mov; reloading CS needs a far return.
    unsafe {
        asm!(
            "pushq ${code}",
            "lea 2f(%rip), %rax",
            "pushq %rax",
            "lretq",
            "2:",
            "movw ${data}, %ax",
            "movw %ax, %ds",
            "movw %ax, %es",
            "movw %ax, %ss",
            "movw %ax, %fs",
            "movw %ax, %gs",
            code = const SegmentSelector::KERNEL_CODE.bits() as usize,
            data = const SegmentSelector::KERNEL_DATA.bits() as usize,
            out("rax") _,
            options(att_syntax, nostack)
        );
    }
}

unsafe fn load_tss() {
    let selector = SegmentSelector::TSS.bits();
    unsafe { asm!("ltr {0:x}", in(reg) selector, options(nostack, preserves_flags)) };
}

pub fn gdt_init() {
    klog_debug!("GDT: Initializing descriptor tables");

    unsafe {
        TSS = Tss64::new();
        TSS.iomap_base = mem::size_of::<Tss64>() as u16;
        TSS.rsp0 = ist_stacks::kernel_rsp0_top();
        TSS.ist[(INTERRUPT_IST_INDEX - 1) as usize] = ist_stacks::interrupt_stack_top();

        GDT.entries = GDT_STANDARD_ENTRIES;
        GDT.load_tss(&TSS);

        let descriptor = GdtDescriptor::from_layout(&GDT);
        load_gdt(&descriptor);
        load_tss();
    }

    klog_debug!(
        "GDT: Loaded, interrupt IST {} at 0x{:x}",
        INTERRUPT_IST_INDEX,
        ist_stacks::interrupt_stack_top()
    );
}

/// Selector placed in every IDT gate.
pub fn kernel_code_selector() -> u16 {
    SegmentSelector::KERNEL_CODE.bits()
}

/// IST index placed in every IDT gate.
pub fn interrupt_ist_index() -> u8 {
    INTERRUPT_IST_INDEX
}
