#![allow(static_mut_refs)]

//! Interrupt Descriptor Table installation.
//!
//! All 256 vectors are installed before the IDTR is loaded; the CPU must
//! never find a non-present gate. Gate contents are identical for every
//! vector — kernel code selector, interrupt gate, DPL 0, the shared
//! interrupt IST — only the trampoline address differs.

use core::arch::asm;
use core::mem;

use emberos_lib::arch::idt::{
    IDT_ENTRIES, IDT_GATE_INTERRUPT, IDT_PRESENT, IdtEntry, vector_has_error_code,
};
use emberos_lib::klog_debug;

use crate::gdt;
use crate::isr_stubs::ISR_TABLE;

#[repr(C, packed)]
struct IdtPtr {
    limit: u16,
    base: u64,
}

static mut IDT: [IdtEntry; IDT_ENTRIES] = [IdtEntry::zeroed(); IDT_ENTRIES];
static mut IDT_POINTER: IdtPtr = IdtPtr { limit: 0, base: 0 };

#[inline(always)]
fn handler_ptr(f: unsafe extern "C" fn()) -> u64 {
    f as *const () as u64
}

fn idt_set_gate(vector: u8, handler: u64, selector: u16, type_attr: u8, ist: u8) {
    unsafe {
        IDT[vector as usize] = IdtEntry {
            offset_low: (handler & 0xFFFF) as u16,
            selector,
            ist: ist & 0x7,
            type_attr,
            offset_mid: ((handler >> 16) & 0xFFFF) as u16,
            offset_high: (handler >> 32) as u32,
            zero: 0,
        };
    }
}

/// Install a kernel interrupt gate for a vector whose trampoline synthesizes
/// the error slot.
pub fn idt_install_kernel_isr(vector: u8, handler: u64) {
    idt_set_gate(
        vector,
        handler,
        gdt::kernel_code_selector(),
        IDT_PRESENT | IDT_GATE_INTERRUPT,
        gdt::interrupt_ist_index(),
    );
}

/// Install a kernel interrupt gate for a vector where the CPU pushes the
/// error code itself. Gate content is identical to
/// [`idt_install_kernel_isr`]; the distinction lives in the trampoline.
pub fn idt_install_kernel_error_isr(vector: u8, handler: u64) {
    idt_set_gate(
        vector,
        handler,
        gdt::kernel_code_selector(),
        IDT_PRESENT | IDT_GATE_INTERRUPT,
        gdt::interrupt_ist_index(),
    );
}

/// Install all 256 vectors and prepare the IDTR image.
pub fn idt_init() {
    for vector in 0..IDT_ENTRIES {
        let handler = handler_ptr(ISR_TABLE[vector]);
        if vector_has_error_code(vector as u8) {
            idt_install_kernel_error_isr(vector as u8, handler);
        } else {
            idt_install_kernel_isr(vector as u8, handler);
        }
    }

    unsafe {
        IDT_POINTER.limit = (mem::size_of::<IdtEntry>() * IDT_ENTRIES - 1) as u16;
        IDT_POINTER.base = IDT.as_ptr() as u64;
    }

    klog_debug!("IDT: Installed {} interrupt vectors", IDT_ENTRIES);
}

/// Load the IDTR. [`idt_init`] must have run first.
pub fn idt_load() {
    unsafe {
        let idtr = &raw const IDT_POINTER;
        asm!("lidt [{}]", in(reg) idtr, options(nostack, preserves_flags));
    }
    let (limit, base) = idt_descriptor();
    klog_debug!("IDT: Loaded base=0x{:x} limit=0x{:x}", base, limit);
}

/// Copy of the gate installed for a vector.
pub fn idt_get_gate(vector: u8) -> IdtEntry {
    unsafe { IDT[vector as usize] }
}

/// The `{limit, base}` pair the IDTR is loaded with.
pub fn idt_descriptor() -> (u16, u64) {
    unsafe { (IDT_POINTER.limit, IDT_POINTER.base) }
}
