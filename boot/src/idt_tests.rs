//! IDT installation tests: every gate present, correctly typed, and pointing
//! at its own trampoline.

use core::mem;

use emberos_lib::arch::idt::{IDT_ENTRIES, IDT_GATE_INTERRUPT, IdtEntry};
use emberos_lib::testing::TestResult;
use emberos_lib::{assert_eq_test, assert_test, pass};

use crate::gdt;
use crate::idt::{idt_descriptor, idt_get_gate};
use crate::isr_stubs::ISR_TABLE;

pub fn test_idt_all_entries_present() -> TestResult {
    for vector in 0..IDT_ENTRIES {
        let gate = idt_get_gate(vector as u8);
        assert_test!(gate.is_present(), "vector {} not present", vector);
    }
    pass!()
}

pub fn test_idt_gate_contents() -> TestResult {
    for vector in 0..IDT_ENTRIES {
        let gate = idt_get_gate(vector as u8);
        assert_eq_test!(
            gate.gate_type(),
            IDT_GATE_INTERRUPT,
            "gate type for vector"
        );
        assert_eq_test!(gate.dpl(), 0, "DPL for vector");
        let selector = gate.selector;
        assert_eq_test!(selector, gdt::kernel_code_selector(), "selector");
        let ist = gate.ist;
        assert_eq_test!(ist, gdt::interrupt_ist_index(), "IST index");
        let zero = gate.zero;
        assert_eq_test!(zero, 0u32, "reserved field");
    }
    pass!()
}

pub fn test_idt_offsets_match_trampolines() -> TestResult {
    for vector in 0..IDT_ENTRIES {
        let gate = idt_get_gate(vector as u8);
        let stub = ISR_TABLE[vector] as *const () as u64;
        assert_eq_test!(gate.offset(), stub, "trampoline address for vector");
    }
    pass!()
}

pub fn test_idt_boundary_vectors_installed() -> TestResult {
    let first = idt_get_gate(0);
    let last = idt_get_gate(255);
    assert_test!(first.is_present());
    assert_test!(last.is_present());
    assert_eq_test!(first.offset(), ISR_TABLE[0] as *const () as u64);
    assert_eq_test!(last.offset(), ISR_TABLE[255] as *const () as u64);
    pass!()
}

pub fn test_idt_descriptor_limit() -> TestResult {
    let (limit, base) = idt_descriptor();
    assert_eq_test!(
        limit as usize,
        IDT_ENTRIES * mem::size_of::<IdtEntry>() - 1
    );
    assert_test!(base != 0, "IDTR base must be set");
    pass!()
}

pub fn test_idt_trampolines_distinct() -> TestResult {
    // Each vector must resolve to its own stub; a duplicate would mean two
    // vectors share an immediate.
    for vector in 1..IDT_ENTRIES {
        let previous = ISR_TABLE[vector - 1] as *const ();
        let current = ISR_TABLE[vector] as *const ();
        assert_test!(
            !core::ptr::eq(previous, current),
            "vectors {} and {} share a trampoline",
            vector - 1,
            vector
        );
    }
    pass!()
}

emberos_lib::define_test_suite!(
    idt,
    [
        test_idt_all_entries_present,
        test_idt_gate_contents,
        test_idt_offsets_match_trampolines,
        test_idt_boundary_vectors_installed,
        test_idt_descriptor_limit,
        test_idt_trampolines_distinct,
    ]
);
