//! Dispatch framework tests: frame layout, classification helpers, chain
//! walking, address-space swap and EOI accounting.

use core::mem;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use alloc::format;

use emberos_abi::addr::PhysAddr;
use emberos_lib::arch::exception::PageFaultErrorCode;
use emberos_lib::arch::idt::vector_has_error_code;
use emberos_lib::testing::TestResult;
use emberos_lib::{InterruptFrame, assert_eq_test, assert_test, pass};

use crate::interrupts::{
    self, HandlerDescriptor, interrupt_dispatch, register_handler, register_handler_callback,
};
use crate::platform;
use crate::sched;

fn make_frame(vector: u16) -> InterruptFrame {
    InterruptFrame {
        rdi: 0,
        rsi: 0,
        rdx: 0,
        rcx: 0,
        rbx: 0,
        rax: 0,
        rbp: 0,
        vector: vector as u64,
        error_code: 0,
        rip: 0xFFFF_FFFF_8000_1000,
        cs: 0x08,
        rflags: 0x202,
        rsp: 0xFFFF_FFFF_8010_0000,
        ss: 0x10,
    }
}

pub fn test_frame_layout_offsets() -> TestResult {
    assert_eq_test!(mem::offset_of!(InterruptFrame, rdi), 0);
    assert_eq_test!(mem::offset_of!(InterruptFrame, rsi), 8);
    assert_eq_test!(mem::offset_of!(InterruptFrame, rdx), 16);
    assert_eq_test!(mem::offset_of!(InterruptFrame, rcx), 24);
    assert_eq_test!(mem::offset_of!(InterruptFrame, rbx), 32);
    assert_eq_test!(mem::offset_of!(InterruptFrame, rax), 40);
    assert_eq_test!(mem::offset_of!(InterruptFrame, rbp), 48);
    assert_eq_test!(mem::offset_of!(InterruptFrame, vector), 56);
    assert_eq_test!(mem::offset_of!(InterruptFrame, error_code), 64);
    assert_eq_test!(mem::offset_of!(InterruptFrame, rip), 72);
    assert_eq_test!(mem::offset_of!(InterruptFrame, cs), 80);
    assert_eq_test!(mem::offset_of!(InterruptFrame, rflags), 88);
    assert_eq_test!(mem::offset_of!(InterruptFrame, rsp), 96);
    assert_eq_test!(mem::offset_of!(InterruptFrame, ss), 104);
    assert_eq_test!(mem::size_of::<InterruptFrame>(), 112);
    pass!()
}

pub fn test_error_code_vector_set() -> TestResult {
    let expected = [8u8, 10, 11, 12, 13, 14, 17, 21, 29, 30];
    for vector in 0..=255u8 {
        let has = vector_has_error_code(vector);
        assert_eq_test!(
            has,
            expected.contains(&vector),
            format!("vector {}", vector)
        );
    }
    pass!()
}

pub fn test_page_fault_tags_all_set() -> TestResult {
    let code = PageFaultErrorCode::from_bits_truncate(0b11011);
    let rendered = format!("{}", code);
    assert_eq_test!(
        rendered.as_str(),
        "Page Protection, Write, Reserved Write, Executed"
    );
    pass!()
}

pub fn test_page_fault_tags_zero() -> TestResult {
    let code = PageFaultErrorCode::from_bits_truncate(0);
    assert_eq_test!(format!("{}", code).as_str(), "Read");
    pass!()
}

pub fn test_page_fault_tags_write_only() -> TestResult {
    let code = PageFaultErrorCode::from_bits_truncate(0b00010);
    let rendered = format!("{}", code);
    assert_eq_test!(rendered.as_str(), "Write");
    assert_test!(!rendered.contains("Page Protection"));
    pass!()
}

pub fn test_dispatch_register_and_fire() -> TestResult {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static SEEN_VECTOR: AtomicU64 = AtomicU64::new(u64::MAX);

    fn claiming_handler(frame: *mut InterruptFrame) -> bool {
        CALLS.fetch_add(1, Ordering::Relaxed);
        SEEN_VECTOR.store(unsafe { (*frame).vector }, Ordering::Relaxed);
        true
    }

    register_handler_callback(40, claiming_handler);
    let mut frame = make_frame(40);
    let eoi_before = platform::eoi_count();

    let resumed = interrupt_dispatch(&mut frame);

    assert_eq_test!(CALLS.load(Ordering::Relaxed), 1, "callback invocations");
    assert_eq_test!(SEEN_VECTOR.load(Ordering::Relaxed), 40u64);
    assert_eq_test!(platform::eoi_count() - eoi_before, 1u64, "EOI count");
    assert_test!(
        core::ptr::eq(resumed, &raw mut frame),
        "dispatch must return the frame it was given"
    );
    pass!()
}

pub fn test_dispatch_chain_short_circuit() -> TestResult {
    static FIRST: AtomicUsize = AtomicUsize::new(0);
    static SECOND: AtomicUsize = AtomicUsize::new(0);
    static THIRD: AtomicUsize = AtomicUsize::new(0);

    fn declining(_: *mut InterruptFrame) -> bool {
        FIRST.fetch_add(1, Ordering::Relaxed);
        false
    }
    fn claiming(_: *mut InterruptFrame) -> bool {
        SECOND.fetch_add(1, Ordering::Relaxed);
        true
    }
    fn never_reached(_: *mut InterruptFrame) -> bool {
        THIRD.fetch_add(1, Ordering::Relaxed);
        true
    }

    register_handler_callback(50, declining);
    register_handler_callback(50, claiming);
    register_handler_callback(50, never_reached);

    let mut frame = make_frame(50);
    let eoi_before = platform::eoi_count();
    interrupt_dispatch(&mut frame);

    assert_eq_test!(FIRST.load(Ordering::Relaxed), 1, "first handler runs");
    assert_eq_test!(SECOND.load(Ordering::Relaxed), 1, "second handler claims");
    assert_eq_test!(THIRD.load(Ordering::Relaxed), 0, "third handler skipped");
    assert_eq_test!(platform::eoi_count() - eoi_before, 1u64, "one EOI per dispatch");
    pass!()
}

pub fn test_dispatch_unclaimed_still_eois() -> TestResult {
    let mut frame = make_frame(51);
    let eoi_before = platform::eoi_count();
    let unhandled_before = interrupts::unhandled_count();

    let resumed = interrupt_dispatch(&mut frame);

    assert_eq_test!(platform::eoi_count() - eoi_before, 1u64);
    assert_eq_test!(interrupts::unhandled_count() - unhandled_before, 1u64);
    assert_test!(core::ptr::eq(resumed, &raw mut frame));
    pass!()
}

pub fn test_dispatch_rip_rewrite() -> TestResult {
    const REDIRECTED_RIP: u64 = 0xFFFF_FFFF_8020_0000;

    fn redirecting(frame: *mut InterruptFrame) -> bool {
        unsafe { (*frame).rip = REDIRECTED_RIP };
        true
    }

    register_handler_callback(52, redirecting);
    let mut frame = make_frame(52);
    interrupt_dispatch(&mut frame);

    assert_eq_test!(frame.rip, REDIRECTED_RIP, "resume rip follows the handler");
    pass!()
}

pub fn test_dispatch_chain_snapshot() -> TestResult {
    static LATE: AtomicUsize = AtomicUsize::new(0);

    fn late_handler(_: *mut InterruptFrame) -> bool {
        LATE.fetch_add(1, Ordering::Relaxed);
        true
    }
    fn registering(_: *mut InterruptFrame) -> bool {
        register_handler_callback(53, late_handler);
        false
    }

    register_handler_callback(53, registering);
    let mut frame = make_frame(53);
    interrupt_dispatch(&mut frame);

    assert_eq_test!(
        LATE.load(Ordering::Relaxed),
        0,
        "handler registered mid-walk must not run this dispatch"
    );
    assert_eq_test!(interrupts::handler_count(53), 2, "registration still lands");

    // Next dispatch sees the longer chain.
    let mut frame = make_frame(53);
    interrupt_dispatch(&mut frame);
    assert_eq_test!(LATE.load(Ordering::Relaxed), 1);
    pass!()
}

pub fn test_dispatch_address_space_swap() -> TestResult {
    static DURING: AtomicU64 = AtomicU64::new(u64::MAX);

    fn recording(_: *mut InterruptFrame) -> bool {
        let loaded = sched::last_loaded_address_space().unwrap_or(u32::MAX) as u64;
        DURING.store(loaded, Ordering::Relaxed);
        // Declining on purpose: the previous address space must be reinstated
        // regardless of the return value.
        false
    }

    // Both processes share the live CR3 root so the swap is exercised without
    // changing the active mapping.
    let root = PhysAddr::new(emberos_lib::cpu::read_cr3());
    let Some(p) = sched::process_create(root) else {
        return emberos_lib::fail!("process table full");
    };
    let Some(q) = sched::process_create(root) else {
        return emberos_lib::fail!("process table full");
    };

    sched::set_current_process(Some(q));
    register_handler(
        54,
        HandlerDescriptor {
            callback: recording,
            process: Some(p),
        },
    );

    let mut frame = make_frame(54);
    interrupt_dispatch(&mut frame);

    assert_eq_test!(DURING.load(Ordering::Relaxed), p as u64, "callback ran in P");
    assert_eq_test!(
        sched::last_loaded_address_space(),
        Some(q),
        "previous address space reinstated after the callback"
    );

    sched::set_current_process(None);
    pass!()
}

pub fn test_dispatch_swap_without_current() -> TestResult {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting(_: *mut InterruptFrame) -> bool {
        CALLS.fetch_add(1, Ordering::Relaxed);
        true
    }

    let root = PhysAddr::new(emberos_lib::cpu::read_cr3());
    let Some(p) = sched::process_create(root) else {
        return emberos_lib::fail!("process table full");
    };

    // No current process: nothing to restore after the callback.
    sched::set_current_process(None);
    register_handler(
        55,
        HandlerDescriptor {
            callback: counting,
            process: Some(p),
        },
    );

    let mut frame = make_frame(55);
    interrupt_dispatch(&mut frame);

    assert_eq_test!(CALLS.load(Ordering::Relaxed), 1);
    assert_eq_test!(
        sched::last_loaded_address_space(),
        Some(p),
        "P stays the last-loaded space; there was nothing to restore"
    );
    pass!()
}

pub fn test_dispatch_boundary_vectors() -> TestResult {
    static LOW: AtomicUsize = AtomicUsize::new(0);
    static HIGH: AtomicUsize = AtomicUsize::new(0);

    fn low_handler(_: *mut InterruptFrame) -> bool {
        LOW.fetch_add(1, Ordering::Relaxed);
        true
    }
    fn high_handler(_: *mut InterruptFrame) -> bool {
        HIGH.fetch_add(1, Ordering::Relaxed);
        true
    }

    register_handler_callback(0, low_handler);
    register_handler_callback(255, high_handler);

    let mut frame = make_frame(0);
    interrupt_dispatch(&mut frame);
    let mut frame = make_frame(255);
    interrupt_dispatch(&mut frame);

    assert_eq_test!(LOW.load(Ordering::Relaxed), 1, "vector 0 dispatches");
    assert_eq_test!(HIGH.load(Ordering::Relaxed), 1, "vector 255 dispatches");
    pass!()
}

pub fn test_dispatch_counts_accumulate() -> TestResult {
    let before = interrupts::dispatch_count();
    let mut frame = make_frame(56);
    interrupt_dispatch(&mut frame);
    interrupt_dispatch(&mut frame);
    assert_eq_test!(interrupts::dispatch_count() - before, 2u64);
    pass!()
}

pub fn test_register_shorthand_matches_descriptor() -> TestResult {
    fn noop(_: *mut InterruptFrame) -> bool {
        true
    }

    let before = interrupts::handler_count(57);
    register_handler_callback(57, noop);
    register_handler(
        57,
        HandlerDescriptor {
            callback: noop,
            process: None,
        },
    );
    assert_eq_test!(interrupts::handler_count(57), before + 2);
    pass!()
}

emberos_lib::define_test_suite!(
    interrupt_dispatch,
    [
        test_frame_layout_offsets,
        test_error_code_vector_set,
        test_page_fault_tags_all_set,
        test_page_fault_tags_zero,
        test_page_fault_tags_write_only,
        test_dispatch_register_and_fire,
        test_dispatch_chain_short_circuit,
        test_dispatch_unclaimed_still_eois,
        test_dispatch_rip_rewrite,
        test_dispatch_chain_snapshot,
        test_dispatch_address_space_swap,
        test_dispatch_swap_without_current,
        test_dispatch_boundary_vectors,
        test_dispatch_counts_accumulate,
        test_register_shorthand_matches_descriptor,
    ]
);
