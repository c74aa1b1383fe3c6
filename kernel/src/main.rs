#![no_std]
#![no_main]

use core::panic::PanicInfo;

use emberos_lib::cpu;
use emberos_mm::BumpAllocator;

#[global_allocator]
static GLOBAL_ALLOCATOR: BumpAllocator = BumpAllocator::new();

// Pull the test-suite objects out of their rlibs: the registry descriptors
// are `#[used]` statics, but the linker only keeps archive members something
// references.
#[cfg(feature = "itests")]
mod itest_link {
    use emberos_lib::testing::TestResult;

    #[used]
    static INTERRUPT_SUITE: fn() -> TestResult =
        emberos_core::interrupt_tests::test_frame_layout_offsets;
    #[used]
    static SCHED_SUITE: fn() -> TestResult =
        emberos_core::sched_tests::test_lookup_unknown_process_root;
    #[used]
    static IDT_SUITE: fn() -> TestResult = emberos_boot::idt_tests::test_idt_all_entries_present;
}

#[unsafe(no_mangle)]
unsafe extern "C" fn kmain() -> ! {
    emberos_boot::kernel_init();

    #[cfg(feature = "itests")]
    run_itests();

    cpu::halt_loop();
}

/// Run every registered suite and exit QEMU through the isa-debug-exit
/// device. The exit code seen by the shell is `(value << 1) | 1`. Outside
/// QEMU the write is a no-op and the caller parks the CPU.
#[cfg(feature = "itests")]
fn run_itests() {
    use emberos_lib::klog_info;
    use emberos_lib::ports::QEMU_DEBUG_EXIT;

    let summary = emberos_lib::testing::run_all_suites();
    emberos_mm::kernel_heap::log_heap_stats();

    klog_info!("TEST: Requesting shutdown (failed={})", summary.failed);
    let exit_value: u8 = if summary.all_passed() { 0 } else { 1 };
    unsafe { QEMU_DEBUG_EXIT.write(exit_value) };
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    emberos_boot::panic_handler_impl(info)
}
