//! Kernel diagnostics: the saved interrupt frame and crash-state plumbing.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// The interrupt stack as seen by the dispatcher.
///
/// Layout is dictated by the entry path and must not change independently of
/// it: the common entry pushes `rbp` through `rdi` (so `rdi` sits at the
/// lowest address), below the `vector` and `error_code` slots pushed by the
/// trampoline, below the five words the CPU pushes on interrupt entry. For
/// vectors without an architectural error code the trampoline stores a zero
/// in `error_code` so the shape is uniform across all 256 vectors.
#[repr(C)]
pub struct InterruptFrame {
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub rbp: u64,
    pub vector: u64,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// Log the full contents of a saved interrupt frame.
pub fn kdiag_dump_interrupt_frame(frame: *const InterruptFrame) {
    if frame.is_null() {
        crate::klog_info!("KDIAG: <null interrupt frame>");
        return;
    }
    let f = unsafe { &*frame };
    crate::klog_info!("=== INTERRUPT FRAME DUMP ===");
    crate::klog_info!(
        "Vector: {} ({})  Error code: 0x{:x}",
        f.vector,
        crate::arch::exception::get_exception_name((f.vector & 0xFF) as u8),
        f.error_code
    );
    crate::klog_info!(
        "RIP: 0x{:016x}  CS: 0x{:04x}  RFLAGS: 0x{:x}",
        f.rip,
        f.cs,
        f.rflags
    );
    crate::klog_info!("RSP: 0x{:016x}  SS: 0x{:04x}", f.rsp, f.ss);
    crate::klog_info!(
        "RAX: 0x{:016x}  RBX: 0x{:016x}  RCX: 0x{:016x}",
        f.rax,
        f.rbx,
        f.rcx
    );
    crate::klog_info!(
        "RDX: 0x{:016x}  RSI: 0x{:016x}  RDI: 0x{:016x}",
        f.rdx,
        f.rsi,
        f.rdi
    );
    crate::klog_info!("RBP: 0x{:016x}", f.rbp);
}

static PANIC_STATE_VALID: AtomicBool = AtomicBool::new(false);
static PANIC_RIP: AtomicU64 = AtomicU64::new(0);
static PANIC_RSP: AtomicU64 = AtomicU64::new(0);

/// Record the interrupted `rip`/`rsp` so the panic report can point at the
/// faulting code rather than at the dispatcher.
pub fn set_panic_cpu_state(rip: u64, rsp: u64) {
    PANIC_RIP.store(rip, Ordering::Relaxed);
    PANIC_RSP.store(rsp, Ordering::Relaxed);
    PANIC_STATE_VALID.store(true, Ordering::Release);
}

/// CPU state recorded by [`set_panic_cpu_state`], if any.
pub fn panic_cpu_state() -> Option<(u64, u64)> {
    if PANIC_STATE_VALID.load(Ordering::Acquire) {
        Some((
            PANIC_RIP.load(Ordering::Relaxed),
            PANIC_RSP.load(Ordering::Relaxed),
        ))
    } else {
        None
    }
}
