//! Platform service indirection.
//!
//! `core` owns the dispatch logic but must not depend on the driver crates,
//! so hardware operations it needs are function pointers registered by the
//! `boot` crate during early init.

use core::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

use emberos_lib::klog_debug;

pub type EoiFn = fn();

static SEND_EOI: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());
static EOI_COUNT: AtomicU64 = AtomicU64::new(0);

/// Register the interrupt controller's end-of-interrupt operation.
pub fn register_irq_eoi(eoi: EoiFn) {
    SEND_EOI.store(eoi as *mut (), Ordering::Release);
    klog_debug!("PLATFORM: EOI service registered");
}

/// Acknowledge the current interrupt at the interrupt controller.
///
/// Counted even when no backend is registered yet, so early dispatches still
/// show up in the statistics.
pub fn irq_send_eoi() {
    EOI_COUNT.fetch_add(1, Ordering::Relaxed);
    let ptr = SEND_EOI.load(Ordering::Acquire);
    if ptr.is_null() {
        klog_debug!("PLATFORM: EOI dropped (no controller registered)");
        return;
    }
    // SAFETY: only `register_irq_eoi` stores into SEND_EOI, and it stores
    // valid `EoiFn` pointers.
    let eoi: EoiFn = unsafe { core::mem::transmute(ptr) };
    eoi();
}

/// Total EOIs issued since boot.
pub fn eoi_count() -> u64 {
    EOI_COUNT.load(Ordering::Relaxed)
}
