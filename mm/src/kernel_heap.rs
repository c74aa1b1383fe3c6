//! Boot heap.
//!
//! A bump allocator over a static arena, sufficient for the boot-time
//! allocations this kernel makes (handler chains, driver bookkeeping).
//! `dealloc` is a no-op; freed blocks are simply leaked. Exhaustion returns
//! null rather than panicking, so fallible callers (`Vec::try_reserve`) see a
//! clean allocation error.

use core::alloc::{GlobalAlloc, Layout};
use core::cell::UnsafeCell;
use core::ptr;
use core::sync::atomic::{AtomicU64, Ordering};

use emberos_lib::{IrqMutex, klog_debug, klog_warn};

pub const KERNEL_HEAP_SIZE: usize = 1 << 20;

struct HeapCursor {
    next: usize,
}

/// Bump allocator intended for registration as `#[global_allocator]` by the
/// kernel binary.
pub struct BumpAllocator {
    cursor: IrqMutex<HeapCursor>,
    arena: UnsafeCell<[u8; KERNEL_HEAP_SIZE]>,
}

// SAFETY: the cursor lock serializes all arena carving; handed-out blocks are
// disjoint.
unsafe impl Sync for BumpAllocator {}

static ALLOCATION_COUNT: AtomicU64 = AtomicU64::new(0);
static EXHAUSTED_COUNT: AtomicU64 = AtomicU64::new(0);

impl BumpAllocator {
    pub const fn new() -> Self {
        Self {
            cursor: IrqMutex::new(HeapCursor { next: 0 }),
            arena: UnsafeCell::new([0; KERNEL_HEAP_SIZE]),
        }
    }

    /// Bytes handed out so far.
    pub fn used(&self) -> usize {
        self.cursor.lock().next
    }
}

unsafe impl GlobalAlloc for BumpAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let base = self.arena.get() as *mut u8;
        let mut cursor = self.cursor.lock();

        let start = (base as usize + cursor.next).next_multiple_of(layout.align().max(1));
        let offset = start - base as usize;
        let Some(end) = offset.checked_add(layout.size()) else {
            return ptr::null_mut();
        };
        if end > KERNEL_HEAP_SIZE {
            EXHAUSTED_COUNT.fetch_add(1, Ordering::Relaxed);
            klog_warn!(
                "MM: Kernel heap exhausted ({} bytes requested, {} free)",
                layout.size(),
                KERNEL_HEAP_SIZE - cursor.next
            );
            return ptr::null_mut();
        }

        cursor.next = end;
        ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
        start as *mut u8
    }

    unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {
        // Bump allocator: freed blocks are leaked.
    }
}

/// Number of successful allocations, for boot diagnostics.
pub fn allocation_count() -> u64 {
    ALLOCATION_COUNT.load(Ordering::Relaxed)
}

/// Number of failed allocations.
pub fn exhausted_count() -> u64 {
    EXHAUSTED_COUNT.load(Ordering::Relaxed)
}

pub fn log_heap_stats() {
    klog_debug!(
        "MM: Heap: {} allocations, {} failures",
        allocation_count(),
        exhausted_count()
    );
}
