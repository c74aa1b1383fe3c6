//! One-way initialization flag for boot-time subsystems.

use core::sync::atomic::{AtomicBool, Ordering};

pub struct InitFlag {
    set: AtomicBool,
}

impl InitFlag {
    #[inline]
    pub const fn new() -> Self {
        Self {
            set: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn mark_set(&self) {
        self.set.store(true, Ordering::Release);
    }

    #[inline]
    pub fn reset(&self) {
        self.set.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_set_relaxed(&self) -> bool {
        self.set.load(Ordering::Relaxed)
    }
}
