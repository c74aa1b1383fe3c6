//! Kernel logging.
//!
//! Log lines funnel through a single backend function pointer. Before any
//! driver has registered itself the fallback writes straight to COM1 via raw
//! port I/O, so logging works from the first instruction of `kernel_init`.
//!
//! A backend receives the pre-formatted arguments for one log line and must
//! write the text plus a trailing newline atomically with respect to other
//! log calls.

use core::fmt;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

use crate::ports::{COM1, serial_write_bytes};

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KlogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(KlogLevel::Info as u8);

#[inline(always)]
fn is_enabled(level: KlogLevel) -> bool {
    level as u8 <= CURRENT_LEVEL.load(Ordering::Relaxed)
}

/// Signature of a klog backend.
pub type KlogBackend = fn(fmt::Arguments<'_>);

/// Null means "use the early-boot COM1 fallback".
static BACKEND: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

fn early_backend(args: fmt::Arguments<'_>) {
    struct EarlyWriter;

    impl fmt::Write for EarlyWriter {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            unsafe { serial_write_bytes(COM1, s.as_bytes()) };
            Ok(())
        }
    }

    let _ = fmt::write(&mut EarlyWriter, args);
    unsafe { serial_write_bytes(COM1, b"\n") };
}

/// Register a backend that replaces the early-boot COM1 fallback.
pub fn klog_register_backend(backend: KlogBackend) {
    BACKEND.store(backend as *mut (), Ordering::Release);
}

/// Set the default level. Called very early in boot.
pub fn klog_init() {
    CURRENT_LEVEL.store(KlogLevel::Info as u8, Ordering::Relaxed);
}

pub fn klog_set_level(level: KlogLevel) {
    CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn klog_get_level() -> KlogLevel {
    match CURRENT_LEVEL.load(Ordering::Relaxed) {
        0 => KlogLevel::Error,
        1 => KlogLevel::Warn,
        2 => KlogLevel::Info,
        3 => KlogLevel::Debug,
        _ => KlogLevel::Trace,
    }
}

/// Emit one formatted log line at `level`. The backend appends the newline;
/// callers must not include one.
pub fn log_args(level: KlogLevel, args: fmt::Arguments<'_>) {
    if !is_enabled(level) {
        return;
    }
    let ptr = BACKEND.load(Ordering::Acquire);
    if ptr.is_null() {
        early_backend(args);
    } else {
        // SAFETY: only `klog_register_backend` stores into BACKEND, and it
        // stores valid `KlogBackend` fn pointers.
        let backend: KlogBackend = unsafe { core::mem::transmute(ptr) };
        backend(args);
    }
}

#[macro_export]
macro_rules! klog_error {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Error, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_warn {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Warn, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_info {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Info, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_debug {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Debug, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_trace {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Trace, ::core::format_args!($($arg)*))
    };
}
