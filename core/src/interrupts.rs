//! Interrupt dispatch framework.
//!
//! Every vector funnels through [`interrupt_dispatch`], called by the common
//! assembly entry with a pointer to the saved frame. Fixed policy applies to
//! the breakpoint, general-protection and page-fault exceptions; everything
//! else is multiplexed over a per-vector chain of registered handlers, each
//! optionally running inside another process's address space.
//!
//! The handler table is mutated only outside interrupt context (driver init)
//! and read inside it, so the `IrqMutex` is held for table access only and
//! never across a callback.

use core::sync::atomic::{AtomicU64, Ordering};

use alloc::vec::Vec;

use emberos_abi::task::ProcessId;
use emberos_lib::arch::exception::PageFaultErrorCode;
use emberos_lib::arch::idt::{
    EXCEPTION_BREAKPOINT, EXCEPTION_GENERAL_PROTECTION, EXCEPTION_PAGE_FAULT, IDT_ENTRIES,
};
use emberos_lib::{
    InitFlag, InterruptFrame, IrqMutex, cpu, kdiag_dump_interrupt_frame, klog_debug, klog_info,
    klog_warn, set_panic_cpu_state,
};

use crate::platform;
use crate::sched;

/// A registered interrupt callback. Returns true to claim the interrupt and
/// stop the walk down the vector's chain. The frame may be mutated; changes
/// take effect on `iretq`.
pub type InterruptCallback = fn(*mut InterruptFrame) -> bool;

#[derive(Clone, Copy)]
pub struct HandlerDescriptor {
    pub callback: InterruptCallback,
    /// When present, the callback runs with this process's address space
    /// active; the previous address space is reinstated afterwards.
    pub process: Option<ProcessId>,
}

struct HandlerTable {
    chains: [Vec<HandlerDescriptor>; IDT_ENTRIES],
}

impl HandlerTable {
    const fn new() -> Self {
        Self {
            chains: [const { Vec::new() }; IDT_ENTRIES],
        }
    }
}

static HANDLER_TABLE: IrqMutex<HandlerTable> = IrqMutex::new(HandlerTable::new());
static INTERRUPTS_INIT: InitFlag = InitFlag::new();

// Dispatch statistics. Relaxed ordering: these only feed diagnostics.
static DISPATCH_COUNT: AtomicU64 = AtomicU64::new(0);
static UNHANDLED_COUNT: AtomicU64 = AtomicU64::new(0);

/// Initialize the dispatch framework (call before handler registration).
pub fn init() {
    {
        let mut table = HANDLER_TABLE.lock();
        for chain in table.chains.iter_mut() {
            *chain = Vec::new();
        }
    }
    DISPATCH_COUNT.store(0, Ordering::Relaxed);
    UNHANDLED_COUNT.store(0, Ordering::Relaxed);
    INTERRUPTS_INIT.mark_set();
    klog_debug!("INT: Dispatch framework initialized");
}

pub fn is_initialized() -> bool {
    INTERRUPTS_INIT.is_set_relaxed()
}

/// Append a handler to a vector's chain. Handlers run in registration order.
///
/// Chain growth is fallible: on allocator exhaustion the registration is
/// logged and dropped. Registration happens at boot, where an exhausted
/// allocator is already fatal, so the caller is not burdened with an error
/// path.
pub fn register_handler(vector: u8, descriptor: HandlerDescriptor) {
    let mut table = HANDLER_TABLE.lock();
    let chain = &mut table.chains[vector as usize];
    if chain.try_reserve(1).is_err() {
        klog_warn!(
            "INT: Dropping handler registration for vector {} (allocation failed)",
            vector
        );
        return;
    }
    chain.push(descriptor);
    klog_debug!(
        "INT: Registered handler for vector {} (chain depth {})",
        vector,
        chain.len()
    );
}

/// Shorthand for a handler without an address-space requirement.
pub fn register_handler_callback(vector: u8, callback: InterruptCallback) {
    register_handler(
        vector,
        HandlerDescriptor {
            callback,
            process: None,
        },
    );
}

/// Number of handlers currently registered for a vector.
pub fn handler_count(vector: u8) -> usize {
    HANDLER_TABLE.lock().chains[vector as usize].len()
}

/// Total dispatches that reached the registry path.
pub fn dispatch_count() -> u64 {
    DISPATCH_COUNT.load(Ordering::Relaxed)
}

/// Dispatches no handler claimed.
pub fn unhandled_count() -> u64 {
    UNHANDLED_COUNT.load(Ordering::Relaxed)
}

/// High-level interrupt entry, called from the common assembly entry with a
/// pointer to the saved frame.
///
/// Returns the frame to resume from. The contract allows returning a
/// different pointer (the restore path reloads RSP from it), which is how a
/// context switch would be expressed; the registry path always returns its
/// input.
pub extern "C" fn interrupt_dispatch(frame: *mut InterruptFrame) -> *mut InterruptFrame {
    if frame.is_null() {
        klog_warn!("INT: Dispatch received null frame");
        return frame;
    }
    let frame_ref = unsafe { &mut *frame };
    let vector = (frame_ref.vector & 0xFF) as u8;

    match vector {
        EXCEPTION_BREAKPOINT => {
            kdiag_dump_interrupt_frame(frame);
            set_panic_cpu_state(frame_ref.rip, frame_ref.rsp);
            panic!("Breakpoint");
        }
        EXCEPTION_GENERAL_PROTECTION => {
            klog_info!(
                "INT: General protection fault, error 0x{:x}",
                frame_ref.error_code
            );
            kdiag_dump_interrupt_frame(frame);
            set_panic_cpu_state(frame_ref.rip, frame_ref.rsp);
            panic!("GPF");
        }
        EXCEPTION_PAGE_FAULT => page_fault_panic(frame_ref),
        _ => dispatch_to_registry(frame, vector),
    }
}

fn page_fault_panic(frame: &InterruptFrame) -> ! {
    let fault_addr = cpu::read_cr2();
    let code = PageFaultErrorCode::from_bits_truncate(frame.error_code);
    klog_info!(
        "INT: Page fault, error 0x{:x} rip=0x{:x}",
        frame.error_code,
        frame.rip
    );
    kdiag_dump_interrupt_frame(frame as *const InterruptFrame);
    set_panic_cpu_state(frame.rip, frame.rsp);
    panic!("Page fault at 0x{:x} [{}]", fault_addr, code);
}

fn dispatch_to_registry(frame: *mut InterruptFrame, vector: u8) -> *mut InterruptFrame {
    let frame_ref = unsafe { &mut *frame };
    DISPATCH_COUNT.fetch_add(1, Ordering::Relaxed);

    if !INTERRUPTS_INIT.is_set_relaxed() {
        klog_warn!("INT: Dispatch for vector {} before initialization", vector);
        platform::irq_send_eoi();
        return frame;
    }

    klog_info!(
        "INT: ss=0x{:x} vector={} rflags=0x{:x}",
        frame_ref.ss,
        vector,
        frame_ref.rflags
    );

    // Snapshot the chain length: handlers a callback registers for this same
    // vector take effect on future dispatches, never the walk in progress.
    let chain_len = HANDLER_TABLE.lock().chains[vector as usize].len();

    let mut handled = false;
    for index in 0..chain_len {
        let descriptor = HANDLER_TABLE.lock().chains[vector as usize]
            .get(index)
            .copied();
        let Some(descriptor) = descriptor else {
            break;
        };
        if invoke_handler(&descriptor, frame) {
            handled = true;
            break;
        }
    }

    if !handled {
        UNHANDLED_COUNT.fetch_add(1, Ordering::Relaxed);
        klog_warn!(
            "INT: No handler claimed vector {} (ss=0x{:x})",
            vector,
            frame_ref.ss
        );
    }

    platform::irq_send_eoi();
    frame
}

/// Run one handler, with the address-space swap when the descriptor carries a
/// process. The previous address space is reinstated before the callback's
/// verdict is even looked at, so a rejecting handler cannot leave a foreign
/// mapping active.
fn invoke_handler(descriptor: &HandlerDescriptor, frame: *mut InterruptFrame) -> bool {
    match descriptor.process {
        Some(process) => {
            let previous = sched::current_process();
            sched::load_address_space(process);
            let claimed = (descriptor.callback)(frame);
            if let Some(previous) = previous {
                sched::load_address_space(previous);
            }
            claimed
        }
        None => (descriptor.callback)(frame),
    }
}
