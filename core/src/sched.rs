//! Scheduler surface used by the interrupt core.
//!
//! The dispatcher needs exactly two operations from the scheduler: reading
//! the current-process slot and loading a process's address space. They are
//! kept in their own module so the interrupt path never grows a dependency
//! on scheduling policy.

use core::sync::atomic::{AtomicU32, Ordering};

use emberos_abi::addr::PhysAddr;
use emberos_abi::task::{INVALID_PROCESS_ID, MAX_PROCESSES, ProcessId};
use emberos_lib::{InitFlag, IrqMutex, cpu, klog_debug, klog_warn};

#[derive(Clone, Copy)]
pub struct Process {
    pub id: ProcessId,
    /// Physical address of the process's PML4.
    pub address_space_root: PhysAddr,
}

struct ProcessTable {
    slots: [Option<Process>; MAX_PROCESSES],
    next_id: ProcessId,
}

impl ProcessTable {
    const fn new() -> Self {
        Self {
            slots: [None; MAX_PROCESSES],
            next_id: 1,
        }
    }

    fn lookup(&self, id: ProcessId) -> Option<Process> {
        self.slots.iter().flatten().find(|p| p.id == id).copied()
    }
}

static PROCESS_TABLE: IrqMutex<ProcessTable> = IrqMutex::new(ProcessTable::new());
static SCHED_INIT: InitFlag = InitFlag::new();

/// The current-process slot. `INVALID_PROCESS_ID` encodes "none".
static CURRENT_PROCESS: AtomicU32 = AtomicU32::new(INVALID_PROCESS_ID);

/// Last process whose address space was loaded, for diagnostics.
static LAST_LOADED: AtomicU32 = AtomicU32::new(INVALID_PROCESS_ID);

pub fn init() {
    {
        let mut table = PROCESS_TABLE.lock();
        table.slots = [None; MAX_PROCESSES];
        table.next_id = 1;
    }
    CURRENT_PROCESS.store(INVALID_PROCESS_ID, Ordering::Relaxed);
    LAST_LOADED.store(INVALID_PROCESS_ID, Ordering::Relaxed);
    SCHED_INIT.mark_set();
    klog_debug!("SCHED: Process table initialized ({} slots)", MAX_PROCESSES);
}

pub fn is_initialized() -> bool {
    SCHED_INIT.is_set_relaxed()
}

/// Allocate a process slot for the given page-table root.
///
/// Returns `None` when the table is full.
pub fn process_create(address_space_root: PhysAddr) -> Option<ProcessId> {
    let mut table = PROCESS_TABLE.lock();
    let id = table.next_id;
    let slot = table.slots.iter_mut().find(|s| s.is_none())?;
    *slot = Some(Process {
        id,
        address_space_root,
    });
    table.next_id += 1;
    klog_debug!(
        "SCHED: Created process {} (cr3 0x{:x})",
        id,
        address_space_root.as_u64()
    );
    Some(id)
}

pub fn current_process() -> Option<ProcessId> {
    match CURRENT_PROCESS.load(Ordering::Relaxed) {
        INVALID_PROCESS_ID => None,
        id => Some(id),
    }
}

pub fn set_current_process(process: Option<ProcessId>) {
    CURRENT_PROCESS.store(process.unwrap_or(INVALID_PROCESS_ID), Ordering::Relaxed);
}

pub fn process_address_space_root(id: ProcessId) -> Option<PhysAddr> {
    PROCESS_TABLE.lock().lookup(id).map(|p| p.address_space_root)
}

/// Activate a process's address space.
///
/// Writes CR3; does not touch the current-process slot. An unknown id is
/// logged and ignored rather than loading a garbage root.
pub fn load_address_space(id: ProcessId) {
    let Some(root) = process_address_space_root(id) else {
        klog_warn!("SCHED: Address space load for unknown process {}", id);
        return;
    };
    cpu::write_cr3(root.as_u64());
    LAST_LOADED.store(id, Ordering::Relaxed);
}

/// Last process activated via [`load_address_space`], for diagnostics.
pub fn last_loaded_address_space() -> Option<ProcessId> {
    match LAST_LOADED.load(Ordering::Relaxed) {
        INVALID_PROCESS_ID => None,
        id => Some(id),
    }
}
