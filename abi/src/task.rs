//! Process identifiers shared between the scheduler and its clients.

/// Identifier for a scheduler process slot.
pub type ProcessId = u32;

/// Sentinel for "no process".
pub const INVALID_PROCESS_ID: ProcessId = 0xFFFF_FFFF;

/// Capacity of the boot-time process table.
pub const MAX_PROCESSES: usize = 64;
