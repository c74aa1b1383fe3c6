//! Exception classification helpers.

use core::fmt;

use bitflags::bitflags;

pub fn get_exception_name(vector: u8) -> &'static str {
    match vector {
        0 => "Divide Error",
        1 => "Debug",
        2 => "Non-Maskable Interrupt",
        3 => "Breakpoint",
        4 => "Overflow",
        5 => "Bound Range Exceeded",
        6 => "Invalid Opcode",
        7 => "Device Not Available",
        8 => "Double Fault",
        9 => "Coprocessor Segment Overrun",
        10 => "Invalid TSS",
        11 => "Segment Not Present",
        12 => "Stack Segment Fault",
        13 => "General Protection Fault",
        14 => "Page Fault",
        15 => "Reserved",
        16 => "x87 FPU Error",
        17 => "Alignment Check",
        18 => "Machine Check",
        19 => "SIMD Floating-Point Exception",
        20 => "Virtualization Exception",
        21 => "Control Protection Exception",
        22..=31 => "Reserved",
        _ => "Unknown",
    }
}

bitflags! {
    /// Page-fault error code pushed by the CPU for vector 14.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PageFaultErrorCode: u64 {
        /// Set when the fault was a protection violation on a present page;
        /// clear when the page was simply not present.
        const PROTECTION = 1 << 0;
        /// Set for a write access, clear for a read.
        const WRITE = 1 << 1;
        /// Set when the access originated at CPL 3.
        const USER = 1 << 2;
        /// Reserved bit set in a paging structure.
        const RESERVED_WRITE = 1 << 3;
        /// Instruction fetch.
        const INSTRUCTION_FETCH = 1 << 4;
    }
}

impl fmt::Display for PageFaultErrorCode {
    /// Human-readable tag sequence, e.g. `Page Protection, Write, Executed`.
    /// An all-clear code still reads as `Read`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: [&str; 5] = [""; 5];
        let mut count = 0;

        if self.contains(Self::PROTECTION) {
            tags[count] = "Page Protection";
            count += 1;
        }
        tags[count] = if self.contains(Self::WRITE) {
            "Write"
        } else {
            "Read"
        };
        count += 1;
        if self.contains(Self::USER) {
            tags[count] = "CPL=3";
            count += 1;
        }
        if self.contains(Self::RESERVED_WRITE) {
            tags[count] = "Reserved Write";
            count += 1;
        }
        if self.contains(Self::INSTRUCTION_FETCH) {
            tags[count] = "Executed";
            count += 1;
        }

        for (index, tag) in tags[..count].iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(tag)?;
        }
        Ok(())
    }
}
