//! GDT and TSS layout types (Intel SDM Vol. 3A, ch. 3 and 8).
//!
//! The kernel uses a fixed five-slot GDT: null, kernel code, kernel data and a
//! two-slot 64-bit TSS descriptor.

use core::mem;

/// Number of `u64` slots in the GDT (the TSS descriptor occupies two).
pub const GDT_ENTRY_COUNT: usize = 5;

/// 64-bit kernel code segment: present, ring 0, executable, long mode.
pub const GDT_KERNEL_CODE: u64 = 0x00AF_9B00_0000_FFFF;

/// Kernel data segment: present, ring 0, writable.
pub const GDT_KERNEL_DATA: u64 = 0x00CF_9300_0000_FFFF;

/// Slot layout of [`GdtLayout::entries`] before the TSS descriptor is filled in.
pub const GDT_STANDARD_ENTRIES: [u64; GDT_ENTRY_COUNT] =
    [0, GDT_KERNEL_CODE, GDT_KERNEL_DATA, 0, 0];

/// A segment selector value as loaded into a segment register or IDT gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct SegmentSelector(u16);

impl SegmentSelector {
    pub const KERNEL_CODE: Self = Self(0x08);
    pub const KERNEL_DATA: Self = Self(0x10);
    pub const TSS: Self = Self(0x18);

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

/// 64-bit Task State Segment. Field offsets are architectural; `packed(4)`
/// removes the padding a plain `repr(C)` would insert after `reserved0`.
#[repr(C, packed(4))]
#[derive(Clone, Copy)]
pub struct Tss64 {
    reserved0: u32,
    pub rsp0: u64,
    pub rsp1: u64,
    pub rsp2: u64,
    reserved1: u64,
    /// IST slots 1..=7 (index 0 holds IST1).
    pub ist: [u64; 7],
    reserved2: u64,
    reserved3: u16,
    pub iomap_base: u16,
}

impl Tss64 {
    pub const fn new() -> Self {
        Self {
            reserved0: 0,
            rsp0: 0,
            rsp1: 0,
            rsp2: 0,
            reserved1: 0,
            ist: [0; 7],
            reserved2: 0,
            reserved3: 0,
            iomap_base: 0,
        }
    }
}

/// In-memory GDT image. 16-byte aligned so `lgdt` is happy on every core.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub struct GdtLayout {
    pub entries: [u64; GDT_ENTRY_COUNT],
}

impl GdtLayout {
    pub const fn new() -> Self {
        Self {
            entries: [0; GDT_ENTRY_COUNT],
        }
    }

    /// Fill the two TSS descriptor slots for the given TSS.
    ///
    /// The TSS must outlive every use of this GDT; its address is embedded in
    /// the descriptor.
    pub fn load_tss(&mut self, tss: &Tss64) {
        let base = tss as *const Tss64 as u64;
        let limit = (mem::size_of::<Tss64>() - 1) as u64;

        // 64-bit available TSS: type 0x9, present, byte granularity.
        let low = (limit & 0xFFFF)
            | ((base & 0xFFFF) << 16)
            | (((base >> 16) & 0xFF) << 32)
            | (0x89u64 << 40)
            | (((limit >> 16) & 0xF) << 48)
            | (((base >> 24) & 0xFF) << 56);
        let high = base >> 32;

        let tss_slot = (SegmentSelector::TSS.bits() >> 3) as usize;
        self.entries[tss_slot] = low;
        self.entries[tss_slot + 1] = high;
    }
}

/// The `{limit, base}` pair consumed by `lgdt`.
#[repr(C, packed)]
pub struct GdtDescriptor {
    pub limit: u16,
    pub base: u64,
}

impl GdtDescriptor {
    pub fn from_layout(layout: &GdtLayout) -> Self {
        Self {
            limit: (mem::size_of::<GdtLayout>() - 1) as u16,
            base: layout as *const GdtLayout as u64,
        }
    }
}
