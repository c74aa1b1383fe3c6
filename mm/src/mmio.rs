//! Memory-mapped I/O regions.

use emberos_abi::addr::PhysAddr;

use crate::hhdm::PhysAddrHhdm;

/// A bounds-checked window onto device registers, reached through the HHDM.
pub struct MmioRegion {
    base: *mut u8,
    size: usize,
}

// SAFETY: device registers are not subject to Rust aliasing; all access goes
// through volatile reads/writes.
unsafe impl Send for MmioRegion {}
unsafe impl Sync for MmioRegion {}

impl MmioRegion {
    /// Map `size` bytes of device memory at `phys`.
    ///
    /// Returns `None` until the HHDM offset has been recorded.
    pub fn map(phys: PhysAddr, size: usize) -> Option<Self> {
        let virt = phys.to_virt_checked()?;
        Some(Self {
            base: virt.as_mut_ptr::<u8>(),
            size,
        })
    }

    #[inline]
    pub fn virt_base(&self) -> u64 {
        self.base as u64
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        debug_assert!(offset + 4 <= self.size);
        // SAFETY: offset is within the mapped window; volatile because the
        // device may change the value behind our back.
        unsafe { core::ptr::read_volatile(self.base.add(offset) as *const u32) }
    }

    pub fn write_u32(&self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= self.size);
        // SAFETY: offset is within the mapped window.
        unsafe { core::ptr::write_volatile(self.base.add(offset) as *mut u32, value) }
    }
}
