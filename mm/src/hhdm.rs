//! Higher-half direct map bookkeeping.
//!
//! The bootloader maps all physical memory at a fixed virtual offset; that
//! offset is recorded here once during early boot and used for every
//! phys-to-virt translation (notably the LAPIC MMIO window).

use core::sync::atomic::{AtomicU64, Ordering};

use emberos_abi::addr::{PhysAddr, VirtAddr};
use emberos_lib::klog_debug;

static HHDM_OFFSET: AtomicU64 = AtomicU64::new(0);

/// Record the direct-map offset reported by the bootloader.
pub fn set_hhdm_offset(offset: u64) {
    HHDM_OFFSET.store(offset, Ordering::Release);
    klog_debug!("MM: HHDM offset 0x{:x}", offset);
}

pub fn hhdm_offset() -> u64 {
    HHDM_OFFSET.load(Ordering::Acquire)
}

pub fn is_initialized() -> bool {
    hhdm_offset() != 0
}

/// Direct-map translation for [`PhysAddr`].
pub trait PhysAddrHhdm {
    fn to_virt(self) -> VirtAddr;
    fn to_virt_checked(self) -> Option<VirtAddr>;
}

impl PhysAddrHhdm for PhysAddr {
    #[inline]
    fn to_virt(self) -> VirtAddr {
        VirtAddr::new(self.as_u64() + hhdm_offset())
    }

    #[inline]
    fn to_virt_checked(self) -> Option<VirtAddr> {
        if is_initialized() {
            Some(self.to_virt())
        } else {
            None
        }
    }
}
