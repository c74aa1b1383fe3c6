//! Local APIC driver.
//!
//! The interrupt core needs exactly one thing from the LAPIC at runtime: the
//! end-of-interrupt write issued after every dispatched vector. Detection and
//! the one-time enable live here too; the IOAPIC is a separate concern and
//! merely feeds vectors into the IDT.

use core::sync::atomic::{AtomicU64, Ordering};

use spin::Once;

use emberos_abi::PAGE_SIZE;
use emberos_abi::addr::PhysAddr;
use emberos_abi::arch::x86_64::apic::{
    ApicBaseMsr, LAPIC_EOI, LAPIC_ESR, LAPIC_ID, LAPIC_LVT_DELIVERY_MODE_EXTINT, LAPIC_LVT_ERROR,
    LAPIC_LVT_LINT0, LAPIC_LVT_LINT1, LAPIC_LVT_MASKED, LAPIC_LVT_PERFCNT, LAPIC_LVT_TIMER,
    LAPIC_SPURIOUS, LAPIC_SPURIOUS_ENABLE, LAPIC_VERSION,
};
use emberos_abi::arch::x86_64::cpuid::{CPUID_FEAT_EDX_APIC, CPUID_LEAF_FEATURES};
use emberos_abi::arch::x86_64::msr::Msr;
use emberos_lib::{InitFlag, cpu, klog_debug, klog_info};
use emberos_mm::mmio::MmioRegion;

const APIC_REGION_SIZE: usize = PAGE_SIZE as usize;

static APIC_AVAILABLE: InitFlag = InitFlag::new();
static APIC_ENABLED: InitFlag = InitFlag::new();
static APIC_BASE_PHYSICAL: AtomicU64 = AtomicU64::new(0);

/// MMIO window over the LAPIC register page, mapped once during detect().
static APIC_REGS: Once<MmioRegion> = Once::new();

/// Probe CPUID for a Local APIC and map its register page.
pub fn detect() -> bool {
    let (_, _, _, edx) = cpu::cpuid(CPUID_LEAF_FEATURES);
    if edx & CPUID_FEAT_EDX_APIC == 0 {
        klog_debug!("APIC: Local APIC is not available");
        APIC_AVAILABLE.reset();
        return false;
    }
    APIC_AVAILABLE.mark_set();

    let apic_base_msr = cpu::read_msr(Msr::APIC_BASE.address());
    let apic_phys = apic_base_msr & ApicBaseMsr::ADDR_MASK;
    APIC_BASE_PHYSICAL.store(apic_phys, Ordering::Relaxed);

    match MmioRegion::map(PhysAddr::new(apic_phys), APIC_REGION_SIZE) {
        Some(region) => {
            klog_debug!(
                "APIC: Registers at phys 0x{:x}, virt 0x{:x}",
                apic_phys,
                region.virt_base()
            );
            APIC_REGS.call_once(|| region);
            true
        }
        None => {
            klog_info!("APIC: ERROR - Failed to map APIC registers");
            APIC_AVAILABLE.reset();
            false
        }
    }
}

/// Enable the LAPIC and mask every local vector source.
pub fn init() -> i32 {
    if !is_available() {
        klog_info!("APIC: Cannot initialize - APIC not available");
        return -1;
    }

    let mut apic_base_msr = cpu::read_msr(Msr::APIC_BASE.address());
    if apic_base_msr & ApicBaseMsr::GLOBAL_ENABLE == 0 {
        apic_base_msr |= ApicBaseMsr::GLOBAL_ENABLE;
        cpu::write_msr(Msr::APIC_BASE.address(), apic_base_msr);
        klog_debug!("APIC: Enabled globally via MSR");
    }

    let mut spurious = read_register(LAPIC_SPURIOUS);
    spurious |= LAPIC_SPURIOUS_ENABLE;
    spurious |= 0xFF;
    write_register(LAPIC_SPURIOUS, spurious);

    write_register(LAPIC_LVT_TIMER, LAPIC_LVT_MASKED);
    write_register(LAPIC_LVT_LINT0, LAPIC_LVT_MASKED);
    write_register(LAPIC_LVT_LINT1, LAPIC_LVT_MASKED);
    write_register(LAPIC_LVT_ERROR, LAPIC_LVT_MASKED);
    write_register(LAPIC_LVT_PERFCNT, LAPIC_LVT_MASKED);

    write_register(LAPIC_LVT_LINT0, LAPIC_LVT_DELIVERY_MODE_EXTINT);

    write_register(LAPIC_ESR, 0);
    write_register(LAPIC_ESR, 0);

    APIC_ENABLED.mark_set();
    send_eoi();

    klog_debug!(
        "APIC: ID 0x{:x}, version 0x{:x}",
        get_id(),
        get_version()
    );
    0
}

pub fn is_available() -> bool {
    APIC_AVAILABLE.is_set_relaxed()
}

pub fn is_enabled() -> bool {
    APIC_ENABLED.is_set_relaxed()
}

/// Signal end-of-interrupt. Any write value acknowledges; zero by convention.
pub fn send_eoi() {
    if !is_enabled() {
        return;
    }
    write_register(LAPIC_EOI, 0);
}

pub fn get_id() -> u32 {
    if !is_available() {
        return 0;
    }
    read_register(LAPIC_ID) >> 24
}

pub fn get_version() -> u32 {
    if !is_available() {
        return 0;
    }
    read_register(LAPIC_VERSION) & 0xFF
}

pub fn read_register(reg: u32) -> u32 {
    if !is_available() {
        return 0;
    }
    APIC_REGS.get().map(|r| r.read_u32(reg as usize)).unwrap_or(0)
}

pub fn write_register(reg: u32, value: u32) {
    if !is_available() {
        return;
    }
    if let Some(r) = APIC_REGS.get() {
        r.write_u32(reg as usize, value);
    }
}
