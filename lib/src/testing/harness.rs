// Test harness types. Suites are auto-registered via
// #[link_section = ".test_registry"] in define_test_suite! and enumerated
// through the section bounds the linker script provides.

use core::ffi::{CStr, c_char};
use core::mem;
use core::ptr;

use crate::{klog_error, klog_info};

/// Maximum number of suites a [`TestRunSummary`] can record.
pub const HARNESS_MAX_SUITES: usize = 32;

/// Cycles-per-millisecond estimate used to report elapsed time (3 GHz).
const DEFAULT_CYCLES_PER_MS: u64 = 3_000_000;

/// Result of executing a single test suite.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TestSuiteResult {
    pub name: *const c_char,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub elapsed_ms: u32,
}

impl TestSuiteResult {
    pub const fn empty() -> Self {
        Self {
            name: ptr::null(),
            total: 0,
            passed: 0,
            failed: 0,
            elapsed_ms: 0,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub type SuiteRunnerFn = fn(*mut TestSuiteResult) -> i32;

/// One entry in the `.test_registry` section.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TestSuiteDesc {
    pub name: *const c_char,
    pub run: Option<SuiteRunnerFn>,
}

// SAFETY: only raw pointers to static data and function pointers; read-only
// after link time.
unsafe impl Sync for TestSuiteDesc {}

/// Aggregated results from running every registered suite.
#[repr(C)]
pub struct TestRunSummary {
    pub suites: [TestSuiteResult; HARNESS_MAX_SUITES],
    pub suite_count: usize,
    pub total_tests: u32,
    pub passed: u32,
    pub failed: u32,
    pub elapsed_ms: u32,
}

impl TestRunSummary {
    pub const fn empty() -> Self {
        Self {
            suites: [TestSuiteResult::empty(); HARNESS_MAX_SUITES],
            suite_count: 0,
            total_tests: 0,
            passed: 0,
            failed: 0,
            elapsed_ms: 0,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub fn measure_elapsed_ms(start_cycles: u64, end_cycles: u64) -> u32 {
    let delta = end_cycles.saturating_sub(start_cycles);
    (delta / DEFAULT_CYCLES_PER_MS) as u32
}

// Section bounds provided by the kernel linker script.
unsafe extern "C" {
    static __start_test_registry: u8;
    static __stop_test_registry: u8;
}

/// All suites registered via `define_test_suite!`.
pub fn registered_suites() -> &'static [TestSuiteDesc] {
    // SAFETY: the linker script bounds the .test_registry section with these
    // symbols, and the section holds only `TestSuiteDesc` values.
    unsafe {
        let start = &raw const __start_test_registry as *const TestSuiteDesc;
        let stop = &raw const __stop_test_registry as *const TestSuiteDesc;
        let bytes = stop as usize - start as usize;
        let count = bytes / mem::size_of::<TestSuiteDesc>();
        core::slice::from_raw_parts(start, count)
    }
}

fn suite_name(name: *const c_char) -> &'static str {
    if name.is_null() {
        return "<unnamed>";
    }
    unsafe { CStr::from_ptr(name) }.to_str().unwrap_or("<bad utf-8>")
}

/// Run every registered suite and log a per-suite and overall summary.
pub fn run_all_suites() -> TestRunSummary {
    let mut summary = TestRunSummary::empty();
    let suites = registered_suites();

    klog_info!("TEST: Running {} suite(s)", suites.len());

    for desc in suites {
        let Some(run) = desc.run else {
            continue;
        };
        if summary.suite_count >= HARNESS_MAX_SUITES {
            klog_error!("TEST: Suite capacity exceeded, skipping remaining suites");
            break;
        }

        let mut result = TestSuiteResult::empty();
        let _ = run(&mut result);

        klog_info!(
            "TEST: Suite '{}': {}/{} passed ({} ms)",
            suite_name(result.name),
            result.passed,
            result.total,
            result.elapsed_ms
        );

        summary.total_tests += result.total;
        summary.passed += result.passed;
        summary.failed += result.failed;
        summary.elapsed_ms += result.elapsed_ms;
        summary.suites[summary.suite_count] = result;
        summary.suite_count += 1;
    }

    if summary.all_passed() {
        klog_info!(
            "TEST: All {} tests passed across {} suites",
            summary.total_tests,
            summary.suite_count
        );
    } else {
        klog_error!(
            "TEST: {} of {} tests FAILED",
            summary.failed,
            summary.total_tests
        );
    }

    summary
}
