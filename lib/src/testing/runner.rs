use crate::klog_info;
use crate::testing::TestResult;

/// Run one test body and log its outcome.
pub fn run_single_test(name: &str, test: impl FnOnce() -> TestResult) -> TestResult {
    let result = test();
    match result {
        TestResult::Pass => crate::klog_debug!("TEST: {} ... ok", name),
        TestResult::Fail => klog_info!("TEST: {} ... FAILED", name),
        TestResult::Skipped => klog_info!("TEST: {} ... skipped", name),
    }
    result
}
