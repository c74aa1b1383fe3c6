//! Assertion macros returning TestResult on failure.

#[macro_export]
macro_rules! assert_test {
    ($cond:expr) => {{
        if !$cond {
            $crate::klog_info!("ASSERT: condition failed");
            return $crate::testing::TestResult::Fail;
        }
    }};
    ($cond:expr, $msg:expr) => {{
        if !$cond {
            $crate::klog_info!("ASSERT: {}", $msg);
            return $crate::testing::TestResult::Fail;
        }
    }};
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {{
        if !$cond {
            $crate::klog_info!(concat!("ASSERT: ", $fmt), $($arg)*);
            return $crate::testing::TestResult::Fail;
        }
    }};
}

#[macro_export]
macro_rules! assert_eq_test {
    ($left:expr, $right:expr) => {{
        let left = $left;
        let right = $right;
        if left != right {
            $crate::klog_info!("ASSERT_EQ: expected {:?}, got {:?}", right, left);
            return $crate::testing::TestResult::Fail;
        }
    }};
    ($left:expr, $right:expr, $msg:expr) => {{
        let left = $left;
        let right = $right;
        if left != right {
            $crate::klog_info!("ASSERT_EQ: {} - expected {:?}, got {:?}", $msg, right, left);
            return $crate::testing::TestResult::Fail;
        }
    }};
}

#[macro_export]
macro_rules! assert_ne_test {
    ($left:expr, $right:expr) => {{
        let left = $left;
        let right = $right;
        if left == right {
            $crate::klog_info!("ASSERT_NE: values should differ, both are {:?}", left);
            return $crate::testing::TestResult::Fail;
        }
    }};
}

#[macro_export]
macro_rules! assert_not_null {
    ($ptr:expr) => {{
        if $ptr.is_null() {
            $crate::klog_info!("ASSERT_NOT_NULL: pointer is null");
            return $crate::testing::TestResult::Fail;
        }
    }};
    ($ptr:expr, $msg:expr) => {{
        if $ptr.is_null() {
            $crate::klog_info!("ASSERT_NOT_NULL: {}", $msg);
            return $crate::testing::TestResult::Fail;
        }
    }};
}
