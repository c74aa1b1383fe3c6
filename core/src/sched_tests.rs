//! Scheduler slot tests.

use emberos_abi::addr::PhysAddr;
use emberos_lib::testing::TestResult;
use emberos_lib::{assert_eq_test, assert_ne_test, assert_test, cpu, pass};

use crate::sched;

pub fn test_process_create_assigns_distinct_ids() -> TestResult {
    let root = PhysAddr::new(cpu::read_cr3());
    let a = sched::process_create(root);
    let b = sched::process_create(root);
    assert_test!(a.is_some(), "first create");
    assert_test!(b.is_some(), "second create");
    assert_ne_test!(a, b);
    pass!()
}

pub fn test_current_process_slot_roundtrip() -> TestResult {
    let root = PhysAddr::new(cpu::read_cr3());
    let Some(id) = sched::process_create(root) else {
        return emberos_lib::fail!("process table full");
    };

    sched::set_current_process(None);
    assert_eq_test!(sched::current_process(), None, "slot reads back empty");
    sched::set_current_process(Some(id));
    assert_eq_test!(sched::current_process(), Some(id));
    sched::set_current_process(None);
    assert_eq_test!(sched::current_process(), None);
    pass!()
}

pub fn test_load_address_space_records_process() -> TestResult {
    let root = PhysAddr::new(cpu::read_cr3());
    let Some(id) = sched::process_create(root) else {
        return emberos_lib::fail!("process table full");
    };

    sched::load_address_space(id);
    assert_eq_test!(sched::last_loaded_address_space(), Some(id));
    assert_eq_test!(sched::process_address_space_root(id), Some(root));
    pass!()
}

pub fn test_load_unknown_process_is_ignored() -> TestResult {
    let root = PhysAddr::new(cpu::read_cr3());
    let Some(id) = sched::process_create(root) else {
        return emberos_lib::fail!("process table full");
    };
    sched::load_address_space(id);

    // A bogus id must neither load CR3 nor disturb the diagnostics.
    sched::load_address_space(0xDEAD_BEEF);
    assert_eq_test!(sched::last_loaded_address_space(), Some(id));
    pass!()
}

pub fn test_lookup_unknown_process_root() -> TestResult {
    assert_eq_test!(sched::process_address_space_root(0xDEAD_BEEF), None);
    pass!()
}

emberos_lib::define_test_suite!(
    sched,
    [
        test_process_create_assigns_distinct_ids,
        test_current_process_slot_roundtrip,
        test_load_address_space_records_process,
        test_load_unknown_process_is_ignored,
        test_lookup_unknown_process_root,
    ]
);
