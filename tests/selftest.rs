//! The built-in self-test must pass on whatever CPU runs the suite.

#[test]
fn built_in_self_test_passes() {
    xsalsa20::self_test().unwrap();
}
