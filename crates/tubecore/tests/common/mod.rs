//! Common test utilities
//!
//! Shared by the integration tests in this directory.

pub mod fake_gateway;
pub mod presenter;

#[allow(unused_imports)]
pub use fake_gateway::{FakeGateway, Step};
#[allow(unused_imports)]
pub use presenter::{RecordingPresenter, Shown};

use std::time::Duration;

/// Asserts that `actual` is `expected_ms` milliseconds, give or take the
/// timer's one millisecond granularity.
#[allow(dead_code)]
pub fn assert_about_ms(actual: Duration, expected_ms: u64) {
    let actual_ms = actual.as_millis() as i128;
    assert!(
        (actual_ms - expected_ms as i128).abs() <= 2,
        "expected ~{}ms, got {:?}",
        expected_ms,
        actual
    );
}
