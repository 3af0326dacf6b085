// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    before_first_start = { 0, 0 },
    after_first_crash = { 1, 1 },
    second = { 2, 2 },
    third = { 3, 4 },
    fourth = { 4, 8 },
    fifth = { 5, 16 },
    ninth = { 9, 256 },
    capped = { 10, 300 },
    deep_in = { 50, 300 },
)]
fn backoff_doubles_then_caps(restart_count: u32, expected_secs: u64) {
    assert_eq!(restart_delay(restart_count), Duration::from_secs(expected_secs));
}

#[test]
fn backoff_is_monotonic_until_the_cap() {
    let mut previous = Duration::ZERO;
    for count in 0..20 {
        let delay = restart_delay(count);
        assert!(delay >= previous, "backoff shrank at count {count}");
        previous = delay;
    }
}
