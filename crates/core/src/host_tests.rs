// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::NaiveDate;
use yare::parameterized;

fn at(year: i32, month: u32, day: u32, hour: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

#[parameterized(
    weekday_morning_before_peak = { at(2026, 8, 5, 7), true },   // Wednesday
    weekday_peak_start = { at(2026, 8, 5, 8), false },
    weekday_midday = { at(2026, 8, 5, 12), false },
    weekday_peak_end = { at(2026, 8, 5, 18), true },
    weekday_evening = { at(2026, 8, 5, 23), true },
    saturday_midday = { at(2026, 8, 8, 12), true },
    sunday_midday = { at(2026, 8, 9, 12), true },
)]
fn off_peak_window(now: chrono::NaiveDateTime, expected: bool) {
    assert_eq!(ActivationPolicy::OffPeak.qualifies(&now), expected);
}

#[test]
fn always_and_passive_ignore_the_clock() {
    let midday = at(2026, 8, 5, 12);
    assert!(ActivationPolicy::Always.qualifies(&midday));
    assert!(!ActivationPolicy::Passive.qualifies(&midday));
}

#[test]
fn volunteer_hosts_default_to_passive_convert() {
    let host = Host::volunteer(HostName::from("render9"));
    assert_eq!(host.policy, ActivationPolicy::Passive);
    assert_eq!(host.provisioning, Provisioning::ConvertDb);
}
