// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote host registry records and activation policy.

use chrono::{Datelike, Timelike, Weekday};
use std::fmt;
use std::path::PathBuf;

/// Name (or address text) of a remote rendering host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostName(String);

impl HostName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HostName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HostName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// When the controller should keep a worker running on a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPolicy {
    /// A worker should run at all times.
    Always,
    /// A worker should run outside weekday business hours.
    OffPeak,
    /// Never auto-started; the host may volunteer a connection.
    Passive,
}

/// Start of the weekday window during which off-peak hosts are left alone.
const PEAK_START_HOUR: u32 = 8;
/// End of that window (exclusive).
const PEAK_END_HOUR: u32 = 18;

impl ActivationPolicy {
    /// Whether a worker should be active on a host with this policy right
    /// now.
    ///
    /// Deliberately timezone-naive: weekday and hour-of-day of the local
    /// wall clock only.
    pub fn qualifies<T: Datelike + Timelike>(self, now: &T) -> bool {
        match self {
            ActivationPolicy::Always => true,
            ActivationPolicy::Passive => false,
            ActivationPolicy::OffPeak => {
                let weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
                weekend || now.hour() < PEAK_START_HOUR || now.hour() >= PEAK_END_HOUR
            }
        }
    }
}

impl fmt::Display for ActivationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationPolicy::Always => write!(f, "always"),
            ActivationPolicy::OffPeak => write!(f, "night"),
            ActivationPolicy::Passive => write!(f, "passive"),
        }
    }
}

/// How a host gets the model database before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    /// The database is already present; just change into the remote dir.
    CdOnly,
    /// Convert and ship the database at launch time.
    ConvertDb,
}

impl fmt::Display for Provisioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provisioning::CdOnly => write!(f, "cd"),
            Provisioning::ConvertDb => write!(f, "convert"),
        }
    }
}

/// Registry entry for one remote host.
#[derive(Debug, Clone)]
pub struct Host {
    pub name: HostName,
    pub policy: ActivationPolicy,
    pub provisioning: Provisioning,
    /// Directory on the remote host that workers run in.
    pub remote_dir: PathBuf,
}

impl Host {
    /// Entry for a volunteer connection from a host nobody registered.
    pub fn volunteer(name: HostName) -> Self {
        Self {
            name,
            policy: ActivationPolicy::Passive,
            provisioning: Provisioning::ConvertDb,
            remote_dir: PathBuf::from("/tmp"),
        }
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
