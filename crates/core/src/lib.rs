// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rfarm-core: domain model for the render dispatch controller

pub mod clock;
pub mod config;
pub mod frame;
pub mod host;
pub mod range;
pub mod stats;
pub mod time_fmt;
pub mod worker;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::DispatchConfig;
pub use frame::{Frame, FrameState};
pub use host::{ActivationPolicy, Host, HostName, Provisioning};
pub use range::{WorkQueue, WorkRange};
pub use stats::ThroughputStats;
pub use time_fmt::format_elapsed;
pub use worker::{Worker, WorkerId, WorkerState};
