// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Timing resolution of pulse sequences.
//!
//! Pulses are placed on the absolute timeline from their absolute, previous or
//! relative time references. The resolved sequence is sorted, renumbered and the
//! spacing between consecutive pulses is derived from the resolved times.

pub mod error;
mod timing_resolver;

pub use error::{Error, Result};
pub use timing_resolver::{
    TimingResult, TimingWarning, resolve_timing, resolved_times, sample_count, sequence_duration,
};
