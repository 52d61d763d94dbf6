// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

mod dependency_graph;
mod sequence_length;
mod timing_calculator;
mod timing_result;

pub use sequence_length::{sample_count, sequence_duration};
pub use timing_calculator::{resolve_timing, resolved_times};
pub use timing_result::{TimingResult, TimingWarning};
