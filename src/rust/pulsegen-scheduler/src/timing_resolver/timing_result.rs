// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;

/// Different types of warnings that can occur during timing resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum TimingWarning {
    /// `pulse` ends `overlap` seconds after `next` starts.
    PulseOverlap {
        pulse: String,
        next: String,
        overlap: f64,
    },
}

impl Eq for TimingWarning {}

impl PartialOrd for TimingWarning {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimingWarning {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                TimingWarning::PulseOverlap {
                    pulse,
                    next,
                    overlap,
                },
                TimingWarning::PulseOverlap {
                    pulse: other_pulse,
                    next: other_next,
                    overlap: other_overlap,
                },
            ) => pulse
                .cmp(other_pulse)
                .then_with(|| next.cmp(other_next))
                .then_with(|| overlap.total_cmp(other_overlap)),
        }
    }
}

/// Result of the timing resolution, including any warnings encountered.
///
/// The warnings can be optionally deduplicated using `deduplicate_warnings`.
#[derive(Debug, Default)]
pub struct TimingResult {
    warnings: Vec<TimingWarning>,
}

impl TimingResult {
    pub(super) fn new() -> Self {
        TimingResult {
            warnings: Vec::new(),
        }
    }

    pub(super) fn add_warning(&mut self, warning: TimingWarning) {
        self.warnings.push(warning);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn warnings(&self) -> &[TimingWarning] {
        &self.warnings
    }

    pub fn deduplicate_warnings(&mut self) {
        self.warnings.sort();
        self.warnings.dedup();
    }
}

impl std::fmt::Display for TimingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingWarning::PulseOverlap {
                pulse,
                next,
                overlap,
            } => write!(
                f,
                "Pulse '{}' overlaps with pulse '{}' by {:.2} ns.",
                pulse,
                next,
                overlap * 1e9_f64
            ),
        }
    }
}

impl std::fmt::Display for TimingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut overlaps = vec![];
        for warning in &self.warnings {
            match warning {
                TimingWarning::PulseOverlap { .. } => {
                    overlaps.push(format!("  - {}", warning));
                }
            }
        }
        if !overlaps.is_empty() {
            let mut msg = "The following pulses overlap on the resolved timeline:\n".to_string();
            msg += &overlaps.join("\n");
            write!(f, "{}", msg)?;
        }
        Ok(())
    }
}
