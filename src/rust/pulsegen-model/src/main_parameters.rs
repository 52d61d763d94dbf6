// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use crate::{Error, Result};

/// How the `spacing` of a pulse is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpacingMode {
    /// Spacing is the gap between the end of a pulse and the start of the next one.
    #[default]
    EdgeToEdge,
    /// Spacing is the distance between the starts of two consecutive pulses.
    StartToStart,
}

impl SpacingMode {
    /// Distance from the start of `pulse` to the start of the following pulse.
    pub fn step(&self, width: f64, plateau: f64, spacing: f64) -> f64 {
        match self {
            SpacingMode::EdgeToEdge => width + plateau + spacing,
            SpacingMode::StartToStart => spacing,
        }
    }
}

impl FromStr for SpacingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "edge_to_edge" => Ok(SpacingMode::EdgeToEdge),
            "start_to_start" => Ok(SpacingMode::StartToStart),
            other => Err(format!(
                "expected one of 'edge_to_edge', 'start_to_start', got '{other}'"
            )),
        }
    }
}

/// Sign convention of the modulation frequency offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sideband {
    /// Offsets are above the carrier: modulation frequencies must not be negative.
    Upper,
    /// Offsets are below the carrier: modulation frequencies must not be positive.
    Lower,
}

impl FromStr for Sideband {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "upper" => Ok(Sideband::Upper),
            "lower" => Ok(Sideband::Lower),
            other => Err(format!("expected one of 'upper', 'lower', got '{other}'")),
        }
    }
}

impl std::fmt::Display for Sideband {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sideband::Upper => write!(f, "upper"),
            Sideband::Lower => write!(f, "lower"),
        }
    }
}

/// Sequence-wide parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MainParameters {
    /// Sample rate of the output channels in Hz.
    pub sample_rate: f64,
    /// Multiple of the pulse width rendered around the plateau before clipping.
    pub truncation_range: f64,
    pub first_pulse_delay: f64,
    /// Idle time appended after the last pulse.
    pub dead_time: f64,
    /// Fixed sequence duration in seconds, overrides the computed duration.
    pub sequence_duration: Option<f64>,
    /// Fixed number of samples, overrides both the computed and the fixed duration.
    pub sample_count: Option<usize>,
    pub number_of_outputs: u16,
    pub spacing_mode: SpacingMode,
    /// Use `drag_coefficient` for every pulse instead of the per-pulse coefficient.
    pub use_global_drag: bool,
    pub drag_coefficient: f64,
    /// Apply DRAG also to pulses without Gaussian edges.
    pub drag_on_square: bool,
    pub sideband: Option<Sideband>,
    /// Generate the waveform backwards, ending at this time.
    pub final_time: Option<f64>,
}

impl MainParameters {
    pub fn new(sample_rate: f64) -> Self {
        MainParameters {
            sample_rate,
            truncation_range: 2.0,
            first_pulse_delay: 0.0,
            dead_time: 0.0,
            sequence_duration: None,
            sample_count: None,
            number_of_outputs: 2,
            spacing_mode: SpacingMode::default(),
            use_global_drag: false,
            drag_coefficient: 0.0,
            drag_on_square: false,
            sideband: None,
            final_time: None,
        }
    }

    /// Duration of a single sample.
    pub fn sample_period(&self) -> f64 {
        1.0 / self.sample_rate
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(Error::InvalidMainParameters(format!(
                "sample_rate must be a positive number, got {}",
                self.sample_rate
            )));
        }
        if !self.truncation_range.is_finite() || self.truncation_range < 0.0 {
            return Err(Error::InvalidMainParameters(format!(
                "truncation_range must not be negative, got {}",
                self.truncation_range
            )));
        }
        if self.number_of_outputs == 0 {
            return Err(Error::InvalidMainParameters(
                "number_of_outputs must be at least 1".to_string(),
            ));
        }
        if self.sample_count == Some(0) {
            return Err(Error::InvalidMainParameters(
                "sample_count must be positive when set".to_string(),
            ));
        }
        if let Some(duration) = self
            .sequence_duration
            .filter(|d| !d.is_finite() || *d < 0.0)
        {
            return Err(Error::InvalidMainParameters(format!(
                "sequence_duration must not be negative, got {duration}"
            )));
        }
        Ok(())
    }
}
