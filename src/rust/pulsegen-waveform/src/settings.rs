// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Options for the waveform synthesis.
use pulsegen_model::{MainParameters, Pulse, PulseSequence, Sideband, SpacingMode};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SanitizationChange {
    pub field: &'static str,
    pub original: String,
    pub sanitized: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    pub sample_rate: f64,
    pub truncation_range: f64,
    /// DRAG coefficient used for every pulse instead of the per-pulse one.
    pub global_drag: Option<f64>,
    pub drag_on_square: bool,
    pub sideband: Option<Sideband>,
    pub first_pulse_delay: f64,
    /// Generate backwards from this buffer time instead of forwards from `first_pulse_delay`.
    pub final_time: Option<f64>,
    pub spacing_mode: SpacingMode,
    pub number_of_outputs: u16,
    pub dead_time: f64,
    /// Fixed buffer duration, overrides the duration derived from the pulses.
    pub sequence_duration: Option<f64>,
    /// Fixed buffer length, overrides every duration.
    pub sample_count: Option<usize>,
}

impl SynthesisOptions {
    pub fn from_main_parameters(main: &MainParameters) -> Self {
        SynthesisOptions {
            sample_rate: main.sample_rate,
            truncation_range: main.truncation_range,
            global_drag: main.use_global_drag.then_some(main.drag_coefficient),
            drag_on_square: main.drag_on_square,
            sideband: main.sideband,
            first_pulse_delay: main.first_pulse_delay,
            final_time: main.final_time,
            spacing_mode: main.spacing_mode,
            number_of_outputs: main.number_of_outputs,
            dead_time: main.dead_time,
            sequence_duration: main.sequence_duration,
            sample_count: main.sample_count,
        }
    }

    pub fn sample_period(&self) -> f64 {
        1.0 / self.sample_rate
    }

    /// DRAG coefficient applied to `pulse`.
    pub fn drag_coefficient(&self, pulse: &Pulse) -> f64 {
        self.global_drag.unwrap_or(pulse.drag_coefficient())
    }

    /// Buffer duration of `sequence` in seconds.
    ///
    /// Without a fixed `sequence_duration` this is the first pulse delay, the
    /// per-pulse steps of the spacing mode and the dead time.
    pub fn sequence_duration(&self, sequence: &PulseSequence) -> f64 {
        self.sequence_duration.unwrap_or_else(|| {
            let pulses: f64 = sequence
                .iter()
                .map(|p| self.spacing_mode.step(p.width(), p.plateau(), p.spacing()))
                .sum();
            self.first_pulse_delay + pulses + self.dead_time
        })
    }

    /// Number of samples in each output buffer of `sequence`.
    pub fn sample_count(&self, sequence: &PulseSequence) -> Result<usize> {
        if let Some(count) = self.sample_count {
            return Ok(count);
        }
        let samples = (self.sequence_duration(sequence) * self.sample_rate).round();
        if !samples.is_finite() || samples < 0.0 {
            return Err(Error::new(format!(
                "Invalid sequence length of {samples} samples."
            )));
        }
        Ok(samples as usize)
    }

    /// Bring the options into a consistent state.
    ///
    /// Returns the adjustments made. An invalid sample rate cannot be repaired and
    /// is reported as an error.
    pub fn sanitize(&mut self) -> Result<Vec<SanitizationChange>> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(Error::new(format!(
                "Sample rate must be a positive number, got {}.",
                self.sample_rate
            )));
        }
        let mut changes = vec![];
        if !self.truncation_range.is_finite() || self.truncation_range < 0.0 {
            changes.push(SanitizationChange {
                field: "truncation_range",
                original: self.truncation_range.to_string(),
                sanitized: "0".to_string(),
                reason: "Truncation range must be a non-negative number.".to_string(),
            });
            self.truncation_range = 0.0;
        }
        if self.number_of_outputs == 0 {
            changes.push(SanitizationChange {
                field: "number_of_outputs",
                original: "0".to_string(),
                sanitized: "1".to_string(),
                reason: "At least one output channel is required.".to_string(),
            });
            self.number_of_outputs = 1;
        }
        if !self.first_pulse_delay.is_finite() {
            changes.push(SanitizationChange {
                field: "first_pulse_delay",
                original: self.first_pulse_delay.to_string(),
                sanitized: "0".to_string(),
                reason: "Not a finite number.".to_string(),
            });
            self.first_pulse_delay = 0.0;
        }
        if !self.dead_time.is_finite() {
            changes.push(SanitizationChange {
                field: "dead_time",
                original: self.dead_time.to_string(),
                sanitized: "0".to_string(),
                reason: "Not a finite number.".to_string(),
            });
            self.dead_time = 0.0;
        }
        if let Some(drag) = self.global_drag.filter(|d| !d.is_finite()) {
            changes.push(SanitizationChange {
                field: "global_drag",
                original: drag.to_string(),
                sanitized: "0".to_string(),
                reason: "Not a finite number.".to_string(),
            });
            self.global_drag = Some(0.0);
        }
        Ok(changes)
    }
}
