// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

/// How the start time of a pulse is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeReference {
    /// The start time is given directly by `time_offset` (or a preset absolute time).
    Absolute,
    /// The pulse follows the pulse with the closest lower declared pulse number.
    #[default]
    Previous,
    /// The pulse is placed with respect to the pulse named in `relative_to`.
    Relative,
}

impl FromStr for TimeReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absolute" => Ok(TimeReference::Absolute),
            "previous" => Ok(TimeReference::Previous),
            "relative" => Ok(TimeReference::Relative),
            other => Err(format!(
                "expected one of 'absolute', 'previous', 'relative', got '{other}'"
            )),
        }
    }
}

impl fmt::Display for TimeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeReference::Absolute => "absolute",
            TimeReference::Previous => "previous",
            TimeReference::Relative => "relative",
        };
        write!(f, "{s}")
    }
}

/// Which edge of the reference pulse a time offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RelativeMarker {
    Start,
    #[default]
    End,
}

impl FromStr for RelativeMarker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(RelativeMarker::Start),
            "end" => Ok(RelativeMarker::End),
            other => Err(format!("expected one of 'start', 'end', got '{other}'")),
        }
    }
}

/// A single named pulse.
///
/// The physical attributes are fixed once the pulse is built. Only the timing
/// resolver writes the computed attributes (absolute time, pulse number and
/// spacing).
#[derive(Debug, Clone, PartialEq)]
pub struct Pulse {
    name: String,
    amplitude: f64,
    width: f64,
    plateau: f64,
    spacing: f64,
    phase: f64,
    modulation_frequency: f64,
    output_channel: u16,
    drag_coefficient: f64,
    quadrature_ratio: f64,
    quadrature_phase_offset: f64,
    fix_phase: bool,
    time_reference: TimeReference,
    time_offset: Option<f64>,
    relative_to: Option<String>,
    relative_marker: RelativeMarker,
    declared_number: Option<u32>,
    pulse_number: Option<u32>,
    is_inverted: bool,
    absolute_time: Option<f64>,
}

impl Pulse {
    pub fn builder(name: impl Into<String>) -> PulseBuilder {
        PulseBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Width of the Gaussian edges in seconds.
    ///
    /// The Gaussian standard deviation is `width / sqrt(2π)`, i.e. the width is the
    /// duration of a rectangle with the same area as the Gaussian.
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn plateau(&self) -> f64 {
        self.plateau
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Phase in degrees.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn modulation_frequency(&self) -> f64 {
        self.modulation_frequency
    }

    /// Output channel, starting from 1.
    pub fn output_channel(&self) -> u16 {
        self.output_channel
    }

    pub fn drag_coefficient(&self) -> f64 {
        self.drag_coefficient
    }

    pub fn quadrature_ratio(&self) -> f64 {
        self.quadrature_ratio
    }

    /// Phase offset of the quadrature component in degrees.
    pub fn quadrature_phase_offset(&self) -> f64 {
        self.quadrature_phase_offset
    }

    pub fn fix_phase(&self) -> bool {
        self.fix_phase
    }

    pub fn time_reference(&self) -> TimeReference {
        self.time_reference
    }

    pub fn time_offset(&self) -> Option<f64> {
        self.time_offset
    }

    pub fn relative_to(&self) -> Option<&str> {
        self.relative_to.as_deref()
    }

    pub fn relative_marker(&self) -> RelativeMarker {
        self.relative_marker
    }

    /// Position of the pulse on the resolved timeline, or the declared number
    /// before resolution.
    pub fn pulse_number(&self) -> Option<u32> {
        self.pulse_number
    }

    /// Pulse number given when the pulse was built.
    ///
    /// `previous` references are resolved against it. The timing resolver never
    /// rewrites it, so resolving twice binds the same pulses.
    pub fn declared_number(&self) -> Option<u32> {
        self.declared_number
    }

    pub fn is_inverted(&self) -> bool {
        self.is_inverted
    }

    pub fn absolute_time(&self) -> Option<f64> {
        self.absolute_time
    }

    pub fn valid_abs_time(&self) -> bool {
        self.absolute_time.is_some()
    }

    /// Nominal length of the pulse: `width + plateau`.
    pub fn length(&self) -> f64 {
        self.width + self.plateau
    }

    /// Absolute end time of the pulse, if the pulse is resolved.
    pub fn end_time(&self) -> Option<f64> {
        self.absolute_time.map(|t| t + self.length())
    }

    pub fn set_absolute_time(&mut self, time: f64) {
        self.absolute_time = Some(time);
    }

    pub fn set_pulse_number(&mut self, number: u32) {
        self.pulse_number = Some(number);
    }

    pub fn set_spacing(&mut self, spacing: f64) {
        self.spacing = spacing;
    }
}

pub struct PulseBuilder {
    pulse: Pulse,
}

impl PulseBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            pulse: Pulse {
                name: name.into(),
                amplitude: 0.0,
                width: 0.0,
                plateau: 0.0,
                spacing: 0.0,
                phase: 0.0,
                modulation_frequency: 0.0,
                output_channel: 1,
                drag_coefficient: 0.0,
                quadrature_ratio: 1.0,
                quadrature_phase_offset: 0.0,
                fix_phase: false,
                time_reference: TimeReference::default(),
                time_offset: None,
                relative_to: None,
                relative_marker: RelativeMarker::default(),
                declared_number: None,
                pulse_number: None,
                is_inverted: false,
                absolute_time: None,
            },
        }
    }

    pub fn amplitude(mut self, amplitude: f64) -> Self {
        self.pulse.amplitude = amplitude;
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.pulse.width = width;
        self
    }

    pub fn plateau(mut self, plateau: f64) -> Self {
        self.pulse.plateau = plateau;
        self
    }

    pub fn spacing(mut self, spacing: f64) -> Self {
        self.pulse.spacing = spacing;
        self
    }

    pub fn phase(mut self, phase: f64) -> Self {
        self.pulse.phase = phase;
        self
    }

    pub fn modulation_frequency(mut self, frequency: f64) -> Self {
        self.pulse.modulation_frequency = frequency;
        self
    }

    pub fn output_channel(mut self, channel: u16) -> Self {
        self.pulse.output_channel = channel;
        self
    }

    pub fn drag_coefficient(mut self, coefficient: f64) -> Self {
        self.pulse.drag_coefficient = coefficient;
        self
    }

    pub fn quadrature_ratio(mut self, ratio: f64) -> Self {
        self.pulse.quadrature_ratio = ratio;
        self
    }

    pub fn quadrature_phase_offset(mut self, offset: f64) -> Self {
        self.pulse.quadrature_phase_offset = offset;
        self
    }

    pub fn fix_phase(mut self, fix_phase: bool) -> Self {
        self.pulse.fix_phase = fix_phase;
        self
    }

    /// Place the pulse at `time_offset` on the absolute timeline.
    pub fn absolute(mut self, time_offset: f64) -> Self {
        self.pulse.time_reference = TimeReference::Absolute;
        self.pulse.time_offset = Some(time_offset);
        self
    }

    /// Place the pulse after the pulse with the closest lower pulse number.
    pub fn after_previous(mut self, pulse_number: u32) -> Self {
        self.pulse.time_reference = TimeReference::Previous;
        self.pulse_number(pulse_number)
    }

    /// Place the pulse relative to the pulse named `reference`.
    pub fn relative_to(mut self, reference: impl Into<String>) -> Self {
        self.pulse.time_reference = TimeReference::Relative;
        self.pulse.relative_to = Some(reference.into());
        self
    }

    pub fn time_reference(mut self, time_reference: TimeReference) -> Self {
        self.pulse.time_reference = time_reference;
        self
    }

    pub fn time_offset(mut self, time_offset: f64) -> Self {
        self.pulse.time_offset = Some(time_offset);
        self
    }

    pub fn reference_name(mut self, reference: impl Into<String>) -> Self {
        self.pulse.relative_to = Some(reference.into());
        self
    }

    pub fn relative_marker(mut self, marker: RelativeMarker) -> Self {
        self.pulse.relative_marker = marker;
        self
    }

    pub fn pulse_number(mut self, pulse_number: u32) -> Self {
        self.pulse.declared_number = Some(pulse_number);
        self.pulse.pulse_number = Some(pulse_number);
        self
    }

    pub fn inverted(mut self, is_inverted: bool) -> Self {
        self.pulse.is_inverted = is_inverted;
        self
    }

    /// Preset the absolute time of an absolute pulse without a time offset.
    pub fn absolute_time(mut self, time: f64) -> Self {
        self.pulse.absolute_time = Some(time);
        self
    }

    pub fn build(self) -> Pulse {
        self.pulse
    }
}
