// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;
use pulsegen_log::{diagnostic, warn};
use pulsegen_model::{Pulse, PulseSequence};

use crate::envelope::{EnvelopeShape, numerical_gradient};
use crate::modulation::Carrier;
use crate::settings::SynthesisOptions;
use crate::sideband::{SidebandFlipWarning, check_sideband, clamp_to_sideband};
use crate::{Error, Result};

/// Extra samples rendered on each side of a DRAG pulse so that the gradient at
/// the window edges is not one-sided.
const DRAG_BLEED: i64 = 3;

/// Samples of a single pulse, placed at `start` in the channel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseFragment {
    pub start: i64,
    pub in_phase: Vec<f64>,
    pub quadrature: Vec<f64>,
}

impl PulseFragment {
    /// Buffer index one past the last sample.
    pub fn end(&self) -> i64 {
        self.start + self.in_phase.len() as i64
    }

    pub fn len(&self) -> usize {
        self.in_phase.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_phase.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelWaveform {
    pub in_phase: Vec<f64>,
    pub quadrature: Vec<f64>,
}

impl ChannelWaveform {
    fn zeros(length: usize) -> Self {
        ChannelWaveform {
            in_phase: vec![0.0; length],
            quadrature: vec![0.0; length],
        }
    }

    pub fn len(&self) -> usize {
        self.in_phase.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_phase.is_empty()
    }

    /// Add the fragment to the buffer, dropping the samples outside of it.
    fn accumulate(&mut self, fragment: &PulseFragment, pulse: &str) {
        let length = self.len() as i64;
        let start = fragment.start.clamp(0, length);
        let end = fragment.end().clamp(0, length);
        if start != fragment.start || end != fragment.end() {
            diagnostic!(
                "Pulse '{}' spans samples [{}, {}) and is clipped to [{}, {}).",
                pulse,
                fragment.start,
                fragment.end(),
                start,
                end
            );
        }
        if start >= end {
            return;
        }
        let offset = (start - fragment.start) as usize;
        let target = start as usize..end as usize;
        for (sample, value) in self.in_phase[target.clone()]
            .iter_mut()
            .zip(&fragment.in_phase[offset..])
        {
            *sample += value;
        }
        for (sample, value) in self.quadrature[target]
            .iter_mut()
            .zip(&fragment.quadrature[offset..])
        {
            *sample += value;
        }
    }
}

/// Output of the synthesis: one buffer pair per output channel, keyed by channel number.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceWaveforms {
    pub sample_count: usize,
    pub channels: IndexMap<u16, ChannelWaveform>,
    pub warnings: Vec<SidebandFlipWarning>,
}

impl SequenceWaveforms {
    pub fn channel(&self, output_channel: u16) -> Option<&ChannelWaveform> {
        self.channels.get(&output_channel)
    }
}

/// Render the samples of `pulse` starting at buffer time `head_time`.
///
/// The fragment covers the pulse plus `truncation_range` widths of Gaussian edges,
/// centered on the pulse. The modulation frequency is clamped to the configured
/// sideband.
///
/// The sample window is half-open, `[imin, imax)`. A Gaussian pulse therefore gets one
/// sample more on its leading edge than on its trailing edge, and a square pulse of
/// `n` samples ends on its last plateau sample.
pub fn sample_pulse(pulse: &Pulse, head_time: f64, options: &SynthesisOptions) -> PulseFragment {
    let sample_rate = options.sample_rate;
    let shape = EnvelopeShape::new(pulse.width(), pulse.plateau());
    let center = head_time + pulse.length() / 2.0;
    let half_extent = (pulse.plateau() + options.truncation_range * pulse.width()) / 2.0;
    let imin = ((center - half_extent) * sample_rate).round() as i64;
    let imax = (((center + half_extent) * sample_rate).round() as i64).max(imin);

    let drag_coefficient = options.drag_coefficient(pulse);
    let apply_drag = drag_coefficient != 0.0 && (!shape.is_square() || options.drag_on_square);
    let bleed = if apply_drag { DRAG_BLEED } else { 0 };

    // Pulse-local times on the sample grid, measured from the pulse start.
    let head_samples = head_time * sample_rate;
    let times: Vec<f64> = (imin - bleed..imax + bleed)
        .map(|i| (i as f64 - head_samples).round() / sample_rate)
        .collect();
    let envelope: Vec<f64> = times
        .iter()
        .map(|t| pulse.amplitude() * shape.value(t - pulse.length() / 2.0))
        .collect();
    let drag: Vec<f64> = if apply_drag {
        numerical_gradient(&envelope)
            .into_iter()
            .map(|g| drag_coefficient * g * sample_rate)
            .collect()
    } else {
        vec![0.0; envelope.len()]
    };

    let window = bleed as usize..envelope.len() - bleed as usize;
    let phase_origin = if pulse.fix_phase() {
        0.0
    } else {
        pulse.absolute_time().unwrap_or_default()
    };
    let carrier_times: Vec<f64> = times[window.clone()]
        .iter()
        .map(|t| t + phase_origin)
        .collect();
    let frequency = clamp_to_sideband(pulse.modulation_frequency(), options.sideband);
    let (in_phase, quadrature) = Carrier::new(pulse, frequency).modulate(
        &envelope[window.clone()],
        &drag[window],
        &carrier_times,
    );
    PulseFragment {
        start: imin,
        in_phase,
        quadrature,
    }
}

/// Buffer start time of every pulse, in the order the pulses are placed.
fn place_pulses<'a>(
    sequence: &'a PulseSequence,
    options: &SynthesisOptions,
) -> Vec<(&'a Pulse, f64)> {
    let step = |pulse: &Pulse| {
        options
            .spacing_mode
            .step(pulse.width(), pulse.plateau(), pulse.spacing())
    };
    match options.final_time {
        None => {
            let mut head_time = options.first_pulse_delay;
            sequence
                .iter()
                .map(|pulse| {
                    let placement = (pulse, head_time);
                    head_time += step(pulse);
                    placement
                })
                .collect()
        }
        Some(final_time) => {
            let mut head_time = final_time;
            sequence
                .iter()
                .rev()
                .map(|pulse| {
                    head_time -= step(pulse);
                    (pulse, head_time)
                })
                .collect()
        }
    }
}

/// Generate the output waveforms of a resolved pulse sequence.
pub fn synthesize(sequence: &PulseSequence, options: &SynthesisOptions) -> Result<SequenceWaveforms> {
    if !sequence.is_resolved() {
        return Err(Error::UnresolvedSequence);
    }
    let mut options = options.clone();
    for change in options.sanitize()? {
        warn!(
            "Synthesis option '{}' changed from {} to {}: {}",
            change.field,
            change.original,
            change.sanitized,
            change.reason
        );
    }
    if let Some(pulse) = sequence
        .iter()
        .find(|p| !(1..=options.number_of_outputs).contains(&p.output_channel()))
    {
        return Err(Error::InvalidOutputChannel {
            pulse: pulse.name().to_string(),
            channel: pulse.output_channel(),
            number_of_outputs: options.number_of_outputs,
        });
    }

    let sample_count = options.sample_count(sequence)?;
    let mut channels: IndexMap<u16, ChannelWaveform> = (1..=options.number_of_outputs)
        .map(|channel| (channel, ChannelWaveform::zeros(sample_count)))
        .collect();
    let mut warnings = vec![];
    for (pulse, head_time) in place_pulses(sequence, &options) {
        if let Some(warning) = check_sideband(pulse, options.sideband) {
            warn!("{}", warning);
            warnings.push(warning);
        }
        let fragment = sample_pulse(pulse, head_time, &options);
        diagnostic!(
            "Pulse '{}' on output {} at {} s covers samples [{}, {}).",
            pulse.name(),
            pulse.output_channel(),
            head_time,
            fragment.start,
            fragment.end()
        );
        if let Some(channel) = channels.get_mut(&pulse.output_channel()) {
            channel.accumulate(&fragment, pulse.name());
        }
    }
    Ok(SequenceWaveforms {
        sample_count,
        channels,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use pulsegen_model::{MainParameters, PulseSpec, Sideband};
    use pulsegen_scheduler::resolve_timing;

    use super::*;

    const E2E_SPEC: &str = r#"{
        "main": {"sample_rate": 1e9, "truncation_range": 1},
        "buffer": {"time_reference": "absolute", "time_offset": 0, "w": 0, "v": 0},
        "pulse1": {
            "time_reference": "relative", "relative_to": "buffer", "relative_marker": "end",
            "time_offset": 0, "w": 100e-9, "v": 0, "a": 0.5, "f": 50e6, "o": 2
        },
        "readout": {
            "time_reference": "relative", "relative_to": "pulse1", "relative_marker": "end",
            "time_offset": 0, "w": 0, "v": 400e-9, "a": 1.0, "f": 90e6, "o": 1
        }
    }"#;

    fn resolved(spec: &str) -> PulseSequence {
        let spec = PulseSpec::from_json(spec).unwrap();
        let mut sequence = PulseSequence::from_spec(&spec).unwrap();
        resolve_timing(&mut sequence).unwrap();
        sequence
    }

    fn options(sample_rate: f64) -> SynthesisOptions {
        SynthesisOptions::from_main_parameters(&MainParameters::new(sample_rate))
    }

    #[test]
    fn test_end_to_end() {
        let sequence = resolved(E2E_SPEC);
        let names = sequence.iter().map(|p| p.name()).collect::<Vec<_>>();
        assert_eq!(names, vec!["buffer", "pulse1", "readout"]);
        let times = sequence
            .iter()
            .map(|p| p.absolute_time().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(times[0], 0.0);
        assert_eq!(times[1], 0.0);
        assert!((times[2] - 100e-9).abs() < 1e-18);

        let options = SynthesisOptions::from_main_parameters(sequence.main());
        let waveforms = synthesize(&sequence, &options).unwrap();
        assert_eq!(waveforms.sample_count, 500);
        assert!(waveforms.warnings.is_empty());

        // Gaussian envelope of the drive pulse, modulated at 50 MHz.
        let drive = waveforms.channel(2).unwrap();
        assert_eq!(drive.len(), 500);
        let std = 100e-9 / (2.0 * std::f64::consts::PI).sqrt();
        for i in 0..100 {
            let t = i as f64 * 1e-9;
            let envelope = 0.5 * (-(t - 50e-9).powi(2) / (2.0 * std * std)).exp();
            let (in_phase, quadrature) = (drive.in_phase[i], drive.quadrature[i]);
            assert!((in_phase.hypot(quadrature) - envelope).abs() < 1e-12);
            let angle = 2.0 * std::f64::consts::PI * 50e6 * t;
            assert!((in_phase - envelope * angle.cos()).abs() < 1e-9);
        }
        assert!(drive.in_phase[100..].iter().all(|x| *x == 0.0));
        assert!(drive.quadrature[100..].iter().all(|x| *x == 0.0));

        // Flat 400-sample readout from sample 100, modulated at 90 MHz on the sequence clock.
        let readout = waveforms.channel(1).unwrap();
        assert!(readout.in_phase[..100].iter().all(|x| *x == 0.0));
        assert!(readout.quadrature[..100].iter().all(|x| *x == 0.0));
        for i in 100..500 {
            let angle = 2.0 * std::f64::consts::PI * 90e6 * (i as f64 * 1e-9);
            assert!((readout.in_phase[i] - angle.cos()).abs() < 1e-9);
            assert!((readout.quadrature[i] - angle.sin()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_square_pulse() {
        let pulse = Pulse::builder("square")
            .amplitude(0.3)
            .plateau(50e-9)
            .absolute(0.0)
            .build();
        let fragment = sample_pulse(&pulse, 20e-9, &options(1e9));
        assert_eq!(fragment.start, 20);
        assert_eq!(fragment.len(), 50);
        assert!(fragment.in_phase.iter().all(|x| *x == 0.3));
        assert!(fragment.quadrature.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_zero_pulses_are_empty_or_zero() {
        let silent = Pulse::builder("silent").width(20e-9).build();
        let fragment = sample_pulse(&silent, 0.0, &options(1e9));
        assert_eq!(fragment.len(), 40);
        assert!(fragment.in_phase.iter().all(|x| *x == 0.0));

        let empty = Pulse::builder("empty").amplitude(1.0).build();
        assert!(sample_pulse(&empty, 0.0, &options(1e9)).is_empty());
    }

    #[test]
    fn test_gaussian_window() {
        let pulse = Pulse::builder("g").amplitude(1.0).width(10e-9).build();
        let fragment = sample_pulse(&pulse, 100e-9, &options(1e9));
        // Two widths of Gaussian edges centered on the pulse.
        assert_eq!(fragment.start, 95);
        assert_eq!(fragment.len(), 20);
        assert_eq!(fragment.in_phase[10], 1.0);
        for k in 1..10 {
            assert!((fragment.in_phase[10 - k] - fragment.in_phase[10 + k]).abs() < 1e-12);
        }
        // The half-open window keeps the leading sample at one width before the center.
        assert!((fragment.in_phase[0] - (-std::f64::consts::PI).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_drag_on_quadrature() {
        let pulse = Pulse::builder("drag")
            .amplitude(1.0)
            .width(20e-9)
            .drag_coefficient(1e-9)
            .build();
        let opts = options(1e9);
        let fragment = sample_pulse(&pulse, 0.0, &opts);
        let without_drag = sample_pulse(
            &Pulse::builder("plain").amplitude(1.0).width(20e-9).build(),
            0.0,
            &opts,
        );
        assert_eq!(fragment.start, without_drag.start);
        assert_eq!(fragment.len(), without_drag.len());
        assert_eq!(fragment.in_phase, without_drag.in_phase);
        // Rising edge has a positive derivative, so the quadrature is negative.
        let center = fragment.len() / 2;
        assert!(fragment.quadrature[1] < 0.0);
        assert!(fragment.quadrature[center].abs() < 1e-12);
        assert!(fragment.quadrature[fragment.len() - 2] > 0.0);
    }

    #[test]
    fn test_drag_on_square_pulse() {
        let pulse = Pulse::builder("square")
            .amplitude(1.0)
            .plateau(10e-9)
            .drag_coefficient(1e-9)
            .build();
        let mut opts = options(1e9);
        let fragment = sample_pulse(&pulse, 0.0, &opts);
        assert!(fragment.quadrature.iter().all(|x| *x == 0.0));

        opts.drag_on_square = true;
        let fragment = sample_pulse(&pulse, 0.0, &opts);
        assert_eq!(fragment.len(), 10);
        assert!(fragment.in_phase.iter().all(|x| *x == 1.0));
        // Both edges carry DRAG of opposite sign.
        assert!((fragment.quadrature[0] + 0.5).abs() < 1e-12);
        assert!((fragment.quadrature[9] - 0.5).abs() < 1e-12);
        assert!(fragment.quadrature[1..9].iter().all(|x| *x == 0.0));
        assert!(fragment.quadrature.iter().sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn test_fix_phase() {
        let builder = |fix_phase: bool| {
            Pulse::builder("p")
                .amplitude(1.0)
                .plateau(4e-9)
                .modulation_frequency(125e6)
                .fix_phase(fix_phase)
                .absolute_time(2e-9)
                .build()
        };
        let opts = options(1e9);
        let fixed = sample_pulse(&builder(true), 0.0, &opts);
        assert!((fixed.in_phase[0] - 1.0).abs() < 1e-12);
        let free = sample_pulse(&builder(false), 0.0, &opts);
        // 2ns at 125MHz is a quarter period.
        assert!(free.in_phase[0].abs() < 1e-12);
        assert!((free.quadrature[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sideband_flip() {
        let mut sequence = PulseSequence::with_pulses(
            MainParameters::new(1e9),
            [Pulse::builder("p")
                .amplitude(1.0)
                .plateau(8e-9)
                .modulation_frequency(-100e6)
                .absolute(0.0)
                .build()],
        )
        .unwrap();
        resolve_timing(&mut sequence).unwrap();
        let mut opts = SynthesisOptions::from_main_parameters(sequence.main());
        opts.sideband = Some(Sideband::Upper);
        let waveforms = synthesize(&sequence, &opts).unwrap();
        assert_eq!(waveforms.warnings.len(), 1);
        assert_eq!(waveforms.warnings[0].pulse, "p");
        // Clamped to 0 Hz the output is the bare envelope.
        let channel = waveforms.channel(1).unwrap();
        assert!(channel.in_phase.iter().all(|x| *x == 1.0));
    }

    #[test]
    fn test_invalid_output_channel() {
        let mut sequence = PulseSequence::with_pulses(
            MainParameters::new(1e9),
            [Pulse::builder("p").output_channel(3).absolute(0.0).build()],
        )
        .unwrap();
        resolve_timing(&mut sequence).unwrap();
        let err = synthesize(&sequence, &options(1e9)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidOutputChannel {
                channel: 3,
                number_of_outputs: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_unresolved_sequence() {
        let sequence = PulseSequence::with_pulses(
            MainParameters::new(1e9),
            [Pulse::builder("p").absolute(0.0).build()],
        )
        .unwrap();
        assert!(matches!(
            synthesize(&sequence, &options(1e9)),
            Err(Error::UnresolvedSequence)
        ));
    }

    #[test]
    fn test_clipping_and_backward_walk() {
        let mut main = MainParameters::new(1e9);
        main.sample_count = Some(30);
        main.final_time = Some(30e-9);
        let mut sequence = PulseSequence::with_pulses(
            main,
            [
                Pulse::builder("first")
                    .amplitude(1.0)
                    .plateau(10e-9)
                    .absolute(0.0)
                    .build(),
                Pulse::builder("second")
                    .amplitude(0.5)
                    .plateau(10e-9)
                    .absolute(10e-9)
                    .build(),
            ],
        )
        .unwrap();
        resolve_timing(&mut sequence).unwrap();
        let opts = SynthesisOptions::from_main_parameters(sequence.main());
        let waveforms = synthesize(&sequence, &opts).unwrap();
        let channel = waveforms.channel(1).unwrap();
        // The last pulse ends at the final time, the first one right before it.
        assert!(channel.in_phase[..10].iter().all(|x| *x == 0.0));
        assert!(channel.in_phase[10..20].iter().all(|x| *x == 1.0));
        assert!(channel.in_phase[20..].iter().all(|x| *x == 0.5));

        let mut opts = opts;
        opts.final_time = Some(15e-9);
        let waveforms = synthesize(&sequence, &opts).unwrap();
        let channel = waveforms.channel(1).unwrap();
        // The first pulse now starts before the buffer and is clipped.
        assert!(channel.in_phase[..5].iter().all(|x| *x == 1.0));
        assert!(channel.in_phase[5..15].iter().all(|x| *x == 0.5));
        assert!(channel.in_phase[15..].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_buffer_follows_option_sample_rate() {
        let mut sequence = PulseSequence::with_pulses(
            MainParameters::new(1e9),
            [Pulse::builder("p")
                .amplitude(1.0)
                .plateau(100e-9)
                .absolute(0.0)
                .build()],
        )
        .unwrap();
        resolve_timing(&mut sequence).unwrap();
        let mut opts = SynthesisOptions::from_main_parameters(sequence.main());
        opts.sample_rate = 2e9;
        let waveforms = synthesize(&sequence, &opts).unwrap();
        assert_eq!(waveforms.sample_count, 200);
        let channel = waveforms.channel(1).unwrap();
        assert_eq!(channel.len(), 200);
        assert!(channel.in_phase.iter().all(|x| *x == 1.0));
    }

    #[test]
    fn test_overlapping_pulses_add_up() {
        let mut sequence = PulseSequence::with_pulses(
            MainParameters::new(1e9),
            [
                Pulse::builder("a")
                    .amplitude(0.25)
                    .plateau(10e-9)
                    .absolute(0.0)
                    .build(),
                Pulse::builder("b")
                    .amplitude(0.5)
                    .plateau(10e-9)
                    .absolute(5e-9)
                    .build(),
            ],
        )
        .unwrap();
        resolve_timing(&mut sequence).unwrap();
        let waveforms =
            synthesize(&sequence, &SynthesisOptions::from_main_parameters(sequence.main()))
                .unwrap();
        let channel = waveforms.channel(1).unwrap();
        assert_eq!(waveforms.sample_count, 15);
        assert!(channel.in_phase[..5].iter().all(|x| *x == 0.25));
        assert!(channel.in_phase[5..10].iter().all(|x| *x == 0.75));
        assert!(channel.in_phase[10..].iter().all(|x| *x == 0.5));
    }

    proptest! {
        #[test]
        fn test_amplitude_linearity(
            amplitude in -1.0f64..1.0,
            scale in -4.0f64..4.0,
            width in 1u32..50,
            plateau in 0u32..50,
            drag in -2.0f64..2.0,
            frequency in -200.0f64..200.0,
        ) {
            let pulse = |amplitude: f64| {
                Pulse::builder("p")
                    .amplitude(amplitude)
                    .width(width as f64 * 1e-9)
                    .plateau(plateau as f64 * 1e-9)
                    .drag_coefficient(drag * 1e-9)
                    .modulation_frequency(frequency * 1e6)
                    .phase(30.0)
                    .build()
            };
            let opts = options(1e9);
            let base = sample_pulse(&pulse(amplitude), 7e-9, &opts);
            let scaled = sample_pulse(&pulse(amplitude * scale), 7e-9, &opts);
            prop_assert_eq!(base.start, scaled.start);
            prop_assert_eq!(base.len(), scaled.len());
            for (b, s) in base.in_phase.iter().chain(&base.quadrature)
                .zip(scaled.in_phase.iter().chain(&scaled.quadrature))
            {
                prop_assert!((b * scale - s).abs() <= 1e-12 * (1.0 + s.abs()));
            }
        }
    }
}
