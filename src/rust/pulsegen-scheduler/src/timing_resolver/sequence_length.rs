// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use pulsegen_model::PulseSequence;

/// Total duration of the sequence in seconds.
///
/// Without an explicit `sequence_duration`, this is the first pulse delay, the
/// per-pulse steps of the spacing mode and the dead time. The sequence must be
/// resolved in that case.
pub fn sequence_duration(sequence: &PulseSequence) -> Result<f64> {
    let main = sequence.main();
    if let Some(duration) = main.sequence_duration {
        return Ok(duration);
    }
    if !sequence.is_resolved() {
        return Err(Error::new(
            "The pulse sequence must be resolved before its duration can be calculated.",
        ));
    }
    let pulses: f64 = sequence
        .iter()
        .map(|p| main.spacing_mode.step(p.width(), p.plateau(), p.spacing()))
        .sum();
    Ok(main.first_pulse_delay + pulses + main.dead_time)
}

/// Number of samples in each output buffer.
pub fn sample_count(sequence: &PulseSequence) -> Result<usize> {
    let main = sequence.main();
    if let Some(count) = main.sample_count {
        return Ok(count);
    }
    let samples = (sequence_duration(sequence)? * main.sample_rate).round();
    if !samples.is_finite() || samples < 0.0 {
        return Err(Error::new(format!(
            "Invalid sequence length of {samples} samples."
        )));
    }
    Ok(samples as usize)
}

#[cfg(test)]
mod tests {
    use pulsegen_model::{MainParameters, Pulse, SpacingMode};

    use super::*;
    use crate::resolve_timing;

    fn readout_sequence(main: MainParameters) -> PulseSequence {
        let mut seq = PulseSequence::with_pulses(
            main,
            [
                Pulse::builder("buffer").absolute(0.0).pulse_number(1).build(),
                Pulse::builder("drive").width(100e-9).after_previous(2).build(),
                Pulse::builder("readout")
                    .plateau(400e-9)
                    .relative_to("drive")
                    .build(),
            ],
        )
        .unwrap();
        resolve_timing(&mut seq).unwrap();
        seq
    }

    #[test]
    fn test_sample_count_from_pulses() {
        let seq = readout_sequence(MainParameters::new(1e9));
        assert!((sequence_duration(&seq).unwrap() - 500e-9).abs() < 1e-18);
        assert_eq!(sample_count(&seq).unwrap(), 500);
    }

    #[test]
    fn test_delay_and_dead_time() {
        let mut main = MainParameters::new(2e9);
        main.first_pulse_delay = 20e-9;
        main.dead_time = 30e-9;
        let seq = readout_sequence(main);
        assert_eq!(sample_count(&seq).unwrap(), 1100);
    }

    #[test]
    fn test_start_to_start_mode() {
        let mut main = MainParameters::new(1e9);
        main.spacing_mode = SpacingMode::StartToStart;
        let seq = readout_sequence(main);
        // The readout keeps its user spacing of 0.
        assert_eq!(sample_count(&seq).unwrap(), 100);
    }

    #[test]
    fn test_overrides() {
        let mut main = MainParameters::new(1e9);
        main.sequence_duration = Some(1e-6);
        let seq = readout_sequence(main.clone());
        assert_eq!(sequence_duration(&seq).unwrap(), 1e-6);
        assert_eq!(sample_count(&seq).unwrap(), 1000);

        main.sample_count = Some(64);
        let seq = readout_sequence(main);
        assert_eq!(sample_count(&seq).unwrap(), 64);
    }

    #[test]
    fn test_unresolved_sequence() {
        let seq = PulseSequence::with_pulses(
            MainParameters::new(1e9),
            [Pulse::builder("a").absolute(0.0).build()],
        )
        .unwrap();
        assert!(sequence_duration(&seq).is_err());
    }
}
