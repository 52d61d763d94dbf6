// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use pulsegen_model::{Pulse, Sideband};

/// Modulation frequency of a pulse that lies on the wrong side of the carrier.
///
/// The frequency used for the waveform is `clamped`.
#[derive(Debug, Clone, PartialEq)]
pub struct SidebandFlipWarning {
    pub pulse: String,
    pub sideband: Sideband,
    pub requested: f64,
    pub clamped: f64,
}

impl std::fmt::Display for SidebandFlipWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Modulation frequency {} Hz of pulse '{}' flips the {} sideband, using {} Hz instead.",
            self.requested, self.pulse, self.sideband, self.clamped
        )
    }
}

/// Closest frequency to `frequency` that lies in `sideband`.
pub(crate) fn clamp_to_sideband(frequency: f64, sideband: Option<Sideband>) -> f64 {
    match sideband {
        Some(Sideband::Upper) if frequency < 0.0 => 0.0,
        Some(Sideband::Lower) if frequency > 0.0 => 0.0,
        _ => frequency,
    }
}

pub(crate) fn check_sideband(pulse: &Pulse, sideband: Option<Sideband>) -> Option<SidebandFlipWarning> {
    let requested = pulse.modulation_frequency();
    let clamped = clamp_to_sideband(requested, sideband);
    match sideband {
        Some(sideband) if clamped != requested => Some(SidebandFlipWarning {
            pulse: pulse.name().to_string(),
            sideband,
            requested,
            clamped,
        }),
        _ => None,
    }
}
