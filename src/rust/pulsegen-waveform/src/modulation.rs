// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::f64::consts::PI;

use num_complex::Complex64;
use pulsegen_model::Pulse;

const J: Complex64 = Complex64::new(0.0, 1.0);

/// Carrier of a single pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Carrier {
    angular_frequency: f64,
    phase: f64,
    quadrature_phase_offset: f64,
    quadrature_ratio: f64,
}

impl Carrier {
    /// Carrier of `pulse` at `frequency`, which may differ from the pulse's own
    /// modulation frequency after sideband clamping.
    pub(crate) fn new(pulse: &Pulse, frequency: f64) -> Self {
        Carrier {
            angular_frequency: 2.0 * PI * frequency,
            phase: pulse.phase().to_radians(),
            quadrature_phase_offset: pulse.quadrature_phase_offset().to_radians(),
            quadrature_ratio: pulse.quadrature_ratio(),
        }
    }

    /// Modulate the envelope and its DRAG term onto the in-phase and quadrature outputs.
    ///
    /// The DRAG term is applied a quarter period ahead of the envelope.
    pub(crate) fn modulate(
        &self,
        envelope: &[f64],
        drag: &[f64],
        times: &[f64],
    ) -> (Vec<f64>, Vec<f64>) {
        let mut in_phase = Vec::with_capacity(envelope.len());
        let mut quadrature = Vec::with_capacity(envelope.len());
        for ((env, drag), t) in envelope.iter().zip(drag).zip(times) {
            let angle = self.angular_frequency * t - self.phase;
            let carrier = Complex64::cis(angle);
            let quadrature_carrier = Complex64::cis(angle - self.quadrature_phase_offset);
            in_phase.push(env * carrier.re - drag * (J * carrier).re);
            quadrature.push(
                env * self.quadrature_ratio * quadrature_carrier.im
                    - drag * (J * quadrature_carrier).im,
            );
        }
        (in_phase, quadrature)
    }
}
