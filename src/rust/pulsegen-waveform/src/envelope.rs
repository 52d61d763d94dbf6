// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::f64::consts::PI;

/// Shape of a pulse envelope: Gaussian edges around a flat plateau.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EnvelopeShape {
    /// Standard deviation of the Gaussian edges. Zero for square pulses.
    pub std: f64,
    pub plateau: f64,
}

impl EnvelopeShape {
    pub(crate) fn new(width: f64, plateau: f64) -> Self {
        EnvelopeShape {
            std: width / (2.0 * PI).sqrt(),
            plateau,
        }
    }

    pub(crate) fn is_square(&self) -> bool {
        self.std <= 0.0
    }

    /// Unit-amplitude envelope at time `t` relative to the pulse center.
    ///
    /// A square plateau covers `[-plateau / 2, plateau / 2)`, like the sample window.
    pub(crate) fn value(&self, t: f64) -> f64 {
        let half_plateau = self.plateau / 2.0;
        if self.is_square() {
            if (-half_plateau..half_plateau).contains(&t) {
                return 1.0;
            }
            return 0.0;
        }
        let gaussian = |x: f64| (-x * x / (2.0 * self.std * self.std)).exp();
        if t < -half_plateau {
            gaussian(t + half_plateau)
        } else if t > half_plateau {
            gaussian(t - half_plateau)
        } else {
            1.0
        }
    }
}

/// Gradient of uniformly spaced samples, per sample.
///
/// Central differences in the interior and one-sided differences at both ends.
/// A single sample has a zero gradient.
pub fn numerical_gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| {
            if i == 0 {
                values[1] - values[0]
            } else if i == n - 1 {
                values[n - 1] - values[n - 2]
            } else {
                (values[i + 1] - values[i - 1]) / 2.0
            }
        })
        .collect()
}
