// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::{Error, MainParameters, Pulse, Result};

/// An ordered collection of uniquely named pulses together with the sequence parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseSequence {
    main: MainParameters,
    pulses: Vec<Pulse>,
}

impl PulseSequence {
    pub fn new(main: MainParameters) -> Self {
        PulseSequence {
            main,
            pulses: Vec::new(),
        }
    }

    pub fn with_pulses(main: MainParameters, pulses: impl IntoIterator<Item = Pulse>) -> Result<Self> {
        let mut sequence = Self::new(main);
        for pulse in pulses {
            sequence.add_pulse(pulse)?;
        }
        Ok(sequence)
    }

    pub fn main(&self) -> &MainParameters {
        &self.main
    }

    pub fn add_pulse(&mut self, pulse: Pulse) -> Result<()> {
        if self.pulse(pulse.name()).is_some() {
            return Err(Error::DuplicatePulseName(pulse.name().to_string()));
        }
        self.pulses.push(pulse);
        Ok(())
    }

    pub fn pulse(&self, name: &str) -> Option<&Pulse> {
        self.pulses.iter().find(|p| p.name() == name)
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    /// Mutable access for the timing resolver.
    ///
    /// Pulses can be reordered and their computed attributes updated, but not
    /// added or removed.
    pub fn pulses_mut(&mut self) -> &mut [Pulse] {
        &mut self.pulses
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Pulse> {
        self.pulses.iter()
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// Whether every pulse has an absolute time and the pulses are in ascending time order.
    pub fn is_resolved(&self) -> bool {
        let times: Option<Vec<f64>> = self.pulses.iter().map(|p| p.absolute_time()).collect();
        match times {
            Some(times) => times.windows(2).all(|w| w[0] <= w[1]),
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a PulseSequence {
    type Item = &'a Pulse;
    type IntoIter = std::slice::Iter<'a, Pulse>;

    fn into_iter(self) -> Self::IntoIter {
        self.pulses.iter()
    }
}
