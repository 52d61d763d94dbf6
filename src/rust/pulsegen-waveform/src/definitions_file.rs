// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Waveform definition and sequence files.
//!
//! The definitions file starts with the header [`DEFINITIONS_HEADER`] followed by
//! one line of comma-separated numbers per waveform definition. Definitions are
//! referenced by their 0-based line index (header excluded). The sequences file
//! has one line per playable sequence, listing the definition indices of its pulses.
//! Definitions shared by several sequences are stored once. Duplicate lines in a
//! parsed definitions file are merged and the sequence indices remapped.

use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::Path;

use indexmap::IndexSet;
use itertools::Itertools;
use pulsegen_log::info;
use pulsegen_model::{MainParameters, Pulse, PulseSequence};

use crate::{Error, Result};

pub const DEFINITIONS_HEADER: &str = "a,w,v,s,p,f,o,drag,r,d,fix_phase";
const FIELD_COUNT: usize = 11;

/// Normalize an `f64` for hashing: all NaNs and both zeros hash alike.
fn normalize_f64(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0.0_f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Everything needed to play back a single pulse.
#[derive(Debug, Clone, Copy)]
pub struct WaveformDefinition {
    pub amplitude: f64,
    pub width: f64,
    pub plateau: f64,
    pub spacing: f64,
    pub phase: f64,
    pub modulation_frequency: f64,
    pub output_channel: u16,
    pub drag_coefficient: f64,
    pub quadrature_ratio: f64,
    pub quadrature_phase_offset: f64,
    pub fix_phase: bool,
}

impl WaveformDefinition {
    /// Definition of `pulse`, with the global DRAG coefficient applied if enabled.
    pub fn from_pulse(pulse: &Pulse, main: &MainParameters) -> Self {
        WaveformDefinition {
            amplitude: pulse.amplitude(),
            width: pulse.width(),
            plateau: pulse.plateau(),
            spacing: pulse.spacing(),
            phase: pulse.phase(),
            modulation_frequency: pulse.modulation_frequency(),
            output_channel: pulse.output_channel(),
            drag_coefficient: if main.use_global_drag {
                main.drag_coefficient
            } else {
                pulse.drag_coefficient()
            },
            quadrature_ratio: pulse.quadrature_ratio(),
            quadrature_phase_offset: pulse.quadrature_phase_offset(),
            fix_phase: pulse.fix_phase(),
        }
    }

    fn float_fields(&self) -> [f64; 9] {
        [
            self.amplitude,
            self.width,
            self.plateau,
            self.spacing,
            self.phase,
            self.modulation_frequency,
            self.drag_coefficient,
            self.quadrature_ratio,
            self.quadrature_phase_offset,
        ]
    }

    fn to_line(self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.amplitude,
            self.width,
            self.plateau,
            self.spacing,
            self.phase,
            self.modulation_frequency,
            self.output_channel,
            self.drag_coefficient,
            self.quadrature_ratio,
            self.quadrature_phase_offset,
            u8::from(self.fix_phase)
        )
    }

    fn parse_line(line: &str) -> std::result::Result<Self, String> {
        let values = line
            .split(',')
            .map(|field| {
                field
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| format!("'{}' is not a number: {e}", field.trim()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if values.len() != FIELD_COUNT {
            return Err(format!(
                "expected {FIELD_COUNT} values, found {}",
                values.len()
            ));
        }
        let output_channel = values[6];
        if output_channel.fract() != 0.0 || !(1.0..=f64::from(u16::MAX)).contains(&output_channel) {
            return Err(format!("invalid output channel {output_channel}"));
        }
        Ok(WaveformDefinition {
            amplitude: values[0],
            width: values[1],
            plateau: values[2],
            spacing: values[3],
            phase: values[4],
            modulation_frequency: values[5],
            output_channel: output_channel as u16,
            drag_coefficient: values[7],
            quadrature_ratio: values[8],
            quadrature_phase_offset: values[9],
            fix_phase: values[10] != 0.0,
        })
    }
}

impl PartialEq for WaveformDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.output_channel == other.output_channel
            && self.fix_phase == other.fix_phase
            && self
                .float_fields()
                .iter()
                .zip(other.float_fields())
                .all(|(a, b)| normalize_f64(*a) == normalize_f64(b))
    }
}

impl Eq for WaveformDefinition {}

impl Hash for WaveformDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in self.float_fields() {
            normalize_f64(value).hash(state);
        }
        self.output_channel.hash(state);
        self.fix_phase.hash(state);
    }
}

/// Deduplicated waveform definitions of several pulse sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformTable {
    definitions: IndexSet<WaveformDefinition>,
    sequences: Vec<Vec<usize>>,
}

impl WaveformTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolved sequence and return its sequence index.
    pub fn add_sequence(&mut self, sequence: &PulseSequence) -> Result<usize> {
        if !sequence.is_resolved() {
            return Err(Error::UnresolvedSequence);
        }
        let indices = sequence
            .iter()
            .map(|pulse| {
                let definition = WaveformDefinition::from_pulse(pulse, sequence.main());
                self.definitions.insert_full(definition).0
            })
            .collect();
        self.sequences.push(indices);
        Ok(self.sequences.len() - 1)
    }

    pub fn definitions(&self) -> impl ExactSizeIterator<Item = &WaveformDefinition> {
        self.definitions.iter()
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Definition indices of the sequence at `index`.
    pub fn sequence_indices(&self, index: usize) -> Option<&[usize]> {
        self.sequences.get(index).map(Vec::as_slice)
    }

    /// Definitions of the sequence at `index`, in playback order.
    pub fn sequence(&self, index: usize) -> Option<Vec<&WaveformDefinition>> {
        self.sequences.get(index).map(|indices| {
            indices
                .iter()
                .filter_map(|i| self.definitions.get_index(*i))
                .collect()
        })
    }

    pub fn write<D: Write, S: Write>(&self, mut definitions: D, mut sequences: S) -> Result<()> {
        writeln!(definitions, "{DEFINITIONS_HEADER}")?;
        for definition in &self.definitions {
            writeln!(definitions, "{}", definition.to_line())?;
        }
        for sequence in &self.sequences {
            writeln!(sequences, "{}", sequence.iter().join(","))?;
        }
        Ok(())
    }

    pub fn write_files(
        &self,
        definitions_path: impl AsRef<Path>,
        sequences_path: impl AsRef<Path>,
    ) -> Result<()> {
        let mut definitions = Vec::new();
        let mut sequences = Vec::new();
        self.write(&mut definitions, &mut sequences)?;
        std::fs::write(&definitions_path, definitions)?;
        std::fs::write(&sequences_path, sequences)?;
        info!(
            "Wrote {} waveform definitions to '{}' and {} sequences to '{}'.",
            self.definitions.len(),
            definitions_path.as_ref().display(),
            self.sequences.len(),
            sequences_path.as_ref().display()
        );
        Ok(())
    }

    pub fn parse(definitions: &str, sequences: &str) -> Result<Self> {
        let invalid = |file, line, message| Error::InvalidWaveformFile {
            file,
            line,
            message,
        };
        let mut lines = definitions.lines();
        match lines.next() {
            Some(header) if header.trim() == DEFINITIONS_HEADER => {}
            other => {
                return Err(invalid(
                    "definitions",
                    1,
                    format!("expected header '{DEFINITIONS_HEADER}', found '{}'", other.unwrap_or_default()),
                ));
            }
        }
        let mut table = WaveformTable::new();
        // Table slot of every definition line.
        let mut slots = Vec::new();
        for (number, line) in lines.enumerate() {
            let definition =
                WaveformDefinition::parse_line(line).map_err(|e| invalid("definitions", number + 2, e))?;
            slots.push(table.definitions.insert_full(definition).0);
        }
        for (number, line) in sequences.lines().enumerate() {
            let indices = line
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(|field| {
                    let index = field
                        .parse::<usize>()
                        .map_err(|e| invalid("sequences", number + 1, format!("'{field}': {e}")))?;
                    slots.get(index).copied().ok_or_else(|| {
                        invalid(
                            "sequences",
                            number + 1,
                            format!("definition index {index} out of range"),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            table.sequences.push(indices);
        }
        Ok(table)
    }

    pub fn read_files(
        definitions_path: impl AsRef<Path>,
        sequences_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let definitions = std::fs::read_to_string(definitions_path)?;
        let sequences = std::fs::read_to_string(sequences_path)?;
        Self::parse(&definitions, &sequences)
    }
}
