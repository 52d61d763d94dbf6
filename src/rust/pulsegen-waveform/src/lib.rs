// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Waveform synthesis of resolved pulse sequences.
//!
//! Every pulse is rendered as a Gaussian or square envelope with an optional
//! DRAG correction, modulated onto in-phase and quadrature outputs and added into
//! the buffers of its output channel.

pub mod definitions_file;
mod envelope;
pub mod error;
mod modulation;
mod settings;
mod sideband;
mod synthesizer;

pub use definitions_file::{DEFINITIONS_HEADER, WaveformDefinition, WaveformTable};
pub use envelope::numerical_gradient;
pub use error::{Error, Result};
pub use settings::{SanitizationChange, SynthesisOptions};
pub use sideband::SidebandFlipWarning;
pub use synthesizer::{ChannelWaveform, PulseFragment, SequenceWaveforms, sample_pulse, synthesize};
