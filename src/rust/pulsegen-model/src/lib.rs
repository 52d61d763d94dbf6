// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Data model of a multi-pulse experiment.
//!
//! - [`Pulse`] / [`PulseBuilder`]: one named signal event with its physical and timing attributes
//! - [`MainParameters`]: sequence-wide clock and generation settings
//! - [`PulseSequence`]: the container handed to the timing resolver and the waveform synthesizer
//! - [`PulseSpec`]: the attribute-map input boundary (JSON or host dictionaries)

use std::fmt::Display;

mod main_parameters;
mod pulse;
mod sequence;
pub mod spec;

pub use main_parameters::{MainParameters, Sideband, SpacingMode};
pub use pulse::{Pulse, PulseBuilder, RelativeMarker, TimeReference};
pub use sequence::PulseSequence;
pub use spec::{AttributeMap, AttributeValue, PulseSpec};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Pulse name '{0}' is used more than once in the sequence.")]
    DuplicatePulseName(String),

    #[error("Unknown parameter '{key}' in entry '{entry}'.")]
    InvalidParameterKey { entry: String, key: String },

    #[error("Invalid value for parameter '{key}' in entry '{entry}': {message}")]
    InvalidParameterValue {
        entry: String,
        key: String,
        message: String,
    },

    #[error("Missing required parameter '{key}' in entry '{entry}'.")]
    MissingParameter { entry: String, key: String },

    #[error("Invalid main parameters: {0}")]
    InvalidMainParameters(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn new<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Anyhow(anyhow::anyhow!(msg.to_string()))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
