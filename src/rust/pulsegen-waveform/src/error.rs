// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("The pulse sequence must be resolved before waveforms can be generated.")]
    UnresolvedSequence,

    #[error(
        "Pulse '{pulse}' is assigned to output channel {channel}, but only channels 1 to {number_of_outputs} exist."
    )]
    InvalidOutputChannel {
        pulse: String,
        channel: u16,
        number_of_outputs: u16,
    },

    #[error("Invalid {file} file, line {line}: {message}")]
    InvalidWaveformFile {
        file: &'static str,
        line: usize,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

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
