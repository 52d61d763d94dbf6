// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot resolve the timing of an empty pulse sequence.")]
    EmptySequence,

    #[error("Pulse name '{0}' is used more than once in the sequence.")]
    DuplicatePulseName(String),

    #[error(
        "Pulse '{0}' has the lowest pulse number and cannot be placed after a previous pulse."
    )]
    InvalidFirstReference(String),

    #[error("Pulse '{pulse}' is placed relative to '{reference}', which is not in the sequence.")]
    ReferenceNotFound { pulse: String, reference: String },

    #[error("Pulse '{0}' uses a relative time reference but does not name a reference pulse.")]
    MissingRelativeTarget(String),

    #[error("Pulse '{0}' is placed after the previous pulse but has no pulse number.")]
    MissingPulseNumber(String),

    #[error("Pulses '{first}' and '{second}' share the pulse number {number}.")]
    DuplicatePulseNumber {
        number: u32,
        first: String,
        second: String,
    },

    #[error("Absolute pulse '{0}' has neither a time offset nor an absolute time.")]
    MissingAbsoluteTime(String),

    #[error(
        "Unable to resolve the timing of pulse(s) {}: circular time reference {}.",
        .unresolved.join(", "),
        .cycle.join(" -> ")
    )]
    UnresolvedDependency {
        unresolved: Vec<String>,
        cycle: Vec<String>,
    },

    #[error(transparent)]
    Model(#[from] pulsegen_model::Error),

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_dependency_display() {
        let err = Error::UnresolvedDependency {
            unresolved: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unable to resolve the timing of pulse(s) a, b, c: circular time reference a -> b -> a."
        );
    }

    #[test]
    fn test_model_error_is_transparent() {
        let err: Error = pulsegen_model::Error::DuplicatePulseName("x".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Pulse name 'x' is used more than once in the sequence."
        );
    }
}
