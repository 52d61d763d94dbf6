// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Error handling for the Python bindings.
//! This module provides functionality to translate Rust errors
//! into Python exceptions.

use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;

create_exception!(_pulsegen, PulseGenError, PyException);

/// Base error for Python bindings.
///
/// If the root error is a Python exception, it is set as the cause of the
/// `PulseGenError` to keep the full traceback in Python.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    #[error(transparent)]
    Model(#[from] pulsegen_model::Error),
    #[error(transparent)]
    Scheduler(#[from] pulsegen_scheduler::Error),
    #[error(transparent)]
    Waveform(#[from] pulsegen_waveform::Error),
}

impl From<Error> for PyErr {
    fn from(error: Error) -> Self {
        let err_message = create_python_error_message(&error);
        if let Some(py_err) = find_python_root_cause(&error) {
            let error = PulseGenError::new_err(err_message);
            Python::with_gil(|py| {
                error.set_cause(py, Some(py_err.clone_ref(py)));
                error
            })
        } else {
            PulseGenError::new_err(err_message)
        }
    }
}

impl From<PyErr> for Error {
    fn from(error: PyErr) -> Self {
        Error::Anyhow(error.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn sources(error: &Error) -> Vec<&(dyn std::error::Error + 'static)> {
    let mut out = vec![];
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        out.push(cause);
        source = cause.source();
    }
    out
}

/// Collect the source errors and format them into a string.
///
/// The original error message is excluded from the context.
fn create_context_message(error: &Error) -> Option<String> {
    let mut causes = sources(error)
        .iter()
        .map(|cause| format!("{cause}"))
        .collect::<Vec<_>>();
    if causes.is_empty() {
        return None;
    }
    // Reverse to show the root cause first
    causes.reverse();
    let msg = format!("Caused by:\n  {:}", causes.join("\n  "));
    Some(msg)
}

/// Format the error message for Python exceptions.
fn create_python_error_message(error: &Error) -> String {
    if let Some(error_context) = create_context_message(error) {
        return format!("{error}\n{error_context}");
    }
    format!("{error}")
}

fn find_python_root_cause(error: &Error) -> Option<&PyErr> {
    if let Error::Anyhow(e) = error {
        return e.root_cause().downcast_ref::<PyErr>();
    }
    sources(error).last()?.downcast_ref::<PyErr>()
}
