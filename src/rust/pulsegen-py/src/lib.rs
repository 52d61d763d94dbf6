// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Python extension module of the pulse generator.

use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use pulsegen_model::PulseSequence;
use pulsegen_scheduler::{TimingResult, resolve_timing};
use pulsegen_waveform::{SynthesisOptions, WaveformTable, synthesize};

mod conversions;
mod error;

use conversions::{channels_to_py, pulse_spec_from_py, resolved_times_to_py};
use error::Result;

/// Python log level at or below which per-pulse diagnostics are emitted.
///
/// Sits between `logging.DEBUG` and `logging.INFO`.
const DIAGNOSTICS_LEVEL: i64 = 15;

fn resolved_sequence(spec: &Bound<'_, PyAny>) -> Result<(PulseSequence, TimingResult)> {
    let spec = pulse_spec_from_py(spec)?;
    let mut sequence = PulseSequence::from_spec(&spec)?;
    let timing = resolve_timing(&mut sequence)?;
    Ok((sequence, timing))
}

#[pyfunction(name = "init_logging")]
fn init_logging_py(log_level: i64) {
    pulsegen_log::init_logging(log_level <= DIAGNOSTICS_LEVEL);
}

/// Resolve the pulse times of a specification.
///
/// Returns `{name: (absolute_time, pulse_number)}` in time order.
#[pyfunction(name = "resolve_timing")]
fn resolve_timing_py<'py>(
    py: Python<'py>,
    spec: &Bound<'py, PyAny>,
) -> Result<Bound<'py, PyDict>> {
    let (sequence, _) = resolved_sequence(spec)?;
    Ok(resolved_times_to_py(py, &sequence)?)
}

/// Resolve a specification and generate its output waveforms.
#[pyfunction(name = "synthesize")]
fn synthesize_py<'py>(py: Python<'py>, spec: &Bound<'py, PyAny>) -> Result<Bound<'py, PyDict>> {
    let (sequence, timing) = resolved_sequence(spec)?;
    let options = SynthesisOptions::from_main_parameters(sequence.main());
    let waveforms = synthesize(&sequence, &options)?;
    let warnings = timing
        .warnings()
        .iter()
        .map(ToString::to_string)
        .chain(waveforms.warnings.iter().map(ToString::to_string))
        .collect::<Vec<_>>();

    let out = PyDict::new(py);
    out.set_item("times", resolved_times_to_py(py, &sequence)?)?;
    out.set_item("sample_count", waveforms.sample_count)?;
    out.set_item("warnings", warnings)?;
    out.set_item("channels", channels_to_py(py, waveforms)?)?;
    Ok(out)
}

/// Write the waveform definitions and sequences files for several specifications.
///
/// Sequence `i` of the sequences file is `specs[i]`. Returns the number of distinct
/// waveform definitions.
#[pyfunction]
fn write_waveform_files(
    specs: &Bound<'_, PyList>,
    definitions_path: PathBuf,
    sequences_path: PathBuf,
) -> Result<usize> {
    let mut table = WaveformTable::new();
    for spec in specs.iter() {
        let (sequence, _) = resolved_sequence(&spec)?;
        table.add_sequence(&sequence)?;
    }
    table.write_files(definitions_path, sequences_path)?;
    Ok(table.definitions().len())
}

#[pymodule]
mod _pulsegen {
    use super::*;

    #[pymodule_export]
    use super::init_logging_py;

    #[pymodule_export]
    use super::resolve_timing_py;

    #[pymodule_export]
    use super::synthesize_py;

    #[pymodule_export]
    use super::write_waveform_files;

    #[pymodule_init]
    fn init(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Route the Rust `log` records to Python `logging`.
        pyo3_log::init();
        m.add(
            "PulseGenError",
            m.py().get_type::<crate::error::PulseGenError>(),
        )?;
        Ok(())
    }
}
