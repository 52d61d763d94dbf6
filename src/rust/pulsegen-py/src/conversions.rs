// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Conversions between Python objects and the pulse model.

use numpy::PyArray1;
use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyString};

use pulsegen_model::{AttributeMap, AttributeValue, PulseSequence, PulseSpec};
use pulsegen_scheduler::resolved_times;
use pulsegen_waveform::SequenceWaveforms;

use crate::error::Result;

fn attribute_value(value: &Bound<'_, PyAny>) -> PyResult<AttributeValue> {
    // `bool` is a subclass of `int` and must be checked first.
    if value.is_instance_of::<PyBool>() {
        return Ok(AttributeValue::Bool(value.extract()?));
    }
    if value.is_instance_of::<PyString>() {
        return Ok(AttributeValue::Text(value.extract()?));
    }
    Ok(AttributeValue::Number(value.extract::<f64>()?))
}

/// Creates a pulse specification from a JSON string or a `dict[str, dict[str, bool | float | str]]`.
pub(crate) fn pulse_spec_from_py(ob: &Bound<'_, PyAny>) -> Result<PulseSpec> {
    if ob.is_instance_of::<PyString>() {
        let text: String = ob.extract()?;
        return Ok(PulseSpec::from_json(&text)?);
    }
    let entries = ob.downcast::<PyDict>().map_err(|_| {
        PyTypeError::new_err("Pulse specification must be a dict or a JSON string.")
    })?;
    let mut spec = PulseSpec::new();
    for (name, attributes) in entries.iter() {
        let name: String = name.extract()?;
        let attributes = attributes
            .downcast::<PyDict>()
            .map_err(|_| PyTypeError::new_err(format!("Entry '{name}' must be a dict.")))?;
        let mut map = AttributeMap::new();
        for (key, value) in attributes.iter() {
            let key: String = key.extract()?;
            let value = attribute_value(&value).map_err(|_| {
                PyTypeError::new_err(format!(
                    "Unsupported value for '{key}' in entry '{name}', expected bool, number or str."
                ))
            })?;
            map.insert(key, value);
        }
        spec.insert(name, map);
    }
    Ok(spec)
}

/// `dict[str, tuple[float, int]]` of the resolved pulse times and numbers.
pub(crate) fn resolved_times_to_py<'py>(
    py: Python<'py>,
    sequence: &PulseSequence,
) -> PyResult<Bound<'py, PyDict>> {
    let out = PyDict::new(py);
    for (name, (time, number)) in resolved_times(sequence) {
        out.set_item(name, (time, number))?;
    }
    Ok(out)
}

/// `dict[int, tuple[ndarray, ndarray]]` of the in-phase and quadrature samples per output channel.
pub(crate) fn channels_to_py(
    py: Python<'_>,
    waveforms: SequenceWaveforms,
) -> PyResult<Bound<'_, PyDict>> {
    let out = PyDict::new(py);
    for (channel, waveform) in waveforms.channels {
        let in_phase = PyArray1::from_vec(py, waveform.in_phase);
        let quadrature = PyArray1::from_vec(py, waveform.quadrature);
        out.set_item(channel, (in_phase, quadrature))?;
    }
    Ok(out)
}
