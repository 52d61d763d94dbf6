// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Attribute-map input boundary.
//!
//! A pulse specification maps pulse names to attribute maps. Two entry names
//! are reserved:
//!
//! - `main`: the [`MainParameters`] of the sequence
//! - `inverted`: attribute defaults applied to every pulse flagged `is_inverted`
//!
//! Attribute keys are validated once here; the rest of the pipeline works on
//! typed [`Pulse`] values.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{Error, MainParameters, Pulse, PulseBuilder, PulseSequence, Result};

pub const MAIN_ENTRY: &str = "main";
pub const INVERTED_ENTRY: &str = "inverted";

/// A single attribute value as found in JSON documents or host dictionaries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

pub type AttributeMap = IndexMap<String, AttributeValue>;

/// Pulse attributes accepted in a specification.
///
/// Each attribute has a long name and, for the physical attributes, a short alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PulseKey {
    Amplitude,
    Width,
    Plateau,
    Spacing,
    Phase,
    ModulationFrequency,
    OutputChannel,
    DragCoefficient,
    QuadratureRatio,
    QuadraturePhaseOffset,
    FixPhase,
    TimeReference,
    TimeOffset,
    RelativeTo,
    RelativeMarker,
    PulseNumber,
    IsInverted,
    AbsoluteTime,
}

impl PulseKey {
    fn from_key(key: &str) -> Option<Self> {
        let out = match key {
            "amplitude" | "a" => PulseKey::Amplitude,
            "width" | "w" => PulseKey::Width,
            "plateau" | "v" => PulseKey::Plateau,
            "spacing" | "s" => PulseKey::Spacing,
            "phase" | "p" => PulseKey::Phase,
            "modulation_frequency" | "f" => PulseKey::ModulationFrequency,
            "output_channel" | "o" => PulseKey::OutputChannel,
            "drag_coefficient" | "drag" => PulseKey::DragCoefficient,
            "quadrature_ratio" | "r" => PulseKey::QuadratureRatio,
            "quadrature_phase_offset" | "d" => PulseKey::QuadraturePhaseOffset,
            "fix_phase" => PulseKey::FixPhase,
            "time_reference" => PulseKey::TimeReference,
            "time_offset" => PulseKey::TimeOffset,
            "relative_to" => PulseKey::RelativeTo,
            "relative_marker" => PulseKey::RelativeMarker,
            "pulse_number" => PulseKey::PulseNumber,
            "is_inverted" => PulseKey::IsInverted,
            "absolute_time" => PulseKey::AbsoluteTime,
            _ => return None,
        };
        Some(out)
    }
}

/// A pulse specification: named attribute maps, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PulseSpec {
    entries: IndexMap<String, AttributeMap>,
}

impl PulseSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, attributes: AttributeMap) {
        self.entries.insert(name.into(), attributes);
    }

    pub fn get(&self, name: &str) -> Option<&AttributeMap> {
        self.entries.get(name)
    }

    /// Names of the pulse entries, i.e. all entries except `main` and `inverted`.
    pub fn pulse_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|name| *name != MAIN_ENTRY && *name != INVERTED_ENTRY)
    }

    pub fn main_parameters(&self) -> Result<MainParameters> {
        let attributes = self.entries.get(MAIN_ENTRY).ok_or_else(|| Error::MissingParameter {
            entry: MAIN_ENTRY.to_string(),
            key: "sample_rate".to_string(),
        })?;
        let main = parse_main_parameters(attributes)?;
        main.validate()?;
        Ok(main)
    }

    /// Build the typed pulses, applying the `inverted` defaults.
    pub fn pulses(&self) -> Result<Vec<Pulse>> {
        let empty = AttributeMap::new();
        let inverted_defaults = self.entries.get(INVERTED_ENTRY).unwrap_or(&empty);
        // Defaults are validated even when no pulse is inverted.
        for (key, value) in inverted_defaults {
            apply_pulse_attribute(Pulse::builder(INVERTED_ENTRY), INVERTED_ENTRY, key, value)?;
        }
        let mut pulses = Vec::new();
        for name in self.pulse_names() {
            let attributes = &self.entries[name];
            let is_inverted = match attributes.get("is_inverted") {
                Some(value) => expect_bool(name, "is_inverted", value)?,
                None => false,
            };
            let mut builder = Pulse::builder(name);
            if is_inverted {
                for (key, value) in inverted_defaults {
                    if !attributes.contains_key(key) && !has_alias(attributes, key) {
                        builder = apply_pulse_attribute(builder, name, key, value)?;
                    }
                }
            }
            for (key, value) in attributes {
                builder = apply_pulse_attribute(builder, name, key, value)?;
            }
            pulses.push(builder.build());
        }
        Ok(pulses)
    }
}

impl PulseSequence {
    /// Build a sequence from a specification.
    pub fn from_spec(spec: &PulseSpec) -> Result<Self> {
        PulseSequence::with_pulses(spec.main_parameters()?, spec.pulses()?)
    }
}

/// Whether `attributes` sets the same attribute as `key` under another name.
fn has_alias(attributes: &AttributeMap, key: &str) -> bool {
    let Some(target) = PulseKey::from_key(key) else {
        return false;
    };
    attributes
        .keys()
        .any(|k| PulseKey::from_key(k) == Some(target))
}

fn invalid_value(entry: &str, key: &str, message: impl Into<String>) -> Error {
    Error::InvalidParameterValue {
        entry: entry.to_string(),
        key: key.to_string(),
        message: message.into(),
    }
}

fn expect_f64(entry: &str, key: &str, value: &AttributeValue) -> Result<f64> {
    match value {
        AttributeValue::Number(v) if v.is_finite() => Ok(*v),
        AttributeValue::Number(v) => Err(invalid_value(entry, key, format!("{v} is not finite"))),
        other => Err(invalid_value(
            entry,
            key,
            format!("expected a number, got {other:?}"),
        )),
    }
}

fn expect_bool(entry: &str, key: &str, value: &AttributeValue) -> Result<bool> {
    match value {
        AttributeValue::Bool(v) => Ok(*v),
        AttributeValue::Number(v) if *v == 0.0 || *v == 1.0 => Ok(*v == 1.0),
        other => Err(invalid_value(
            entry,
            key,
            format!("expected a boolean, got {other:?}"),
        )),
    }
}

fn expect_integer(entry: &str, key: &str, value: &AttributeValue, minimum: u64) -> Result<u64> {
    let v = expect_f64(entry, key, value)?;
    if v.fract() != 0.0 || v < minimum as f64 || v > u32::MAX as f64 {
        return Err(invalid_value(
            entry,
            key,
            format!("expected an integer >= {minimum}, got {v}"),
        ));
    }
    Ok(v as u64)
}

fn expect_text<'a>(entry: &str, key: &str, value: &'a AttributeValue) -> Result<&'a str> {
    match value {
        AttributeValue::Text(v) => Ok(v),
        other => Err(invalid_value(
            entry,
            key,
            format!("expected a string, got {other:?}"),
        )),
    }
}

fn apply_pulse_attribute(
    builder: PulseBuilder,
    entry: &str,
    key: &str,
    value: &AttributeValue,
) -> Result<PulseBuilder> {
    let pulse_key = PulseKey::from_key(key).ok_or_else(|| Error::InvalidParameterKey {
        entry: entry.to_string(),
        key: key.to_string(),
    })?;
    let builder = match pulse_key {
        PulseKey::Amplitude => builder.amplitude(expect_f64(entry, key, value)?),
        PulseKey::Width => builder.width(expect_f64(entry, key, value)?),
        PulseKey::Plateau => builder.plateau(expect_f64(entry, key, value)?),
        PulseKey::Spacing => builder.spacing(expect_f64(entry, key, value)?),
        PulseKey::Phase => builder.phase(expect_f64(entry, key, value)?),
        PulseKey::ModulationFrequency => {
            builder.modulation_frequency(expect_f64(entry, key, value)?)
        }
        PulseKey::OutputChannel => {
            let channel = expect_integer(entry, key, value, 1)?;
            let channel = u16::try_from(channel)
                .map_err(|_| invalid_value(entry, key, "channel number too large"))?;
            builder.output_channel(channel)
        }
        PulseKey::DragCoefficient => builder.drag_coefficient(expect_f64(entry, key, value)?),
        PulseKey::QuadratureRatio => builder.quadrature_ratio(expect_f64(entry, key, value)?),
        PulseKey::QuadraturePhaseOffset => {
            builder.quadrature_phase_offset(expect_f64(entry, key, value)?)
        }
        PulseKey::FixPhase => builder.fix_phase(expect_bool(entry, key, value)?),
        PulseKey::TimeReference => builder.time_reference(
            expect_text(entry, key, value)?
                .parse()
                .map_err(|e: String| invalid_value(entry, key, e))?,
        ),
        PulseKey::TimeOffset => builder.time_offset(expect_f64(entry, key, value)?),
        PulseKey::RelativeTo => builder.reference_name(expect_text(entry, key, value)?),
        PulseKey::RelativeMarker => builder.relative_marker(
            expect_text(entry, key, value)?
                .parse()
                .map_err(|e: String| invalid_value(entry, key, e))?,
        ),
        PulseKey::PulseNumber => builder.pulse_number(expect_integer(entry, key, value, 0)? as u32),
        PulseKey::IsInverted => builder.inverted(expect_bool(entry, key, value)?),
        PulseKey::AbsoluteTime => builder.absolute_time(expect_f64(entry, key, value)?),
    };
    Ok(builder)
}

fn parse_main_parameters(attributes: &AttributeMap) -> Result<MainParameters> {
    let entry = MAIN_ENTRY;
    let sample_rate = match attributes.get("sample_rate") {
        Some(value) => expect_f64(entry, "sample_rate", value)?,
        None => {
            return Err(Error::MissingParameter {
                entry: entry.to_string(),
                key: "sample_rate".to_string(),
            });
        }
    };
    let mut main = MainParameters::new(sample_rate);
    for (key, value) in attributes {
        match key.as_str() {
            "sample_rate" => {}
            "truncation_range" => main.truncation_range = expect_f64(entry, key, value)?,
            "first_pulse_delay" => main.first_pulse_delay = expect_f64(entry, key, value)?,
            "dead_time" => main.dead_time = expect_f64(entry, key, value)?,
            "sequence_duration" => main.sequence_duration = Some(expect_f64(entry, key, value)?),
            "sample_count" => {
                main.sample_count = Some(expect_integer(entry, key, value, 1)? as usize)
            }
            "number_of_outputs" => {
                let outputs = expect_integer(entry, key, value, 1)?;
                main.number_of_outputs = u16::try_from(outputs)
                    .map_err(|_| invalid_value(entry, key, "too many outputs"))?;
            }
            "spacing_mode" => {
                main.spacing_mode = expect_text(entry, key, value)?
                    .parse()
                    .map_err(|e: String| invalid_value(entry, key, e))?
            }
            "use_global_drag" => main.use_global_drag = expect_bool(entry, key, value)?,
            "drag_coefficient" | "drag" => main.drag_coefficient = expect_f64(entry, key, value)?,
            "drag_on_square" => main.drag_on_square = expect_bool(entry, key, value)?,
            "sideband" => {
                main.sideband = Some(
                    expect_text(entry, key, value)?
                        .parse()
                        .map_err(|e: String| invalid_value(entry, key, e))?,
                )
            }
            "final_time" => main.final_time = Some(expect_f64(entry, key, value)?),
            _ => {
                return Err(Error::InvalidParameterKey {
                    entry: entry.to_string(),
                    key: key.to_string(),
                });
            }
        }
    }
    Ok(main)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RelativeMarker, Sideband, SpacingMode, TimeReference};

    const SPEC: &str = r#"{
        "main": {"sample_rate": 1e9, "truncation_range": 1, "number_of_outputs": 2},
        "buffer": {"time_reference": "absolute", "time_offset": 0, "w": 0, "v": 0},
        "pulse1": {"time_reference": "relative", "relative_to": "buffer",
                   "relative_marker": "end", "time_offset": 0,
                   "w": 100e-9, "v": 0, "a": 0.5, "f": 50e6, "o": 2},
        "readout": {"time_reference": "relative", "relative_to": "pulse1",
                    "w": 0, "v": 400e-9, "a": 1.0, "f": 90e6, "o": 1}
    }"#;

    #[test]
    fn test_parse_json_spec() {
        let spec = PulseSpec::from_json(SPEC).unwrap();
        assert_eq!(
            spec.pulse_names().collect::<Vec<_>>(),
            vec!["buffer", "pulse1", "readout"]
        );
        let sequence = PulseSequence::from_spec(&spec).unwrap();
        assert_eq!(sequence.main().sample_rate, 1e9);
        assert_eq!(sequence.main().truncation_range, 1.0);
        assert_eq!(sequence.len(), 3);

        let pulse1 = sequence.pulse("pulse1").unwrap();
        assert_eq!(pulse1.time_reference(), TimeReference::Relative);
        assert_eq!(pulse1.relative_to(), Some("buffer"));
        assert_eq!(pulse1.relative_marker(), RelativeMarker::End);
        assert_eq!(pulse1.width(), 100e-9);
        assert_eq!(pulse1.amplitude(), 0.5);
        assert_eq!(pulse1.modulation_frequency(), 50e6);
        assert_eq!(pulse1.output_channel(), 2);

        let buffer = sequence.pulse("buffer").unwrap();
        assert_eq!(buffer.time_reference(), TimeReference::Absolute);
        assert_eq!(buffer.time_offset(), Some(0.0));
    }

    #[test]
    fn test_invalid_parameter_key() {
        let spec = PulseSpec::from_json(
            r#"{"main": {"sample_rate": 1e9}, "x": {"amplitude": 1, "colour": 3}}"#,
        )
        .unwrap();
        let err = PulseSequence::from_spec(&spec).unwrap_err();
        assert!(
            matches!(err, Error::InvalidParameterKey { ref entry, ref key } if entry == "x" && key == "colour")
        );
    }

    #[test]
    fn test_invalid_main_key() {
        let spec =
            PulseSpec::from_json(r#"{"main": {"sample_rate": 1e9, "speed": 2}}"#).unwrap();
        let err = spec.main_parameters().unwrap_err();
        assert!(matches!(err, Error::InvalidParameterKey { ref key, .. } if key == "speed"));
    }

    #[test]
    fn test_missing_main() {
        let spec = PulseSpec::from_json(r#"{"x": {"a": 1}}"#).unwrap();
        assert!(matches!(
            spec.main_parameters(),
            Err(Error::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_invalid_values() {
        let spec = PulseSpec::from_json(
            r#"{"main": {"sample_rate": 1e9}, "x": {"o": 0}}"#,
        )
        .unwrap();
        assert!(matches!(
            spec.pulses(),
            Err(Error::InvalidParameterValue { .. })
        ));
        let spec = PulseSpec::from_json(
            r#"{"main": {"sample_rate": 1e9}, "x": {"time_reference": "later"}}"#,
        )
        .unwrap();
        assert!(matches!(
            spec.pulses(),
            Err(Error::InvalidParameterValue { .. })
        ));
        let spec = PulseSpec::from_json(
            r#"{"main": {"sample_rate": 1e9}, "x": {"w": "wide"}}"#,
        )
        .unwrap();
        assert!(matches!(
            spec.pulses(),
            Err(Error::InvalidParameterValue { .. })
        ));
    }

    #[test]
    fn test_main_parameters() {
        let spec = PulseSpec::from_json(
            r#"{"main": {"sample_rate": 2.4e9, "first_pulse_delay": 1e-6, "dead_time": 2e-6,
                         "sample_count": 4096, "spacing_mode": "start_to_start",
                         "use_global_drag": true, "drag": 0.3, "drag_on_square": 1,
                         "sideband": "lower", "final_time": 5e-6}}"#,
        )
        .unwrap();
        let main = spec.main_parameters().unwrap();
        assert_eq!(main.sample_rate, 2.4e9);
        assert_eq!(main.first_pulse_delay, 1e-6);
        assert_eq!(main.dead_time, 2e-6);
        assert_eq!(main.sample_count, Some(4096));
        assert_eq!(main.spacing_mode, SpacingMode::StartToStart);
        assert!(main.use_global_drag);
        assert_eq!(main.drag_coefficient, 0.3);
        assert!(main.drag_on_square);
        assert_eq!(main.sideband, Some(Sideband::Lower));
        assert_eq!(main.final_time, Some(5e-6));
    }

    #[test]
    fn test_inverted_defaults() {
        let spec = PulseSpec::from_json(
            r#"{"main": {"sample_rate": 1e9},
                "inverted": {"a": -0.2, "w": 20e-9, "o": 2},
                "x": {"is_inverted": true, "amplitude": -0.4},
                "y": {"a": 0.1}}"#,
        )
        .unwrap();
        let pulses = spec.pulses().unwrap();
        assert_eq!(pulses.len(), 2);
        let x = &pulses[0];
        // Explicit attributes win over the defaults, also under a long name.
        assert_eq!(x.amplitude(), -0.4);
        assert_eq!(x.width(), 20e-9);
        assert_eq!(x.output_channel(), 2);
        assert!(x.is_inverted());
        let y = &pulses[1];
        assert_eq!(y.amplitude(), 0.1);
        assert_eq!(y.width(), 0.0);
        assert_eq!(y.output_channel(), 1);
    }

    #[test]
    fn test_invalid_inverted_key() {
        let spec = PulseSpec::from_json(
            r#"{"main": {"sample_rate": 1e9}, "inverted": {"flip": true}}"#,
        )
        .unwrap();
        assert!(matches!(
            spec.pulses(),
            Err(Error::InvalidParameterKey { ref entry, .. }) if entry == "inverted"
        ));
    }

    #[test]
    fn test_programmatic_spec() {
        let mut spec = PulseSpec::new();
        spec.insert(
            "main",
            AttributeMap::from([("sample_rate".to_string(), 1e9.into())]),
        );
        spec.insert(
            "p",
            AttributeMap::from([
                ("time_reference".to_string(), "absolute".into()),
                ("time_offset".to_string(), 1e-6.into()),
                ("fix_phase".to_string(), true.into()),
            ]),
        );
        let sequence = PulseSequence::from_spec(&spec).unwrap();
        let p = sequence.pulse("p").unwrap();
        assert!(p.fix_phase());
        assert_eq!(p.time_offset(), Some(1e-6));
    }
}
