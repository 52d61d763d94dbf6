// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use indexmap::IndexMap;
use itertools::Itertools;
use pulsegen_log::{diagnostic, warn};
use pulsegen_model::{Pulse, PulseSequence, RelativeMarker, SpacingMode};

use super::dependency_graph::{Anchor, TimingGraph};
use super::timing_result::{TimingResult, TimingWarning};
use crate::error::{Error, Result};

/// Overlaps shorter than this are rounding noise and not reported.
const OVERLAP_TOLERANCE: f64 = 1e-15;

/// Resolve the absolute times of all pulses in the sequence.
///
/// On success the pulses are sorted by absolute time, renumbered from 1 and the
/// spacing of every pulse but the last is replaced by the gap to the next pulse.
/// Pulses starting at the same time are ordered by reference depth (a reference
/// precedes its dependents), then by input order. On failure the sequence is left
/// untouched.
///
/// `previous` references follow the declared pulse numbers, not the renumbered
/// ones, so resolving an already resolved sequence yields the same result.
pub fn resolve_timing(sequence: &mut PulseSequence) -> Result<TimingResult> {
    if sequence.is_empty() {
        return Err(Error::EmptySequence);
    }
    let graph = TimingGraph::build(sequence.pulses())?;
    let order = graph
        .resolution_order()
        .map_err(|unresolved| unresolved_dependency(&graph, sequence.pulses(), &unresolved))?;
    diagnostic!(
        "Timing resolution order: {}",
        order.iter().map(|i| sequence.pulses()[*i].name()).join(", ")
    );
    let times = calculate_times(&graph, sequence.pulses(), &order);
    let depths = graph.depths(&order);

    let spacing_mode = sequence.main().spacing_mode;
    let pulses = sequence.pulses_mut();
    let sorted_times = commit_times(pulses, &depths, &times);
    let mut result = TimingResult::new();
    derive_spacing(pulses, &sorted_times, spacing_mode, &mut result);
    Ok(result)
}

/// Resolved `(absolute time, pulse number)` of each pulse, keyed by name in sequence order.
///
/// Pulses that have not been resolved are skipped.
pub fn resolved_times(sequence: &PulseSequence) -> IndexMap<String, (f64, u32)> {
    sequence
        .iter()
        .filter_map(|pulse| match (pulse.absolute_time(), pulse.pulse_number()) {
            (Some(time), Some(number)) => Some((pulse.name().to_string(), (time, number))),
            _ => None,
        })
        .collect()
}

fn unresolved_dependency(graph: &TimingGraph, pulses: &[Pulse], unresolved: &[usize]) -> Error {
    let name = |index: &usize| pulses[*index].name().to_string();
    let cycle = unresolved
        .first()
        .map(|start| graph.find_cycle(*start))
        .unwrap_or_default();
    Error::UnresolvedDependency {
        unresolved: unresolved.iter().map(name).collect(),
        cycle: cycle.iter().map(name).collect(),
    }
}

/// Start time of `pulse` placed against `reference` starting at `reference_time`.
fn time_from_reference(reference: &Pulse, reference_time: f64, pulse: &Pulse) -> f64 {
    let mut time = reference_time + pulse.time_offset().unwrap_or_default();
    if pulse.relative_marker() == RelativeMarker::End {
        time += reference.length();
    }
    time
}

/// Times indexed like `pulses`. `order` must be a topological order of `graph`.
fn calculate_times(graph: &TimingGraph, pulses: &[Pulse], order: &[usize]) -> Vec<f64> {
    let mut times = vec![0.0; pulses.len()];
    for &index in order {
        times[index] = match graph.anchor(index) {
            Anchor::Absolute(time) => time,
            Anchor::Reference(reference) => {
                time_from_reference(&pulses[reference], times[reference], &pulses[index])
            }
        };
    }
    times
}

/// Write the times, sort by time (ties by depth, then input order) and renumber.
///
/// Returns the times in the new pulse order.
fn commit_times(pulses: &mut [Pulse], depths: &[usize], times: &[f64]) -> Vec<f64> {
    let tie_break: HashMap<String, (usize, usize)> = pulses
        .iter()
        .enumerate()
        .map(|(index, pulse)| (pulse.name().to_string(), (depths[index], index)))
        .collect();
    for (pulse, time) in pulses.iter_mut().zip(times) {
        pulse.set_absolute_time(*time);
    }
    pulses.sort_by(|a, b| {
        let time_a = a.absolute_time().unwrap_or_default();
        let time_b = b.absolute_time().unwrap_or_default();
        time_a
            .total_cmp(&time_b)
            .then_with(|| tie_break[a.name()].cmp(&tie_break[b.name()]))
    });
    pulses
        .iter_mut()
        .enumerate()
        .map(|(index, pulse)| {
            pulse.set_pulse_number(index as u32 + 1);
            pulse.absolute_time().unwrap_or_default()
        })
        .collect()
}

fn derive_spacing(
    pulses: &mut [Pulse],
    times: &[f64],
    spacing_mode: SpacingMode,
    result: &mut TimingResult,
) {
    for index in 1..pulses.len() {
        let next_start = times[index];
        let next_name = pulses[index].name().to_string();
        let pulse = &mut pulses[index - 1];
        let start = times[index - 1];
        let end = start + pulse.length();
        let spacing = match spacing_mode {
            SpacingMode::EdgeToEdge => next_start - end,
            SpacingMode::StartToStart => next_start - start,
        };
        pulse.set_spacing(spacing);
        let overlap = end - next_start;
        if overlap > OVERLAP_TOLERANCE {
            warn!(
                "Pulse '{}' overlaps with pulse '{}' by {:.2} ns.",
                pulse.name(),
                next_name,
                overlap * 1e9
            );
            result.add_warning(TimingWarning::PulseOverlap {
                pulse: pulse.name().to_string(),
                next: next_name,
                overlap,
            });
        }
    }
}
