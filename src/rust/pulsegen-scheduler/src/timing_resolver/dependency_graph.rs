// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashMap, VecDeque};

use itertools::Itertools;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use pulsegen_model::{Pulse, TimeReference};

use crate::error::{Error, Result};

/// Where the start time of a pulse is taken from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Anchor {
    /// Fixed time on the absolute timeline.
    Absolute(f64),
    /// Index of the pulse this pulse is placed against.
    Reference(usize),
}

/// Dependency graph of the pulse time references.
///
/// Node `i` is the pulse at index `i` of the input slice. An edge `r -> i` means
/// that pulse `i` is timed against pulse `r`. Every pulse has at most one
/// reference, so the in-degree of a node is 0 (absolute) or 1.
pub(super) struct TimingGraph {
    graph: DiGraph<usize, ()>,
    anchors: Vec<Anchor>,
}

impl TimingGraph {
    pub(super) fn build(pulses: &[Pulse]) -> Result<Self> {
        let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(pulses.len());
        for (index, pulse) in pulses.iter().enumerate() {
            if by_name.insert(pulse.name(), index).is_some() {
                return Err(Error::DuplicatePulseName(pulse.name().to_string()));
            }
        }
        let previous = previous_pulses(pulses)?;

        let mut graph = DiGraph::with_capacity(pulses.len(), pulses.len());
        for index in 0..pulses.len() {
            graph.add_node(index);
        }
        let mut anchors = Vec::with_capacity(pulses.len());
        for (index, pulse) in pulses.iter().enumerate() {
            let anchor = match pulse.time_reference() {
                TimeReference::Absolute => {
                    let time = pulse
                        .time_offset()
                        .or(pulse.absolute_time())
                        .ok_or_else(|| Error::MissingAbsoluteTime(pulse.name().to_string()))?;
                    Anchor::Absolute(time)
                }
                TimeReference::Relative => {
                    let reference = pulse
                        .relative_to()
                        .ok_or_else(|| Error::MissingRelativeTarget(pulse.name().to_string()))?;
                    let reference =
                        by_name
                            .get(reference)
                            .ok_or_else(|| Error::ReferenceNotFound {
                                pulse: pulse.name().to_string(),
                                reference: reference.to_string(),
                            })?;
                    Anchor::Reference(*reference)
                }
                TimeReference::Previous => {
                    // `previous_pulses` has an entry for every previous-referenced pulse.
                    Anchor::Reference(previous[&index])
                }
            };
            if let Anchor::Reference(reference) = anchor {
                graph.add_edge(NodeIndex::new(reference), NodeIndex::new(index), ());
            }
            anchors.push(anchor);
        }
        Ok(TimingGraph { graph, anchors })
    }

    pub(super) fn anchor(&self, index: usize) -> Anchor {
        self.anchors[index]
    }

    /// Topological order of the pulses (Kahn's algorithm).
    ///
    /// Absolute pulses seed the queue in input order; dependents are released as
    /// soon as their reference is placed. On failure the indices of the pulses that
    /// could not be ordered are returned.
    pub(super) fn resolution_order(&self) -> std::result::Result<Vec<usize>, Vec<usize>> {
        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|node| matches!(self.anchors[node.index()], Anchor::Absolute(_)))
            .collect();
        let mut placed = vec![false; self.anchors.len()];
        let mut order = Vec::with_capacity(self.anchors.len());
        while let Some(node) = queue.pop_front() {
            placed[node.index()] = true;
            order.push(self.graph[node]);
            let dependents = self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .sorted();
            queue.extend(dependents);
        }
        if order.len() == self.anchors.len() {
            Ok(order)
        } else {
            Err(placed
                .iter()
                .enumerate()
                .filter(|(_, placed)| !**placed)
                .map(|(index, _)| index)
                .collect())
        }
    }

    /// Number of references between each pulse and its absolute anchor.
    ///
    /// `order` must be a topological order of the graph.
    pub(super) fn depths(&self, order: &[usize]) -> Vec<usize> {
        let mut depths = vec![0; self.anchors.len()];
        for &index in order {
            if let Anchor::Reference(reference) = self.anchors[index] {
                depths[index] = depths[reference] + 1;
            }
        }
        depths
    }

    /// Follow the references starting at `start` until a pulse repeats.
    ///
    /// Returns the closed loop, e.g. `[a, b, a]`.
    pub(super) fn find_cycle(&self, start: usize) -> Vec<usize> {
        let mut visited = vec![];
        let mut current = start;
        while !visited.contains(&current) {
            visited.push(current);
            match self.anchors[current] {
                Anchor::Reference(reference) => current = reference,
                Anchor::Absolute(_) => return visited,
            }
        }
        let loop_start = visited
            .iter()
            .position(|index| *index == current)
            .unwrap_or_default();
        let mut cycle = visited.split_off(loop_start);
        cycle.push(current);
        cycle
    }
}

/// Map each previous-referenced pulse to the pulse with the closest lower declared number.
fn previous_pulses(pulses: &[Pulse]) -> Result<HashMap<usize, usize>> {
    if let Some(pulse) = pulses
        .iter()
        .find(|p| p.time_reference() == TimeReference::Previous && p.declared_number().is_none())
    {
        return Err(Error::MissingPulseNumber(pulse.name().to_string()));
    }
    let numbered = pulses
        .iter()
        .enumerate()
        .filter_map(|(index, pulse)| pulse.declared_number().map(|number| (number, index)))
        .sorted()
        .collect::<Vec<_>>();
    if let Some(((number, first), (_, second))) = numbered
        .iter()
        .tuple_windows()
        .find(|((a, _), (b, _))| a == b)
    {
        return Err(Error::DuplicatePulseNumber {
            number: *number,
            first: pulses[*first].name().to_string(),
            second: pulses[*second].name().to_string(),
        });
    }
    if let Some((_, first)) = numbered.first() {
        if pulses[*first].time_reference() == TimeReference::Previous {
            return Err(Error::InvalidFirstReference(
                pulses[*first].name().to_string(),
            ));
        }
    }
    Ok(numbered
        .iter()
        .tuple_windows()
        .filter(|(_, (_, current))| pulses[*current].time_reference() == TimeReference::Previous)
        .map(|((_, previous), (_, current))| (*current, *previous))
        .collect())
}
