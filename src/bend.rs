//! Detection of dangerous bends.
//!
//! A node of a way is a dangerous bend, if the road changes its direction
//! sharply within a short distance around the node. For every node, the
//! preceding and following nodes within the distance threshold are collected,
//! and the smallest angle subtended at the node by any pair of a preceding and
//! a following node is compared against the angle threshold.

use crate::config::Config;
use crate::geo::{distance, subtended_angle, GeoPoint};
use crate::way::{Node, Way};

use itertools::iproduct;
use log::trace;

/// Consumer of the ways of a dataset.
///
/// The dataset reader calls `process_way` once for every way, in dataset
/// order.
pub trait WayConsumer {
    fn process_way(&mut self, way: &Way);
}

/// A node detected as a dangerous bend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Finding {
    pub id: i64,
    pub location: GeoPoint,
    /// Way on which the bend was found
    pub way_id: i64,
}

impl Finding {
    /// Link to the node on openstreetmap.org.
    pub fn permalink(&self) -> String {
        format!("https://www.openstreetmap.org/node/{}", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

/// Indexes of the nodes around a pivot node, scanning outward in one
/// direction.
///
/// The scan stops at the first node farther away from the pivot than
/// `max_distance`; nodes behind it are never visited, even if they are close
/// again.
#[derive(Debug, Clone)]
pub struct Window<'a> {
    nodes: &'a [Node],
    pivot: GeoPoint,
    max_distance: f64,
    direction: Direction,
    next: Option<usize>,
}

impl<'a> Window<'a> {
    /// Nodes preceding `pivot` in `nodes`, nearest first.
    pub fn preceding(nodes: &'a [Node], pivot: usize, max_distance: f64) -> Self {
        Self {
            nodes,
            pivot: nodes[pivot].location,
            max_distance,
            direction: Direction::Backward,
            next: pivot.checked_sub(1),
        }
    }

    /// Nodes following `pivot` in `nodes`, nearest first.
    pub fn following(nodes: &'a [Node], pivot: usize, max_distance: f64) -> Self {
        Self {
            nodes,
            pivot: nodes[pivot].location,
            max_distance,
            direction: Direction::Forward,
            next: Some(pivot + 1).filter(|&idx| idx < nodes.len()),
        }
    }

    fn step(&self, idx: usize) -> Option<usize> {
        match self.direction {
            Direction::Backward => idx.checked_sub(1),
            Direction::Forward => Some(idx + 1).filter(|&idx| idx < self.nodes.len()),
        }
    }
}

impl<'a> Iterator for Window<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let idx = self.next?;
        if distance(self.nodes[idx].location, self.pivot) > self.max_distance {
            self.next = None;
            return None;
        }
        self.next = self.step(idx);
        Some(idx)
    }
}

/// Smallest angle subtended at node `pivot` by any pair of a preceding and a
/// following node within `max_distance`.
///
/// Returns infinity if one of the sides has no node within reach. Undefined
/// angles (coincident nodes) are ignored.
pub fn min_subtended_angle(nodes: &[Node], pivot: usize, max_distance: f64) -> f64 {
    let left: Vec<usize> = Window::preceding(nodes, pivot, max_distance).collect();
    if left.is_empty() {
        return f64::INFINITY;
    }
    let right: Vec<usize> = Window::following(nodes, pivot, max_distance).collect();

    let center = nodes[pivot].location;
    iproduct!(left.iter(), right.iter())
        .map(|(&l, &r)| subtended_angle(nodes[l].location, center, nodes[r].location))
        // f64::min ignores NaN
        .fold(f64::INFINITY, f64::min)
}

/// Collects dangerous bends of all ways it is shown.
#[derive(Debug)]
pub struct BendDetector {
    config: Config,
    findings: Vec<Finding>,
    num_admitted_ways: usize,
    num_rejected_ways: usize,
}

impl BendDetector {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            findings: Vec::new(),
            num_admitted_ways: 0,
            num_rejected_ways: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Checks if the tags of `way` make it eligible for the detection.
    ///
    /// A way is rejected if it has any blacklisted tag, or if its `highway`
    /// tag is missing or not accepted.
    pub fn admits(&self, way: &Way) -> bool {
        if way
            .tags
            .iter()
            .any(|(key, value)| self.config.is_blacklisted(key, value))
        {
            return false;
        }
        match way.tags.get("highway") {
            Some(value) => self.config.is_highway(value),
            None => false,
        }
    }

    /// Dangerous bends found so far, in the order they were found.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    pub fn num_admitted_ways(&self) -> usize {
        self.num_admitted_ways
    }

    pub fn num_rejected_ways(&self) -> usize {
        self.num_rejected_ways
    }

    fn add_dangerous_bends(&mut self, way: &Way) {
        let nodes = &way.nodes;
        for idx in 0..nodes.len() {
            let min_angle = min_subtended_angle(nodes, idx, self.config.distance_threshold);
            if min_angle < self.config.angle_threshold {
                let node = &nodes[idx];
                trace!(
                    "Dangerous bend at node {} of way {}: {:.1} degrees",
                    node.id,
                    way.id,
                    min_angle.to_degrees()
                );
                self.findings.push(Finding {
                    id: node.id,
                    location: node.location,
                    way_id: way.id,
                });
            }
        }
    }
}

impl WayConsumer for BendDetector {
    fn process_way(&mut self, way: &Way) {
        if !self.admits(way) {
            self.num_rejected_ways += 1;
            return;
        }
        self.num_admitted_ways += 1;
        self.add_dangerous_bends(way);
    }
}
