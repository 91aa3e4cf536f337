//! Rule dependency graph: writer index, adjacency, cycles, layers, depths.
//!
//! Rules live in an arena in parse order; the graph stores integer indices
//! and only resolves names at its boundaries. All containers are BTree-based
//! so traversal order is a pure function of the input.

use std::collections::{BTreeMap, BTreeSet};

use pulsar_lang::RuleFacts;
use pulsar_lang::ast::Rule;


/// Directed dependency graph over a rule arena. An edge r→s means "r reads
/// a sensor that s writes", so s must be evaluated before r.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    deps: Vec<BTreeSet<usize>>,
    temporal_deps: Vec<BTreeSet<usize>>,
    writer_index: BTreeMap<String, usize>,
    sensor_readers: BTreeMap<String, BTreeSet<usize>>,
}

/// Build the graph from rules and their analysis facts (same arena order).
///
/// The writer index maps each `set_value` key to its producing rule; the
/// single-writer invariant is validated beforehand, so on a duplicate the
/// first writer wins here.
pub fn build_graph(rules: &[Rule], facts: &[RuleFacts]) -> DependencyGraph {
    debug_assert_eq!(rules.len(), facts.len());

    let mut writer_index: BTreeMap<String, usize> = BTreeMap::new();
    for (i, f) in facts.iter().enumerate() {
        for key in &f.output_sensors {
            writer_index.entry(key.clone()).or_insert(i);
        }
    }

    let mut deps = vec![BTreeSet::new(); rules.len()];
    let mut temporal_deps = vec![BTreeSet::new(); rules.len()];
    let mut sensor_readers: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
    for (i, f) in facts.iter().enumerate() {
        for sensor in &f.read_sensors {
            sensor_readers.entry(sensor.clone()).or_default().insert(i);
            if let Some(&writer) = writer_index.get(sensor) {
                deps[i].insert(writer);
            }
        }
        for sensor in &f.temporal_sensors {
            if let Some(&writer) = writer_index.get(sensor) {
                temporal_deps[i].insert(writer);
            }
        }
    }

    DependencyGraph {
        names: rules.iter().map(|r| r.name.clone()).collect(),
        deps,
        temporal_deps,
        writer_index,
        sensor_readers,
    }
}

impl DependencyGraph {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn deps_of(&self, index: usize) -> &BTreeSet<usize> {
        &self.deps[index]
    }

    /// Dependency rule names, sorted.
    pub fn dependency_names(&self, index: usize) -> Vec<String> {
        let mut names: Vec<String> = self.deps[index]
            .iter()
            .map(|&d| self.names[d].clone())
            .collect();
        names.sort();
        names
    }

    /// Temporal-dependency rule names, sorted. This single record feeds
    /// both diagnostics and the manifest.
    pub fn temporal_dependency_names(&self, index: usize) -> Vec<String> {
        let mut names: Vec<String> = self.temporal_deps[index]
            .iter()
            .map(|&d| self.names[d].clone())
            .collect();
        names.sort();
        names
    }

    /// Sensor key → producing rule name, sorted by key.
    pub fn writer_names(&self) -> BTreeMap<String, String> {
        self.writer_index
            .iter()
            .map(|(sensor, &w)| (sensor.clone(), self.names[w].clone()))
            .collect()
    }

    /// Sensor key → reader rule names, sorted.
    pub fn reader_names(&self) -> BTreeMap<String, Vec<String>> {
        self.sensor_readers
            .iter()
            .map(|(sensor, readers)| {
                let mut names: Vec<String> =
                    readers.iter().map(|&r| self.names[r].clone()).collect();
                names.sort();
                (sensor.clone(), names)
            })
            .collect()
    }

    // -- cycles -------------------------------------------------------------

    /// Two-set depth-first search collecting every cycle encountered.
    /// Cycles are canonicalized to start at their lexicographically
    /// smallest rule and deduplicated, so shared nodes do not produce
    /// repeated reports.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut visited = vec![false; self.len()];
        let mut on_stack = vec![false; self.len()];
        let mut stack: Vec<usize> = Vec::new();
        let mut found: BTreeSet<Vec<String>> = BTreeSet::new();

        for root in 0..self.len() {
            if !visited[root] {
                self.dfs_cycles(root, &mut visited, &mut on_stack, &mut stack, &mut found);
            }
        }

        found.into_iter().collect()
    }

    fn dfs_cycles(
        &self,
        node: usize,
        visited: &mut Vec<bool>,
        on_stack: &mut Vec<bool>,
        stack: &mut Vec<usize>,
        found: &mut BTreeSet<Vec<String>>,
    ) {
        visited[node] = true;
        on_stack[node] = true;
        stack.push(node);

        for &next in &self.deps[node] {
            if on_stack[next] {
                let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                let ring: Vec<usize> = stack[start..].to_vec();
                found.insert(self.canonical_cycle(&ring));
            } else if !visited[next] {
                self.dfs_cycles(next, visited, on_stack, stack, found);
            }
        }

        stack.pop();
        on_stack[node] = false;
    }

    /// Rotate the ring so its lexicographically smallest rule comes first.
    fn canonical_cycle(&self, ring: &[usize]) -> Vec<String> {
        let names: Vec<&str> = ring.iter().map(|&i| self.names[i].as_str()).collect();
        let pivot = names
            .iter()
            .enumerate()
            .min_by_key(|(_, name)| **name)
            .map(|(i, _)| i)
            .unwrap_or(0);
        names
            .iter()
            .cycle()
            .skip(pivot)
            .take(names.len())
            .map(|s| s.to_string())
            .collect()
    }

    // -- layers & depths ----------------------------------------------------

    /// Per-rule layer: 0 for rules without dependencies, otherwise
    /// 1 + max(layer of dependencies). Must only be called on an acyclic
    /// graph (after `find_cycles` came back empty).
    pub fn layers(&self) -> Vec<usize> {
        let mut layers: Vec<Option<usize>> = vec![None; self.len()];
        for i in 0..self.len() {
            self.layer_of(i, &mut layers);
        }
        layers.into_iter().map(|l| l.unwrap_or(0)).collect()
    }

    fn layer_of(&self, node: usize, layers: &mut Vec<Option<usize>>) -> usize {
        if let Some(layer) = layers[node] {
            return layer;
        }
        // Mark before descending so an unexpected cycle terminates at 0
        // instead of recursing forever.
        layers[node] = Some(0);
        let layer = self.deps[node]
            .iter()
            .map(|&d| self.layer_of(d, layers) + 1)
            .max()
            .unwrap_or(0);
        layers[node] = Some(layer);
        layer
    }

    /// Longest dependency path in the graph.
    pub fn max_depth(&self) -> usize {
        self.layers().into_iter().max().unwrap_or(0)
    }

    /// Dependency chains longer than `bound`, one per chain head (a deep
    /// rule no other deep rule depends on). Each chain runs from the head
    /// down to a leaf producer.
    pub fn deep_chains(&self, bound: usize) -> Vec<Vec<String>> {
        let layers = self.layers();
        let mut has_deep_dependent = vec![false; self.len()];
        for i in 0..self.len() {
            if layers[i] > bound {
                for &d in &self.deps[i] {
                    has_deep_dependent[d] = true;
                }
            }
        }

        let mut chains = Vec::new();
        for head in 0..self.len() {
            if layers[head] > bound && !has_deep_dependent[head] {
                let mut chain = vec![self.names[head].clone()];
                let mut node = head;
                while let Some(&next) = self.deps[node]
                    .iter()
                    .max_by_key(|&&d| (layers[d], std::cmp::Reverse(d)))
                {
                    chain.push(self.names[next].clone());
                    node = next;
                }
                chains.push(chain);
            }
        }
        chains
    }
}
