//! Credence propagation.
//!
//! Conclusions get `product(premise credences) * inference strength`; claims
//! (statements with neither an assigned credence nor a deriving argument) get
//! the logistic of their aggregated incoming log-odds. Nodes are evaluated in
//! topological order of the dependency graph; strongly connected components
//! with more than one member are cyclic dependencies and stay undefined,
//! together with everything downstream of them.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use tracing::{debug, warn};

use crate::config::VerifierConfig;
use crate::document::RelationKind;
use crate::graph::ArgumentGraph;
use crate::report::{CyclicDependency, PrecisionWarning};

/// Log-odds of a probability.
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Inverse of [`logit`].
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Clamp a credence into `[epsilon, 1 - epsilon]`. The flag is set when the
/// value changed.
pub fn clamp_credence(p: f64, epsilon: f64) -> (f64, bool) {
    if p < epsilon {
        (epsilon, true)
    } else if p > 1.0 - epsilon {
        (1.0 - epsilon, true)
    } else {
        (p, false)
    }
}

/// A conclusion or claim whose credence could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsetCredence {
    pub title: String,
    /// Inputs that were undefined. Empty when a claim has no incoming relations.
    pub missing: Vec<String>,
}

/// Output of one propagation pass.
#[derive(Debug, Clone, Default)]
pub struct Propagation {
    /// Effective credence per node index: assigned for leaves, computed otherwise.
    pub values: Vec<Option<f64>>,
    pub precision_warnings: Vec<PrecisionWarning>,
    pub cyclic_dependencies: Vec<CyclicDependency>,
    pub unset: Vec<UnsetCredence>,
}

impl Propagation {
    pub fn value(&self, idx: NodeIndex) -> Option<f64> {
        self.values.get(idx.index()).copied().flatten()
    }
}

/// Computes derived credences over a read-only argument graph.
///
/// The dependency graph and evaluation order are computed once, so repeated
/// runs with different leaf assignments (crux analysis) only redo arithmetic.
pub struct Propagator<'a> {
    graph: &'a ArgumentGraph,
    config: &'a VerifierConfig,
    /// Same node indices as `graph`; edges point from input to dependent.
    deps: DiGraph<(), ()>,
    /// Strongly connected components in topological order.
    order: Vec<Vec<NodeIndex>>,
    /// Members of each cyclic component, in declaration order.
    cycles: Vec<Vec<NodeIndex>>,
}

impl<'a> Propagator<'a> {
    pub fn new(graph: &'a ArgumentGraph, config: &'a VerifierConfig) -> Self {
        let mut deps: DiGraph<(), ()> = DiGraph::with_capacity(graph.node_count(), graph.edge_count());
        for _ in graph.node_indices() {
            deps.add_node(());
        }
        for arg in graph.arguments().iter().filter(|a| !a.broken) {
            let Some(conclusion) = arg.conclusion else {
                continue;
            };
            for &premise in &arg.premises {
                deps.update_edge(premise, conclusion, ());
            }
        }
        for rel in graph.relations() {
            let aggregates = matches!(rel.kind, RelationKind::Entails | RelationKind::Contrary);
            if aggregates && graph.node(rel.to).is_claim() {
                deps.update_edge(rel.from, rel.to, ());
            }
        }

        let order: Vec<Vec<NodeIndex>> = match toposort(&deps, None) {
            Ok(sorted) => sorted.into_iter().map(|idx| vec![idx]).collect(),
            Err(cycle) => {
                debug!(at = graph.title(cycle.node_id()), "Dependency graph is cyclic");
                // tarjan_scc yields components in reverse topological order.
                let mut sccs = tarjan_scc(&deps);
                sccs.reverse();
                sccs
            }
        };

        let mut cycles: Vec<Vec<NodeIndex>> = order
            .iter()
            .filter(|scc| scc.len() > 1 || deps.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut members = scc.clone();
                members.sort();
                members
            })
            .collect();
        cycles.sort();

        for cycle in &cycles {
            let titles: Vec<&str> = cycle.iter().map(|&i| graph.title(i)).collect();
            warn!(members = ?titles, "Cyclic dependency blocks propagation");
        }

        Self {
            graph,
            config,
            deps,
            order,
            cycles,
        }
    }

    /// Assigned credences of leaf statements, indexed by node.
    pub fn leaf_assignment(&self) -> Vec<Option<f64>> {
        self.graph
            .node_indices()
            .map(|idx| {
                let node = self.graph.node(idx);
                if node.is_leaf() { node.credence } else { None }
            })
            .collect()
    }

    /// Propagate the document's own credences.
    pub fn run(&self) -> Propagation {
        self.run_with(&self.leaf_assignment())
    }

    /// Propagate with an explicit leaf assignment. Entries for non-leaf nodes
    /// are ignored.
    pub fn run_with(&self, leaves: &[Option<f64>]) -> Propagation {
        let mut values: Vec<Option<f64>> = vec![None; self.graph.node_count()];
        let mut unset: Vec<(NodeIndex, UnsetCredence)> = Vec::new();
        let mut precision: Vec<(NodeIndex, PrecisionWarning)> = Vec::new();

        for scc in &self.order {
            let idx = scc[0];
            if scc.len() > 1 || self.deps.contains_edge(idx, idx) {
                continue;
            }
            values[idx.index()] = self.evaluate(idx, leaves, &values, &mut unset, &mut precision);
        }

        unset.sort_by_key(|(idx, _)| *idx);
        precision.sort_by_key(|(idx, _)| *idx);

        let cyclic_dependencies = self
            .cycles
            .iter()
            .map(|members| CyclicDependency {
                titles: members
                    .iter()
                    .map(|&i| self.graph.title(i).to_string())
                    .collect(),
            })
            .collect();

        debug!(
            computed = values.iter().filter(|v| v.is_some()).count(),
            unset = unset.len(),
            "Propagation finished"
        );

        Propagation {
            values,
            precision_warnings: precision.into_iter().map(|(_, p)| p).collect(),
            cyclic_dependencies,
            unset: unset.into_iter().map(|(_, u)| u).collect(),
        }
    }

    /// Nodes whose credence depends on `idx`, excluding `idx` itself.
    pub fn downstream(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut dfs = Dfs::new(&self.deps, idx);
        let mut reached = Vec::new();
        while let Some(next) = dfs.next(&self.deps) {
            if next != idx {
                reached.push(next);
            }
        }
        reached.sort();
        reached
    }

    pub fn graph(&self) -> &ArgumentGraph {
        self.graph
    }

    fn evaluate(
        &self,
        idx: NodeIndex,
        leaves: &[Option<f64>],
        values: &[Option<f64>],
        unset: &mut Vec<(NodeIndex, UnsetCredence)>,
        precision: &mut Vec<(NodeIndex, PrecisionWarning)>,
    ) -> Option<f64> {
        let node = self.graph.node(idx);

        if let Some(a) = node.derived_by {
            let arg = &self.graph.arguments()[a];
            // Broken arguments are already reported as structural errors.
            if arg.broken {
                return None;
            }
            let strength = arg.strength?;
            let mut product = strength;
            let mut missing = Vec::new();
            for &premise in &arg.premises {
                match values[premise.index()] {
                    Some(v) => product *= v,
                    None => missing.push(self.graph.title(premise).to_string()),
                }
            }
            if !missing.is_empty() {
                unset.push((
                    idx,
                    UnsetCredence {
                        title: node.title.clone(),
                        missing,
                    },
                ));
                return None;
            }
            return Some(product);
        }

        if node.credence.is_some() {
            return leaves.get(idx.index()).copied().flatten();
        }

        // Claim: aggregate incoming support and attack in log-odds space.
        let mut supports = Vec::new();
        let mut attacks = Vec::new();
        let mut missing = Vec::new();
        let mut any_incoming = false;
        let mut clamps = Vec::new();
        for rel in self.graph.incoming_relations(idx) {
            let sign = match rel.kind {
                RelationKind::Entails => 1.0,
                RelationKind::Contrary => -1.0,
                _ => continue,
            };
            any_incoming = true;
            let Some(p) = values[rel.from.index()] else {
                missing.push(self.graph.title(rel.from).to_string());
                continue;
            };
            let (clamped, was_clamped) = clamp_credence(p, self.config.epsilon);
            if was_clamped {
                clamps.push(PrecisionWarning {
                    title: self.graph.title(rel.from).to_string(),
                    claim: node.title.clone(),
                    original: p,
                    clamped,
                });
            }
            let contribution = sign * logit(clamped);
            if sign > 0.0 {
                supports.push(contribution);
            } else {
                attacks.push(contribution);
            }
        }

        if !any_incoming || !missing.is_empty() {
            unset.push((
                idx,
                UnsetCredence {
                    title: node.title.clone(),
                    missing,
                },
            ));
            return None;
        }

        precision.extend(clamps.into_iter().map(|c| (idx, c)));
        Some(logistic(self.config.aggregation.combine(&supports, &attacks)))
    }
}
