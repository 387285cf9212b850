//! Crux analysis: which leaf credences the targets are most sensitive to.
//!
//! Every leaf that reaches a target is perturbed up and down by `delta`
//! (clipped to [0, 1]) and the whole graph is re-propagated with that one
//! change. Influence on a target is the central finite difference
//! `|t(up) - t(down)| / (up - down)`; a leaf's influence is its maximum over
//! targets.

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::graph::{ArgumentGraph, EdgeKind};
use crate::propagate::{Propagation, Propagator};
use crate::report::CruxEntry;

/// Statements whose credence the analysis measures sensitivity against.
///
/// Explicitly flagged targets win. Without any, every claim is a target, and
/// without claims every conclusion that is not itself a premise.
pub fn select_targets(graph: &ArgumentGraph) -> Vec<NodeIndex> {
    let flagged: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|&idx| graph.node(idx).target)
        .collect();
    if !flagged.is_empty() {
        return flagged;
    }

    let claims: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|&idx| graph.node(idx).is_claim())
        .collect();
    if !claims.is_empty() {
        return claims;
    }

    graph
        .node_indices()
        .filter(|&idx| {
            graph.node(idx).derived_by.is_some()
                && graph
                    .inner()
                    .edges_directed(idx, Direction::Outgoing)
                    .all(|e| e.weight().kind != EdgeKind::Premise)
        })
        .collect()
}

pub struct CruxAnalyzer<'p, 'a> {
    propagator: &'p Propagator<'a>,
    delta: f64,
}

impl<'p, 'a> CruxAnalyzer<'p, 'a> {
    pub fn new(propagator: &'p Propagator<'a>, delta: f64) -> Self {
        Self { propagator, delta }
    }

    /// One entry per leaf: ranked entries first by descending influence
    /// (ties in declaration order), then leaves without a defined influence
    /// in declaration order.
    pub fn analyze(&self, targets: &[NodeIndex], baseline: &Propagation) -> Vec<CruxEntry> {
        let graph = self.propagator.graph();
        let leaves = self.propagator.leaf_assignment();
        let mut ranked: Vec<CruxEntry> = Vec::new();
        let mut unranked: Vec<CruxEntry> = Vec::new();

        for idx in graph.node_indices() {
            let Some(p) = leaves[idx.index()] else {
                continue;
            };
            let downstream = self.propagator.downstream(idx);
            let reached: Vec<NodeIndex> = targets
                .iter()
                .copied()
                .filter(|t| downstream.binary_search(t).is_ok())
                .collect();

            let mut entry = CruxEntry {
                title: graph.title(idx).to_string(),
                credence: p,
                role: graph.node(idx).role,
                influence: None,
                per_target: BTreeMap::new(),
                downstream: downstream.len(),
                reachable: !reached.is_empty(),
                rank: None,
            };

            let up = (p + self.delta).min(1.0);
            let down = (p - self.delta).max(0.0);
            let span = up - down;
            if reached.is_empty() || span <= 0.0 {
                unranked.push(entry);
                continue;
            }

            let mut assignment = leaves.clone();
            assignment[idx.index()] = Some(up);
            let high = self.propagator.run_with(&assignment);
            assignment[idx.index()] = Some(down);
            let low = self.propagator.run_with(&assignment);

            for &target in &reached {
                if baseline.value(target).is_none() {
                    continue;
                }
                if let (Some(h), Some(l)) = (high.value(target), low.value(target)) {
                    entry
                        .per_target
                        .insert(graph.title(target).to_string(), (h - l).abs() / span);
                }
            }
            entry.influence = entry.per_target.values().copied().reduce(f64::max);

            if entry.influence.is_some() {
                ranked.push(entry);
            } else {
                unranked.push(entry);
            }
        }

        // Stable sort keeps declaration order among ties.
        ranked.sort_by(|a, b| {
            b.influence
                .unwrap_or(0.0)
                .total_cmp(&a.influence.unwrap_or(0.0))
        });
        for (i, entry) in ranked.iter_mut().enumerate() {
            entry.rank = Some(i + 1);
        }

        debug!(
            targets = targets.len(),
            ranked = ranked.len(),
            unranked = unranked.len(),
            "Crux analysis finished"
        );

        ranked.extend(unranked);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerifierConfig;
    use crate::document::{ArgumentDecl, Document, RelationKind, StatementDecl, StatementRole};

    fn analyze(doc: &Document) -> Vec<CruxEntry> {
        let (graph, _) = ArgumentGraph::build(doc);
        let config = VerifierConfig::default();
        let propagator = Propagator::new(&graph, &config);
        let baseline = propagator.run();
        let targets = select_targets(&graph);
        CruxAnalyzer::new(&propagator, config.crux.delta).analyze(&targets, &baseline)
    }

    #[test]
    fn test_larger_partial_derivative_ranks_first() {
        let doc = Document::new()
            .with_statement(StatementDecl::new("X").credence(0.9))
            .with_statement(StatementDecl::new("Y").credence(0.5))
            .with_argument(
                ArgumentDecl::new("Arg")
                    .premise("X")
                    .premise("Y")
                    .strength(1.0)
                    .conclusion("T"),
            );
        let cruxes = analyze(&doc);
        assert_eq!(cruxes.len(), 2);
        assert_eq!(cruxes[0].title, "Y");
        assert_eq!(cruxes[0].rank, Some(1));
        assert!((cruxes[0].influence.unwrap() - 0.9).abs() < 1e-9);
        assert_eq!(cruxes[1].title, "X");
        assert!((cruxes[1].influence.unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(cruxes[1].per_target.keys().collect::<Vec<_>>(), vec!["T"]);
    }

    #[test]
    fn test_entry_carries_statement_role() {
        let doc = Document::new()
            .with_statement(StatementDecl::new("Base").credence(0.2).role(StatementRole::BaseRate))
            .with_statement(StatementDecl::new("X").credence(0.6))
            .with_argument(
                ArgumentDecl::new("Arg")
                    .premise("Base")
                    .premise("X")
                    .strength(1.0)
                    .conclusion("T"),
            );
        let cruxes = analyze(&doc);
        let role_of = |title: &str| cruxes.iter().find(|c| c.title == title).and_then(|c| c.role);
        assert_eq!(role_of("Base"), Some(StatementRole::BaseRate));
        assert_eq!(role_of("X"), None);
    }

    #[test]
    fn test_unreachable_leaf_listed_last() {
        let doc = Document::new()
            .with_statement(StatementDecl::new("Stray").credence(0.3))
            .with_statement(StatementDecl::new("X").credence(0.6))
            .with_argument(ArgumentDecl::new("Arg").premise("X").strength(0.5).conclusion("T"));
        let cruxes = analyze(&doc);
        assert_eq!(cruxes[0].title, "X");
        assert_eq!(cruxes[1].title, "Stray");
        assert!(!cruxes[1].reachable);
        assert_eq!(cruxes[1].influence, None);
        assert_eq!(cruxes[1].rank, None);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let doc = Document::new()
            .with_statement(StatementDecl::new("First").credence(0.5))
            .with_statement(StatementDecl::new("Second").credence(0.5))
            .with_argument(
                ArgumentDecl::new("Arg")
                    .premise("Second")
                    .premise("First")
                    .strength(1.0)
                    .conclusion("T"),
            );
        let cruxes = analyze(&doc);
        let titles: Vec<&str> = cruxes.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_eq!(cruxes[0].influence, cruxes[1].influence);
        assert_eq!(cruxes[1].rank, Some(2));
    }

    #[test]
    fn test_target_selection_order() {
        let flagged = Document::new()
            .with_statement(StatementDecl::new("A").credence(0.5))
            .with_statement(StatementDecl::new("Claim"))
            .with_argument(
                ArgumentDecl::new("Arg")
                    .premise("A")
                    .strength(1.0)
                    .conclusion("C")
                    .relation(RelationKind::Entails, "Claim"),
            )
            .with_statement(StatementDecl::new("C").target());
        let (graph, _) = ArgumentGraph::build(&flagged);
        assert_eq!(select_targets(&graph), vec![graph.lookup("C").unwrap()]);

        let claims = Document::new()
            .with_statement(StatementDecl::new("A").credence(0.5))
            .with_statement(StatementDecl::new("Claim"))
            .with_relation(RelationKind::Entails, "A", "Claim");
        let (graph, _) = ArgumentGraph::build(&claims);
        assert_eq!(select_targets(&graph), vec![graph.lookup("Claim").unwrap()]);

        let sinks = Document::new()
            .with_statement(StatementDecl::new("A").credence(0.5))
            .with_argument(ArgumentDecl::new("Lower").premise("A").strength(1.0).conclusion("Mid"))
            .with_argument(ArgumentDecl::new("Upper").premise("Mid").strength(1.0).conclusion("Top"));
        let (graph, _) = ArgumentGraph::build(&sinks);
        assert_eq!(select_targets(&graph), vec![graph.lookup("Top").unwrap()]);
    }

    #[test]
    fn test_perturbation_clips_at_bounds() {
        let doc = Document::new()
            .with_statement(StatementDecl::new("Sure").credence(1.0))
            .with_argument(ArgumentDecl::new("Arg").premise("Sure").strength(0.5).conclusion("T"));
        let cruxes = analyze(&doc);
        // up = 1.0, down = 0.9, slope of 0.5 * p
        assert!((cruxes[0].influence.unwrap() - 0.5).abs() < 1e-9);
    }
}
