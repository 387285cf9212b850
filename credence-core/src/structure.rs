//! Structural warnings: circular reasoning, orphans, unset credences and
//! conclusions that lead nowhere.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::document::RelationKind;
use crate::graph::{ArgumentGraph, EdgeKind};
use crate::propagate::UnsetCredence;
use crate::report::{StructuralWarning, WarningKind};

/// Run every structural check, grouped by kind.
pub fn check_structure(
    graph: &ArgumentGraph,
    targets: &[NodeIndex],
    unset: &[UnsetCredence],
) -> Vec<StructuralWarning> {
    let mut warnings = reasoning_cycles(graph);
    warnings.extend(orphans(graph));
    warnings.extend(unset_credences(unset));
    warnings.extend(dangling_conclusions(graph, targets));
    warnings
}

/// Cycles formed by premise-of links and `entails` relations together.
///
/// A pure premise-of loop is also a cyclic dependency of propagation and
/// shows up in both places.
pub fn reasoning_cycles(graph: &ArgumentGraph) -> Vec<StructuralWarning> {
    let inner = graph.inner();
    let mut reasoning: DiGraph<(), ()> = DiGraph::with_capacity(graph.node_count(), inner.edge_count());
    for _ in graph.node_indices() {
        reasoning.add_node(());
    }
    for edge in inner.raw_edges() {
        if matches!(
            edge.weight.kind,
            EdgeKind::Premise | EdgeKind::Relation(RelationKind::Entails)
        ) {
            reasoning.update_edge(edge.source(), edge.target(), ());
        }
    }

    let mut cycles: Vec<Vec<NodeIndex>> = tarjan_scc(&reasoning)
        .into_iter()
        .filter(|scc| scc.len() > 1 || reasoning.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort();
            scc
        })
        .collect();
    cycles.sort();

    cycles
        .into_iter()
        .map(|members| {
            let titles: Vec<String> = members.iter().map(|&i| graph.title(i).to_string()).collect();
            let message = format!("CYCLE: circular reasoning among [{}]", titles.join("], ["));
            StructuralWarning {
                kind: WarningKind::Cycle,
                titles,
                message,
            }
        })
        .collect()
}

/// Statements no premise, conclusion or relation mentions.
pub fn orphans(graph: &ArgumentGraph) -> Vec<StructuralWarning> {
    graph
        .node_indices()
        .map(|idx| graph.node(idx))
        .filter(|node| !node.referenced)
        .map(|node| StructuralWarning {
            kind: WarningKind::Orphan,
            titles: vec![node.title.clone()],
            message: format!(
                "ORPHAN: [{}] is not used by any argument or relation",
                node.title
            ),
        })
        .collect()
}

pub fn unset_credences(unset: &[UnsetCredence]) -> Vec<StructuralWarning> {
    unset
        .iter()
        .map(|u| {
            let message = if u.missing.is_empty() {
                format!(
                    "UNSET: [{}] has no credence and nothing supports or attacks it",
                    u.title
                )
            } else {
                format!(
                    "UNSET: [{}] cannot be computed, undefined inputs: [{}]",
                    u.title,
                    u.missing.join("], [")
                )
            };
            let mut titles = vec![u.title.clone()];
            titles.extend(u.missing.iter().cloned());
            StructuralWarning {
                kind: WarningKind::UnsetCredence,
                titles,
                message,
            }
        })
        .collect()
}

/// Derived conclusions that feed nothing, are not attacked or supported,
/// and are not analysis targets.
pub fn dangling_conclusions(graph: &ArgumentGraph, targets: &[NodeIndex]) -> Vec<StructuralWarning> {
    graph
        .node_indices()
        .filter(|&idx| {
            graph.node(idx).derived_by.is_some()
                && !targets.contains(&idx)
                && graph.out_degree(idx) == 0
                && graph.incoming_relations(idx).next().is_none()
        })
        .map(|idx| {
            let title = graph.title(idx);
            StructuralWarning {
                kind: WarningKind::DanglingConclusion,
                titles: vec![title.to_string()],
                message: format!("DANGLING: conclusion [{title}] supports or attacks nothing"),
            }
        })
        .collect()
}
