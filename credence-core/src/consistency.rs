//! Numeric consistency of declared relations.
//!
//! Each relation kind implies a constraint between the credences of its two
//! endpoints. Every relation is checked independently of the others.

use tracing::debug;

use crate::config::VerifierConfig;
use crate::document::RelationKind;
use crate::graph::ArgumentGraph;
use crate::report::ConstraintViolation;

/// `from` entails `to`: credence(to) must not be lower than credence(from).
pub fn check_entailment(
    from: &str,
    to: &str,
    c_from: f64,
    c_to: f64,
    tolerance: f64,
) -> Option<ConstraintViolation> {
    (c_to < c_from - tolerance).then(|| ConstraintViolation::Entailment {
        from: from.to_string(),
        to: to.to_string(),
        delta: c_from - c_to,
    })
}

/// Contraries cannot both be true, so their credences sum to at most 1.
pub fn check_contrary(
    a: &str,
    b: &str,
    c_a: f64,
    c_b: f64,
    tolerance: f64,
) -> Option<ConstraintViolation> {
    let sum = c_a + c_b;
    (sum > 1.0 + tolerance).then(|| ConstraintViolation::Contrary {
        a: a.to_string(),
        b: b.to_string(),
        sum,
    })
}

/// Exactly one of two contradictories is true, so their credences sum to 1.
pub fn check_contradiction(
    a: &str,
    b: &str,
    c_a: f64,
    c_b: f64,
    tolerance: f64,
) -> Option<ConstraintViolation> {
    let sum = c_a + c_b;
    ((sum - 1.0).abs() > tolerance).then(|| ConstraintViolation::Contradiction {
        a: a.to_string(),
        b: b.to_string(),
        sum,
    })
}

/// Checks every relation of a graph against effective credences.
pub struct ConsistencyChecker<'a> {
    config: &'a VerifierConfig,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(config: &'a VerifierConfig) -> Self {
        Self { config }
    }

    /// `values` holds the effective credence per node index. Relations with
    /// an undefined endpoint are skipped.
    pub fn check(&self, graph: &ArgumentGraph, values: &[Option<f64>]) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();
        let mut skipped = 0usize;

        for rel in graph.relations() {
            if rel.kind == RelationKind::Undercut {
                continue;
            }
            let (Some(c_from), Some(c_to)) = (
                values.get(rel.from.index()).copied().flatten(),
                values.get(rel.to.index()).copied().flatten(),
            ) else {
                skipped += 1;
                continue;
            };
            let from = graph.title(rel.from);
            let to = graph.title(rel.to);

            let violation = match rel.kind {
                RelationKind::Entails => {
                    check_entailment(from, to, c_from, c_to, self.config.comparison_tolerance)
                }
                RelationKind::Contrary => {
                    check_contrary(from, to, c_from, c_to, self.config.comparison_tolerance)
                }
                RelationKind::Contradiction => {
                    check_contradiction(from, to, c_from, c_to, self.config.contradiction_tolerance)
                }
                RelationKind::Undercut => None,
            };
            violations.extend(violation);
        }

        debug!(
            relations = graph.relations().len(),
            violations = violations.len(),
            skipped,
            "Consistency check finished"
        );
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, StatementDecl};

    fn assigned(doc: &Document) -> (ArgumentGraph, Vec<Option<f64>>) {
        let (graph, _) = ArgumentGraph::build(doc);
        let values = graph
            .node_indices()
            .map(|i| graph.node(i).credence)
            .collect();
        (graph, values)
    }

    #[test]
    fn test_entailment_violation_delta() {
        let doc = Document::new()
            .with_statement(StatementDecl::new("A").credence(0.95))
            .with_statement(StatementDecl::new("B").credence(0.80))
            .with_relation(RelationKind::Entails, "A", "B");
        let (graph, values) = assigned(&doc);
        let violations = ConsistencyChecker::new(&VerifierConfig::default()).check(&graph, &values);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].titles(), ("A", "B"));
        assert!((violations[0].magnitude() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_entailment_equal_credences_pass() {
        assert!(check_entailment("A", "B", 0.7, 0.7, 1e-9).is_none());
        assert!(check_entailment("A", "B", 0.1 + 0.2, 0.3, 1e-9).is_none());
        assert!(check_entailment("A", "B", 0.3, 0.9, 1e-9).is_none());
    }

    #[test]
    fn test_contrary_sum() {
        let v = check_contrary("A", "B", 0.80, 0.91, 1e-9).unwrap();
        assert!((v.magnitude() - 1.71).abs() < 1e-12);
        assert!(check_contrary("A", "B", 0.4, 0.6, 1e-9).is_none());
        assert!(check_contrary("A", "B", 0.2, 0.3, 1e-9).is_none());
    }

    #[test]
    fn test_contradiction_tolerance() {
        assert!(check_contradiction("A", "B", 0.6, 0.405, 0.01).is_none());
        assert!(check_contradiction("A", "B", 0.6, 0.3, 0.01).is_some());
        assert!(check_contradiction("A", "B", 0.6, 0.6, 0.01).is_some());
    }

    #[test]
    fn test_undefined_endpoint_is_skipped() {
        let doc = Document::new()
            .with_statement(StatementDecl::new("A").credence(0.9))
            .with_statement(StatementDecl::new("Unknown"))
            .with_relation(RelationKind::Entails, "A", "Unknown");
        let (graph, values) = assigned(&doc);
        let violations = ConsistencyChecker::new(&VerifierConfig::default()).check(&graph, &values);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_every_relation_checked() {
        let doc = Document::new()
            .with_statement(StatementDecl::new("A").credence(0.9))
            .with_statement(StatementDecl::new("B").credence(0.5))
            .with_statement(StatementDecl::new("C").credence(0.8))
            .with_relation(RelationKind::Entails, "A", "B")
            .with_relation(RelationKind::Contrary, "A", "C")
            .with_relation(RelationKind::Contradiction, "B", "C")
            .with_relation(RelationKind::Contradiction, "B", "C");
        let (graph, values) = assigned(&doc);
        let violations = ConsistencyChecker::new(&VerifierConfig::default()).check(&graph, &values);
        assert_eq!(violations.len(), 3);
        assert!(matches!(violations[0], ConstraintViolation::Entailment { .. }));
        assert!(matches!(violations[1], ConstraintViolation::Contrary { .. }));
        assert!(matches!(violations[2], ConstraintViolation::Contradiction { .. }));
    }
}
