//! The verification pipeline.
//!
//! Builds the graph, propagates credences, checks relation constraints and
//! math claims, collects structural warnings and ranks cruxes. Data problems
//! never abort a run; they are findings in the report.

use std::path::Path;
use tracing::{debug, info};

use crate::config::VerifierConfig;
use crate::consistency::ConsistencyChecker;
use crate::crux::{CruxAnalyzer, select_targets};
use crate::document::{Document, load_document};
use crate::error::Result;
use crate::graph::ArgumentGraph;
use crate::math;
use crate::propagate::Propagator;
use crate::report::{ComputedCredence, CredenceKind, ReportSummary, VerificationReport};
use crate::structure::check_structure;

/// Runs every check over a document with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    config: VerifierConfig,
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Load a JSON or YAML document and verify it.
    pub fn verify_file(&self, path: &Path) -> Result<VerificationReport> {
        let document = load_document(path)?;
        Ok(self.verify(&document))
    }

    pub fn verify(&self, document: &Document) -> VerificationReport {
        let (graph, structural_errors) = ArgumentGraph::build(document);
        for error in &structural_errors {
            debug!(subject = error.subject(), "{error}");
        }

        let propagator = Propagator::new(&graph, &self.config);
        let propagation = propagator.run();

        let credences = computed_credences(&graph, &propagation.values);
        let violations = ConsistencyChecker::new(&self.config).check(&graph, &propagation.values);
        let math_results = math::check_claims(&graph);

        let targets = select_targets(&graph);
        let warnings = check_structure(&graph, &targets, &propagation.unset);

        let cruxes = if self.config.crux.enabled {
            CruxAnalyzer::new(&propagator, self.config.crux.delta).analyze(&targets, &propagation)
        } else {
            Vec::new()
        };

        let mut report = VerificationReport {
            summary: ReportSummary {
                statements: graph.node_count(),
                arguments: graph.arguments().len(),
                relations: graph.relations().len(),
                with_credence: graph
                    .node_indices()
                    .filter(|&idx| graph.node(idx).credence.is_some())
                    .count(),
                ..Default::default()
            },
            structural_errors,
            cyclic_dependencies: propagation.cyclic_dependencies,
            credences,
            violations,
            cruxes,
            warnings,
            math_results,
            precision_warnings: propagation.precision_warnings,
        };
        report.summary.errors = report.error_count();
        report.summary.warnings = report.warnings.len() + report.precision_warnings.len();

        info!(
            statements = report.summary.statements,
            arguments = report.summary.arguments,
            errors = report.summary.errors,
            warnings = report.summary.warnings,
            "Verification complete"
        );
        report
    }
}

/// Conclusions and claims in declaration order.
fn computed_credences(graph: &ArgumentGraph, values: &[Option<f64>]) -> Vec<ComputedCredence> {
    graph
        .node_indices()
        .filter_map(|idx| {
            let node = graph.node(idx);
            let (kind, argument) = match node.derived_by {
                Some(a) => (CredenceKind::Conclusion, Some(graph.arguments()[a].name.clone())),
                None if node.is_claim() => (CredenceKind::Claim, None),
                None => return None,
            };
            Some(ComputedCredence {
                title: node.title.clone(),
                kind,
                value: values[idx.index()],
                argument,
            })
        })
        .collect()
}
