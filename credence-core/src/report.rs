//! Verification report.
//!
//! The report is the verifier's only output. Its field set is stable and every
//! collection is ordered deterministically (declaration order, or ranking for
//! cruxes), so serializing the same document's report twice yields identical
//! bytes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::document::StatementRole;
use crate::error::StructuralError;
use crate::math::MathOutcome;

/// What kind of node a computed credence belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredenceKind {
    /// Derived from premises by a PCS.
    Conclusion,
    /// Aggregated from incoming relations.
    Claim,
}

/// A computed credence. `value` is `None` when it could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputedCredence {
    pub title: String,
    pub kind: CredenceKind,
    pub value: Option<f64>,
    /// Argument deriving the conclusion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

/// Propagation could not order these statements: each depends on itself
/// through premise or aggregation links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CyclicDependency {
    pub titles: Vec<String>,
}

impl std::fmt::Display for CyclicDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cyclic dependency among: {}", self.titles.join(", "))
    }
}

/// A credence was clamped into `[epsilon, 1 - epsilon]` before taking log-odds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecisionWarning {
    /// Statement whose credence was clamped.
    pub title: String,
    /// Claim being aggregated when the clamp happened.
    pub claim: String,
    pub original: f64,
    pub clamped: f64,
}

/// A numeric constraint implied by a relation does not hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintViolation {
    /// `from` entails `to` but credence(to) < credence(from).
    Entailment { from: String, to: String, delta: f64 },
    /// Contraries whose credences sum above 1.
    Contrary { a: String, b: String, sum: f64 },
    /// Contradictories whose credences do not sum to 1.
    Contradiction { a: String, b: String, sum: f64 },
}

impl ConstraintViolation {
    /// The two statement titles involved.
    pub fn titles(&self) -> (&str, &str) {
        match self {
            ConstraintViolation::Entailment { from, to, .. } => (from, to),
            ConstraintViolation::Contrary { a, b, .. }
            | ConstraintViolation::Contradiction { a, b, .. } => (a, b),
        }
    }

    /// The numeric discrepancy: delta for entailments, sum otherwise.
    pub fn magnitude(&self) -> f64 {
        match self {
            ConstraintViolation::Entailment { delta, .. } => *delta,
            ConstraintViolation::Contrary { sum, .. }
            | ConstraintViolation::Contradiction { sum, .. } => *sum,
        }
    }
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintViolation::Entailment { from, to, delta } => write!(
                f,
                "ENTAILMENT: [{from}] entails [{to}] but its credence is higher by {delta:.4}"
            ),
            ConstraintViolation::Contrary { a, b, sum } => write!(
                f,
                "CONTRARY: [{a}] and [{b}] cannot both hold, credences sum to {sum:.4} > 1"
            ),
            ConstraintViolation::Contradiction { a, b, sum } => write!(
                f,
                "CONTRADICTION: [{a}] and [{b}] are contradictory, credences sum to {sum:.4} != 1"
            ),
        }
    }
}

/// Kind of structural warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Circular reasoning among entailment relations.
    Cycle,
    /// Statement defined but never used.
    Orphan,
    /// Claim or conclusion whose credence could not be computed.
    UnsetCredence,
    /// Conclusion that neither feeds another argument nor supports/attacks anything.
    DanglingConclusion,
}

/// A non-fatal structural observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralWarning {
    pub kind: WarningKind,
    pub titles: Vec<String>,
    pub message: String,
}

/// Evaluation of a statement's literal math expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MathClaimResult {
    pub title: String,
    pub expression: String,
    pub outcome: MathOutcome,
}

impl MathClaimResult {
    pub fn failed(&self) -> bool {
        self.outcome.is_failure()
    }
}

/// Sensitivity of crux targets to one leaf credence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CruxEntry {
    pub title: String,
    pub credence: f64,
    /// Set when the number is a prior or base rate rather than a plain credence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<StatementRole>,
    /// Largest finite-difference influence over all reachable targets.
    pub influence: Option<f64>,
    /// Influence per target title.
    pub per_target: BTreeMap<String, f64>,
    /// Number of statements downstream of this one.
    pub downstream: usize,
    /// Whether any target is downstream.
    pub reachable: bool,
    /// 1-based rank among entries with a defined influence.
    pub rank: Option<usize>,
}

/// Counts for quick inspection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub statements: usize,
    pub arguments: usize,
    pub relations: usize,
    pub with_credence: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Everything a verification run found.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationReport {
    pub summary: ReportSummary,
    pub structural_errors: Vec<StructuralError>,
    pub cyclic_dependencies: Vec<CyclicDependency>,
    pub credences: Vec<ComputedCredence>,
    pub violations: Vec<ConstraintViolation>,
    pub cruxes: Vec<CruxEntry>,
    pub warnings: Vec<StructuralWarning>,
    pub math_results: Vec<MathClaimResult>,
    pub precision_warnings: Vec<PrecisionWarning>,
}

impl VerificationReport {
    /// Computed credence of a conclusion or claim.
    pub fn credence_of(&self, title: &str) -> Option<f64> {
        self.credences
            .iter()
            .find(|c| c.title == title)
            .and_then(|c| c.value)
    }

    pub fn crux(&self, title: &str) -> Option<&CruxEntry> {
        self.cruxes.iter().find(|c| c.title == title)
    }

    pub fn math_failures(&self) -> impl Iterator<Item = &MathClaimResult> {
        self.math_results.iter().filter(|m| m.failed())
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &StructuralWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    /// Number of error-class findings: structural errors, cyclic
    /// dependencies, violations and failed math claims.
    pub fn error_count(&self) -> usize {
        self.structural_errors.len()
            + self.cyclic_dependencies.len()
            + self.violations.len()
            + self.math_failures().count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text listing in the order findings are usually triaged.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let errors = self.error_count();
        if errors == 0 {
            let _ = writeln!(out, "All checks passed.");
        } else {
            let _ = writeln!(out, "{errors} issues found:\n");
            for e in &self.structural_errors {
                let _ = writeln!(out, "  STRUCTURE: {e}");
            }
            for c in &self.cyclic_dependencies {
                let _ = writeln!(out, "  CYCLE: {c}");
            }
            for v in &self.violations {
                let _ = writeln!(out, "  {v}");
            }
            for m in self.math_failures() {
                let _ = writeln!(out, "  MATH: [{}] '{}' {}", m.title, m.expression, m.outcome);
            }
        }

        if !self.warnings.is_empty() || !self.precision_warnings.is_empty() {
            let _ = writeln!(out, "\nWarnings:");
            for w in &self.warnings {
                let _ = writeln!(out, "  {}", w.message);
            }
            for p in &self.precision_warnings {
                let _ = writeln!(
                    out,
                    "  PRECISION: [{}] credence {} clamped to {} while aggregating [{}]",
                    p.title, p.original, p.clamped, p.claim
                );
            }
        }

        if !self.credences.is_empty() {
            let _ = writeln!(out, "\nComputed credences:");
            for c in &self.credences {
                match c.value {
                    Some(v) => {
                        let _ = writeln!(out, "  [{}] = {v:.4}", c.title);
                    }
                    None => {
                        let _ = writeln!(out, "  [{}] = undefined", c.title);
                    }
                }
            }
        }

        if !self.cruxes.is_empty() {
            let _ = writeln!(out, "\nCrux analysis:");
            for c in &self.cruxes {
                let number = match c.role {
                    Some(role) => format!("{role}={}", c.credence),
                    None => format!("credence={}", c.credence),
                };
                match (c.rank, c.influence) {
                    (Some(rank), Some(influence)) => {
                        let _ = writeln!(
                            out,
                            "  {rank}. [{}] ({number}) influence {influence:.4}, {} downstream",
                            c.title, c.downstream
                        );
                    }
                    _ if !c.reachable => {
                        let _ = writeln!(
                            out,
                            "  -  [{}] ({number}) reaches no target",
                            c.title
                        );
                    }
                    _ => {
                        let _ = writeln!(
                            out,
                            "  -  [{}] ({number}) influence undefined",
                            c.title
                        );
                    }
                }
            }
        }

        let s = &self.summary;
        let _ = writeln!(
            out,
            "\nSummary: {} statements, {} arguments, {} relations, {} with credences",
            s.statements, s.arguments, s.relations, s.with_credence
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_accessors() {
        let v = ConstraintViolation::Entailment {
            from: "A".into(),
            to: "B".into(),
            delta: 0.15,
        };
        assert_eq!(v.titles(), ("A", "B"));
        assert_eq!(v.magnitude(), 0.15);
        assert!(v.to_string().starts_with("ENTAILMENT: [A] entails [B]"));
    }

    #[test]
    fn test_violation_serializes_with_kind() {
        let v = ConstraintViolation::Contrary {
            a: "A".into(),
            b: "B".into(),
            sum: 1.71,
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["kind"], "contrary");
        assert_eq!(json["sum"], 1.71);
    }

    #[test]
    fn test_empty_report_passes() {
        let report = VerificationReport::default();
        assert!(!report.has_errors());
        assert!(report.render_text().starts_with("All checks passed."));
    }

    #[test]
    fn test_crux_role_is_rendered() {
        let report = VerificationReport {
            cruxes: vec![CruxEntry {
                title: "Base".into(),
                credence: 0.2,
                role: Some(StatementRole::BaseRate),
                influence: Some(0.6),
                per_target: BTreeMap::from([("T".to_string(), 0.6)]),
                downstream: 1,
                reachable: true,
                rank: Some(1),
            }],
            ..Default::default()
        };
        assert!(report.render_text().contains("1. [Base] (base_rate=0.2) influence 0.6000"));
        let json = serde_json::to_value(&report.cruxes[0]).unwrap();
        assert_eq!(json["role"], "base_rate");
    }

    #[test]
    fn test_error_count_includes_math_failures() {
        let report = VerificationReport {
            math_results: vec![
                MathClaimResult {
                    title: "ok".into(),
                    expression: "2 > 1".into(),
                    outcome: MathOutcome::Holds { lhs: 2.0, rhs: 1.0 },
                },
                MathClaimResult {
                    title: "bad".into(),
                    expression: "1 > 2".into(),
                    outcome: MathOutcome::Failed {
                        lhs: 1.0,
                        rhs: 2.0,
                        operator: ">".into(),
                    },
                },
            ],
            ..Default::default()
        };
        assert_eq!(report.error_count(), 1);
        assert!(report.render_text().contains("MATH: [bad] '1 > 2'"));
    }

    #[test]
    fn test_credence_lookup() {
        let report = VerificationReport {
            credences: vec![
                ComputedCredence {
                    title: "C".into(),
                    kind: CredenceKind::Conclusion,
                    value: Some(0.5),
                    argument: Some("Arg".into()),
                },
                ComputedCredence {
                    title: "Claim".into(),
                    kind: CredenceKind::Claim,
                    value: None,
                    argument: None,
                },
            ],
            ..Default::default()
        };
        assert_eq!(report.credence_of("C"), Some(0.5));
        assert_eq!(report.credence_of("Claim"), None);
        assert!(report.render_text().contains("[Claim] = undefined"));
    }

    #[test]
    fn test_cyclic_dependency_display() {
        let c = CyclicDependency {
            titles: vec!["A".into(), "B".into(), "C".into()],
        };
        assert_eq!(c.to_string(), "cyclic dependency among: A, B, C");
    }
}
