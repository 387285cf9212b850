//! # Credence Core
//!
//! Verifier for argument graphs annotated with numeric credences.
//! Builds a graph from statements, premise-conclusion structures and logical
//! relations, propagates credences through it, checks the numeric constraints
//! each relation implies, evaluates literal math claims and ranks the leaf
//! credences the conclusions are most sensitive to.

pub mod argdown;
pub mod config;
pub mod consistency;
pub mod crux;
pub mod document;
pub mod error;
pub mod graph;
pub mod math;
pub mod propagate;
pub mod report;
pub mod structure;
pub mod verifier;

// Re-export commonly used types at the crate root.
pub use config::{AggregationRule, CruxConfig, VerifierConfig, load_config};
pub use document::{
    ArgumentDecl, Document, EpistemicTag, RelationDecl, RelationKind, StatementDecl,
    load_document,
};
pub use error::{ConfigError, CredenceError, DocumentError, Result, StructuralError};
pub use graph::ArgumentGraph;
pub use report::{
    ComputedCredence, ConstraintViolation, CruxEntry, CyclicDependency, PrecisionWarning,
    StructuralWarning, VerificationReport, WarningKind,
};
pub use verifier::Verifier;
