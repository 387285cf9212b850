//! Error types for the credence verifier core.
//!
//! Two families live here. `CredenceError` is the hard-failure type returned
//! by loaders (documents, configuration) when further work is meaningless.
//! `StructuralError` describes a malformed argument graph; those are collected
//! into the report instead of being returned, so one run surfaces every defect.

use serde::Serialize;
use std::path::PathBuf;

/// Top-level error type for the credence core library.
#[derive(Debug, thiserror::Error)]
pub enum CredenceError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised while loading an argument document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Document not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Unsupported document format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Malformed Argdown export: {message}")]
    MalformedExport { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A defect in the argument graph.
///
/// Structural errors are fatal only for the statement or argument they name.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralError {
    #[error("Statement '{title}' is tagged both '{first}' and '{second}'")]
    ConflictingTag {
        title: String,
        first: String,
        second: String,
    },

    #[error("Statement '{title}' is assigned both credence {first} and {second}")]
    ConflictingCredence {
        title: String,
        first: f64,
        second: f64,
    },

    #[error("Argument '{argument}' references unknown statement '{title}'")]
    DanglingReference { argument: String, title: String },

    #[error("Relation {relation} {from} -> {to} references unknown '{missing}'")]
    DanglingRelation {
        relation: String,
        from: String,
        to: String,
        missing: String,
    },

    #[error("Observation '{title}' has no source")]
    MissingSource { title: String },

    #[error("Argument '{argument}' has an unnamed conclusion")]
    UnnamedConclusion { argument: String },

    #[error("Conclusion '{title}' of argument '{argument}' carries an assigned credence")]
    AssignedConclusionCredence { argument: String, title: String },

    #[error("'{title}' is concluded by both '{first}' and '{second}'")]
    DuplicateConclusion {
        title: String,
        first: String,
        second: String,
    },

    #[error("Argument name '{argument}' is used more than once")]
    DuplicateArgument { argument: String },

    #[error("Inference of argument '{argument}' uses '{premise_id}' which is not one of its premises")]
    UnknownPremiseUse { argument: String, premise_id: String },

    #[error("Argument '{argument}' has no inference strength")]
    MissingInferenceStrength { argument: String },

    #[error("{field} of '{subject}' is {value}, outside [0, 1]")]
    OutOfRange {
        subject: String,
        field: String,
        value: f64,
    },
}

impl StructuralError {
    /// The statement title or argument name this error is reported against.
    pub fn subject(&self) -> &str {
        match self {
            StructuralError::ConflictingTag { title, .. }
            | StructuralError::ConflictingCredence { title, .. }
            | StructuralError::MissingSource { title }
            | StructuralError::DuplicateConclusion { title, .. } => title,
            StructuralError::DanglingReference { argument, .. }
            | StructuralError::UnnamedConclusion { argument }
            | StructuralError::AssignedConclusionCredence { argument, .. }
            | StructuralError::DuplicateArgument { argument }
            | StructuralError::UnknownPremiseUse { argument, .. }
            | StructuralError::MissingInferenceStrength { argument } => argument,
            StructuralError::DanglingRelation { from, .. } => from,
            StructuralError::OutOfRange { subject, .. } => subject,
        }
    }
}

/// A type alias for results using the top-level `CredenceError`.
pub type Result<T> = std::result::Result<T, CredenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_document() {
        let err = CredenceError::Document(DocumentError::UnsupportedFormat {
            extension: "txt".into(),
        });
        assert_eq!(
            err.to_string(),
            "Document error: Unsupported document format: txt"
        );
    }

    #[test]
    fn test_error_display_config() {
        let err = CredenceError::Config(ConfigError::Invalid {
            message: "epsilon must be in (0, 0.5)".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration: epsilon must be in (0, 0.5)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CredenceError = io_err.into();
        assert!(matches!(err, CredenceError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: CredenceError = serde_err.into();
        assert!(matches!(err, CredenceError::Serialization(_)));
    }

    #[test]
    fn test_structural_error_display() {
        let err = StructuralError::DanglingReference {
            argument: "Cost argument".into(),
            title: "Prices rose".into(),
        };
        assert_eq!(
            err.to_string(),
            "Argument 'Cost argument' references unknown statement 'Prices rose'"
        );

        let err = StructuralError::OutOfRange {
            subject: "Rain".into(),
            field: "credence".into(),
            value: 1.2,
        };
        assert_eq!(err.to_string(), "credence of 'Rain' is 1.2, outside [0, 1]");
    }

    #[test]
    fn test_structural_error_subject() {
        let err = StructuralError::MissingSource {
            title: "Sensor reading".into(),
        };
        assert_eq!(err.subject(), "Sensor reading");

        let err = StructuralError::UnnamedConclusion {
            argument: "A1".into(),
        };
        assert_eq!(err.subject(), "A1");
    }

    #[test]
    fn test_structural_error_serializes_with_kind_tag() {
        let err = StructuralError::MissingSource { title: "X".into() };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "missing_source");
        assert_eq!(json["title"], "X");
    }
}
