//! Parsed argument documents.
//!
//! A [`Document`] is what the external notation parser hands the verifier:
//! statements, premise-conclusion structures (arguments) and top-level
//! relations, all referring to each other by statement title. Nothing here is
//! validated; the graph builder reports every defect it finds.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DocumentError, Result};

/// Epistemic status of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpistemicTag {
    /// Directly observed; must carry a source.
    Observation,
    Assumption,
    Definition,
    Crux,
    Prior,
}

impl std::fmt::Display for EpistemicTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpistemicTag::Observation => write!(f, "observation"),
            EpistemicTag::Assumption => write!(f, "assumption"),
            EpistemicTag::Definition => write!(f, "definition"),
            EpistemicTag::Crux => write!(f, "crux"),
            EpistemicTag::Prior => write!(f, "prior"),
        }
    }
}

/// Role metadata for statements whose number is not a plain credence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementRole {
    Prior,
    BaseRate,
}

impl std::fmt::Display for StatementRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementRole::Prior => write!(f, "prior"),
            StatementRole::BaseRate => write!(f, "base_rate"),
        }
    }
}

/// Where an observation comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    /// Verbatim quote supporting the statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
}

/// Logical relation between two statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Support: credence(to) >= credence(from).
    #[serde(alias = "supports", alias = "support")]
    Entails,
    /// Attack: credence(a) + credence(b) <= 1.
    #[serde(alias = "attacks", alias = "attack")]
    Contrary,
    /// Exactly one holds: credence(a) + credence(b) = 1.
    #[serde(alias = "contradictory")]
    Contradiction,
    /// Attacks an inference step rather than a statement.
    Undercut,
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKind::Entails => write!(f, "entails"),
            RelationKind::Contrary => write!(f, "contrary"),
            RelationKind::Contradiction => write!(f, "contradiction"),
            RelationKind::Undercut => write!(f, "undercut"),
        }
    }
}

/// A statement definition or reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementDecl {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<EpistemicTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<StatementRole>,
    /// Literal numeric claim, e.g. `24.28 > 22.5`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub math: Option<String>,
    /// Marks the statement as a crux-analysis target.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub target: bool,
}

impl StatementDecl {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn tag(mut self, tag: EpistemicTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn credence(mut self, credence: f64) -> Self {
        self.credence = Some(credence);
        self
    }

    pub fn source(mut self, url: impl Into<String>, quote: impl Into<String>) -> Self {
        self.source = Some(Source {
            url: url.into(),
            quote: Some(quote.into()),
        });
        self
    }

    pub fn role(mut self, role: StatementRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn math(mut self, expression: impl Into<String>) -> Self {
        self.math = Some(expression.into());
        self
    }

    pub fn target(mut self) -> Self {
        self.target = true;
        self
    }

    /// True when the declaration only names a statement defined elsewhere.
    pub fn is_reference(&self) -> bool {
        self.text.is_empty()
            && self.tag.is_none()
            && self.source.is_none()
            && self.credence.is_none()
            && self.role.is_none()
            && self.math.is_none()
            && !self.target
    }
}

/// A premise slot in an argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PremiseDecl {
    /// Local id (e.g. `P1`) used by the inference's `uses` list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub statement: StatementDecl,
}

/// The inference step of an argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceDecl {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Premise ids this inference draws on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<String>,
    /// Inference strength in [0, 1].
    #[serde(default, alias = "inference", skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
}

/// The named conclusion of an argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConclusionDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<EpistemicTag>,
    /// Never valid on a conclusion; kept so the builder can report it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credence: Option<f64>,
    /// Inference strength written on the conclusion itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub target: bool,
}

/// A relation declared inside an argument; its source is the conclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentRelationDecl {
    #[serde(alias = "type")]
    pub kind: RelationKind,
    pub target: String,
}

/// A premise-conclusion structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDecl {
    pub name: String,
    #[serde(default)]
    pub premises: Vec<PremiseDecl>,
    #[serde(default)]
    pub inference: InferenceDecl,
    #[serde(default)]
    pub conclusion: ConclusionDecl,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<ArgumentRelationDecl>,
}

impl ArgumentDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a premise that references a statement by title.
    pub fn premise(mut self, title: impl Into<String>) -> Self {
        let id = format!("P{}", self.premises.len() + 1);
        self.premises.push(PremiseDecl {
            id: Some(id),
            statement: StatementDecl::new(title),
        });
        self
    }

    /// Add a premise defined inline.
    pub fn inline_premise(mut self, statement: StatementDecl) -> Self {
        let id = format!("P{}", self.premises.len() + 1);
        self.premises.push(PremiseDecl {
            id: Some(id),
            statement,
        });
        self
    }

    pub fn uses(mut self, ids: &[&str]) -> Self {
        self.inference.uses = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn strength(mut self, strength: f64) -> Self {
        self.inference.strength = Some(strength);
        self
    }

    pub fn conclusion(mut self, title: impl Into<String>) -> Self {
        self.conclusion.title = Some(title.into());
        self
    }

    pub fn relation(mut self, kind: RelationKind, target: impl Into<String>) -> Self {
        self.relations.push(ArgumentRelationDecl {
            kind,
            target: target.into(),
        });
        self
    }
}

/// A top-level relation between two statements. For `undercut`, `to` names an
/// argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDecl {
    #[serde(alias = "type", alias = "relationType")]
    pub kind: RelationKind,
    pub from: String,
    pub to: String,
}

impl RelationDecl {
    pub fn new(kind: RelationKind, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            kind,
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A complete parsed argument document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub statements: Vec<StatementDecl>,
    pub arguments: Vec<ArgumentDecl>,
    pub relations: Vec<RelationDecl>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statement(mut self, statement: StatementDecl) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn with_argument(mut self, argument: ArgumentDecl) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_relation(
        mut self,
        kind: RelationKind,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.relations.push(RelationDecl::new(kind, from, to));
        self
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(input)?)
    }
}

/// Load a document from disk, choosing the format by file extension.
pub fn load_document(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(DocumentError::NotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let content = std::fs::read_to_string(path)?;
    match extension.as_str() {
        "json" => Document::from_json_str(&content),
        "yaml" | "yml" => Document::from_yaml_str(&content),
        other => Err(DocumentError::UnsupportedFormat {
            extension: other.to_string(),
        }
        .into()),
    }
}
