//! Argument graph built from a parsed document.
//!
//! Uses petgraph's DiGraph with statements as nodes. Titles are resolved to
//! node handles once, at build time, so every reference to a title aliases
//! the same node. Edges are either premise-of links (premise -> conclusion)
//! or declared logical relations.

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::document::{
    ArgumentDecl, Document, EpistemicTag, RelationKind, Source, StatementDecl, StatementRole,
};
use crate::error::StructuralError;

/// Tolerance for treating two assigned credences as the same value.
const CREDENCE_EQ: f64 = 1e-12;

/// A statement node.
#[derive(Debug, Clone)]
pub struct StatementNode {
    pub title: String,
    pub text: String,
    pub tag: Option<EpistemicTag>,
    pub source: Option<Source>,
    /// Assigned credence. Never set on a derived node.
    pub credence: Option<f64>,
    pub role: Option<StatementRole>,
    pub math: Option<String>,
    pub target: bool,
    /// Index of the argument concluding this statement.
    pub derived_by: Option<usize>,
    /// Whether any premise, conclusion or relation mentions the statement.
    pub referenced: bool,
}

impl StatementNode {
    fn from_decl(decl: &StatementDecl) -> Self {
        Self {
            title: decl.title.clone(),
            text: decl.text.clone(),
            tag: decl.tag,
            source: decl.source.clone(),
            credence: decl.credence,
            role: decl.role,
            math: decl.math.clone(),
            target: decl.target,
            derived_by: None,
            referenced: false,
        }
    }

    /// A statement with an assigned credence that no argument derives.
    pub fn is_leaf(&self) -> bool {
        self.credence.is_some() && self.derived_by.is_none()
    }

    /// A statement whose credence must be aggregated from incoming relations.
    pub fn is_claim(&self) -> bool {
        self.credence.is_none() && self.derived_by.is_none()
    }
}

/// What an edge means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The source is a premise of the argument concluding the target.
    Premise,
    Relation(RelationKind),
}

/// Edge weight: kind plus the argument it came from, for traceability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub argument: Option<usize>,
}

/// A resolved premise-conclusion structure.
#[derive(Debug, Clone)]
pub struct Argument {
    pub name: String,
    pub inference: String,
    pub premises: Vec<NodeIndex>,
    pub conclusion: Option<NodeIndex>,
    pub strength: Option<f64>,
    /// Set when a structural error makes the conclusion uncomputable.
    pub broken: bool,
}

/// A resolved logical relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub kind: RelationKind,
    pub from: NodeIndex,
    /// For undercuts, the conclusion of the undercut argument.
    pub to: NodeIndex,
    /// Declaring argument, or the undercut argument for undercuts.
    pub argument: Option<usize>,
    pub edge: EdgeIndex,
}

/// The argument graph: statements as nodes, premise links and relations as edges.
#[derive(Debug, Clone, Default)]
pub struct ArgumentGraph {
    graph: DiGraph<StatementNode, GraphEdge>,
    title_to_node: HashMap<String, NodeIndex>,
    arguments: Vec<Argument>,
    relations: Vec<Relation>,
}

impl ArgumentGraph {
    /// Build the graph, collecting every structural error instead of stopping
    /// at the first one.
    pub fn build(document: &Document) -> (Self, Vec<StructuralError>) {
        let mut builder = GraphBuilder::default();
        builder.run(document);
        let GraphBuilder { graph, errors, .. } = builder;
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            arguments = graph.arguments.len(),
            errors = errors.len(),
            "Built argument graph"
        );
        (graph, errors)
    }

    /// Look up a statement by title.
    pub fn lookup(&self, title: &str) -> Option<NodeIndex> {
        self.title_to_node.get(title).copied()
    }

    /// Get a statement node by title.
    pub fn statement(&self, title: &str) -> Option<&StatementNode> {
        let idx = self.lookup(title)?;
        self.graph.node_weight(idx)
    }

    /// Get a statement node by index.
    pub fn node(&self, idx: NodeIndex) -> &StatementNode {
        &self.graph[idx]
    }

    /// Title of the node at `idx`.
    pub fn title(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].title
    }

    /// Node indices in declaration order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Relations in declaration order, duplicates removed.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// The underlying petgraph graph.
    pub fn inner(&self) -> &DiGraph<StatementNode, GraphEdge> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Relations whose `to` endpoint is `idx`.
    pub fn incoming_relations(&self, idx: NodeIndex) -> impl Iterator<Item = &Relation> + '_ {
        self.relations.iter().filter(move |r| r.to == idx)
    }

    /// Number of outgoing edges of any kind.
    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }
}

#[derive(Default)]
struct GraphBuilder {
    graph: ArgumentGraph,
    errors: Vec<StructuralError>,
    argument_names: HashMap<String, usize>,
    seen_relations: HashSet<(RelationKind, NodeIndex, NodeIndex)>,
}

impl GraphBuilder {
    fn run(&mut self, document: &Document) {
        for decl in &document.statements {
            self.define(decl);
        }

        // Conclusions and inline premises first, so premises may reference
        // conclusions of later arguments.
        for (i, arg) in document.arguments.iter().enumerate() {
            self.register_argument(i, arg);
        }
        self.strip_conclusion_credences(document);

        for (i, arg) in document.arguments.iter().enumerate() {
            self.resolve_premises(i, arg);
        }

        for rel in &document.relations {
            self.add_relation(rel.kind, &rel.from, &rel.to, None);
        }
        for (i, arg) in document.arguments.iter().enumerate() {
            let Some(conclusion) = self.graph.arguments[i].conclusion else {
                continue;
            };
            let from = self.graph.graph[conclusion].title.clone();
            for rel in &arg.relations {
                self.add_relation(rel.kind, &from, &rel.target, Some(i));
            }
        }

        self.check_sources();
    }

    /// Insert a statement, or merge it into the node already holding its title.
    fn define(&mut self, decl: &StatementDecl) -> NodeIndex {
        let mut decl = decl.clone();
        if let Some(c) = decl.credence {
            if !(0.0..=1.0).contains(&c) {
                self.errors.push(StructuralError::OutOfRange {
                    subject: decl.title.clone(),
                    field: "credence".into(),
                    value: c,
                });
                decl.credence = None;
            }
        }

        let Some(&idx) = self.graph.title_to_node.get(&decl.title) else {
            let idx = self.graph.graph.add_node(StatementNode::from_decl(&decl));
            self.graph.title_to_node.insert(decl.title.clone(), idx);
            return idx;
        };

        let node = &mut self.graph.graph[idx];
        match (node.tag, decl.tag) {
            (Some(first), Some(second)) if first != second => {
                self.errors.push(StructuralError::ConflictingTag {
                    title: decl.title.clone(),
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
            (None, Some(tag)) => node.tag = Some(tag),
            _ => {}
        }
        match (node.credence, decl.credence) {
            (Some(first), Some(second)) if (first - second).abs() > CREDENCE_EQ => {
                self.errors.push(StructuralError::ConflictingCredence {
                    title: decl.title.clone(),
                    first,
                    second,
                });
            }
            (None, Some(c)) => node.credence = Some(c),
            _ => {}
        }
        if node.text.is_empty() {
            node.text = decl.text;
        }
        if node.source.is_none() {
            node.source = decl.source;
        }
        if node.role.is_none() {
            node.role = decl.role;
        }
        if node.math.is_none() {
            node.math = decl.math;
        }
        node.target |= decl.target;
        idx
    }

    fn register_argument(&mut self, i: usize, arg: &ArgumentDecl) {
        if self.argument_names.contains_key(&arg.name) {
            self.errors.push(StructuralError::DuplicateArgument {
                argument: arg.name.clone(),
            });
        } else {
            self.argument_names.insert(arg.name.clone(), i);
        }

        for premise in &arg.premises {
            if !premise.statement.is_reference() {
                self.define(&premise.statement);
            }
        }

        let mut broken = false;
        let strength = arg.inference.strength.or(arg.conclusion.inference);
        match strength {
            None => {
                self.errors.push(StructuralError::MissingInferenceStrength {
                    argument: arg.name.clone(),
                });
                broken = true;
            }
            Some(s) if !(0.0..=1.0).contains(&s) => {
                self.errors.push(StructuralError::OutOfRange {
                    subject: arg.name.clone(),
                    field: "inference strength".into(),
                    value: s,
                });
                broken = true;
            }
            Some(_) => {}
        }

        let ids: HashSet<&str> = arg.premises.iter().filter_map(|p| p.id.as_deref()).collect();
        for used in &arg.inference.uses {
            if !ids.contains(used.as_str()) {
                self.errors.push(StructuralError::UnknownPremiseUse {
                    argument: arg.name.clone(),
                    premise_id: used.clone(),
                });
            }
        }

        let conclusion = match arg.conclusion.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => {
                let decl = StatementDecl {
                    title: title.to_string(),
                    text: arg.conclusion.text.clone(),
                    tag: arg.conclusion.tag,
                    target: arg.conclusion.target,
                    ..Default::default()
                };
                let idx = self.define(&decl);
                if arg.conclusion.credence.is_some() {
                    self.errors.push(StructuralError::AssignedConclusionCredence {
                        argument: arg.name.clone(),
                        title: title.to_string(),
                    });
                }
                let node = &mut self.graph.graph[idx];
                node.referenced = true;
                match node.derived_by {
                    Some(first) => {
                        self.errors.push(StructuralError::DuplicateConclusion {
                            title: title.to_string(),
                            first: self.graph.arguments[first].name.clone(),
                            second: arg.name.clone(),
                        });
                        broken = true;
                    }
                    None => node.derived_by = Some(i),
                }
                Some(idx)
            }
            _ => {
                self.errors.push(StructuralError::UnnamedConclusion {
                    argument: arg.name.clone(),
                });
                broken = true;
                None
            }
        };

        self.graph.arguments.push(Argument {
            name: arg.name.clone(),
            inference: arg.inference.text.clone(),
            premises: Vec::new(),
            conclusion,
            strength,
            broken,
        });
    }

    /// Derived credences are computed, never assigned.
    fn strip_conclusion_credences(&mut self, document: &Document) {
        for idx in self.graph.graph.node_indices() {
            let node = &mut self.graph.graph[idx];
            let Some(arg) = node.derived_by else { continue };
            if node.credence.take().is_some() {
                self.errors.push(StructuralError::AssignedConclusionCredence {
                    argument: document.arguments[arg].name.clone(),
                    title: node.title.clone(),
                });
            }
        }
    }

    fn resolve_premises(&mut self, i: usize, arg: &ArgumentDecl) {
        let conclusion = self.graph.arguments[i].conclusion;
        let mut premises = Vec::with_capacity(arg.premises.len());
        for premise in &arg.premises {
            let title = &premise.statement.title;
            match self.graph.title_to_node.get(title) {
                Some(&idx) => {
                    self.graph.graph[idx].referenced = true;
                    premises.push(idx);
                    if let Some(c) = conclusion {
                        self.graph.graph.add_edge(
                            idx,
                            c,
                            GraphEdge {
                                kind: EdgeKind::Premise,
                                argument: Some(i),
                            },
                        );
                    }
                }
                None => {
                    self.errors.push(StructuralError::DanglingReference {
                        argument: arg.name.clone(),
                        title: title.clone(),
                    });
                    self.graph.arguments[i].broken = true;
                }
            }
        }
        self.graph.arguments[i].premises = premises;
    }

    fn add_relation(&mut self, kind: RelationKind, from: &str, to: &str, declared_in: Option<usize>) {
        let from_idx = self.graph.title_to_node.get(from).copied();
        let (to_idx, argument) = if kind == RelationKind::Undercut {
            let target_arg = self.argument_names.get(to).copied();
            let conclusion = target_arg.and_then(|a| self.graph.arguments[a].conclusion);
            (conclusion, target_arg)
        } else {
            (self.graph.title_to_node.get(to).copied(), declared_in)
        };

        if let Some(idx) = from_idx {
            self.graph.graph[idx].referenced = true;
        }
        if let Some(idx) = to_idx {
            self.graph.graph[idx].referenced = true;
        }

        let (Some(from_idx), Some(to_idx)) = (from_idx, to_idx) else {
            let missing = if from_idx.is_none() { from } else { to };
            // An undercut of an argument whose conclusion is unnamed has
            // already been reported against that argument.
            let target_exists = kind == RelationKind::Undercut
                && self.argument_names.contains_key(to)
                && from_idx.is_some();
            if !target_exists {
                self.errors.push(StructuralError::DanglingRelation {
                    relation: kind.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                    missing: missing.to_string(),
                });
            }
            return;
        };

        if !self.seen_relations.insert((kind, from_idx, to_idx)) {
            return;
        }
        let edge = self.graph.graph.add_edge(
            from_idx,
            to_idx,
            GraphEdge {
                kind: EdgeKind::Relation(kind),
                argument,
            },
        );
        self.graph.relations.push(Relation {
            kind,
            from: from_idx,
            to: to_idx,
            argument,
            edge,
        });
    }

    fn check_sources(&mut self) {
        for idx in self.graph.graph.node_indices() {
            let node = &self.graph.graph[idx];
            if node.tag == Some(EpistemicTag::Observation) && node.source.is_none() {
                self.errors.push(StructuralError::MissingSource {
                    title: node.title.clone(),
                });
            }
        }
    }
}
