//! Import of Argdown JSON exports.
//!
//! The export keys statements and arguments by title. Statement metadata
//! (credence, tag, math, source, target) lives under each statement's `data`
//! object. An argument's `pcs` list is split at every intermediary conclusion
//! into chained sub-arguments, each using the previous conclusion as its
//! first premise. Relations are listed on both endpoints in the export and are
//! deduplicated here.
//!
//! Maps are read in key order, so the resulting document does not depend on
//! how the exporter ordered its objects.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::document::{
    ArgumentDecl, ConclusionDecl, Document, EpistemicTag, InferenceDecl, PremiseDecl,
    RelationDecl, RelationKind, Source, StatementDecl,
};
use crate::error::{CredenceError, DocumentError, Result};

/// Convert an Argdown JSON export into a [`Document`].
pub fn from_export(export: &Value) -> Result<Document> {
    let root = export.as_object().ok_or_else(|| malformed("export is not a JSON object"))?;
    let empty = Map::new();
    let statements = section(root, "statements")?.unwrap_or(&empty);
    let arguments = section(root, "arguments")?.unwrap_or(&empty);

    let mut document = Document::new();
    for (title, entry) in statements {
        document.statements.push(statement(title, entry));
    }

    // Argument title -> (name of the sub-argument holding the main conclusion, main conclusion title)
    let mut mains: HashMap<&str, (String, String)> = HashMap::new();
    for (title, entry) in arguments {
        let split = split_pcs(title, entry);
        if split.is_empty() {
            debug!(argument = %title, "Argument has no premise-conclusion structure, skipping");
            continue;
        }
        if let Some(last) = split.last() {
            if let Some(conclusion) = &last.conclusion.title {
                mains.insert(title.as_str(), (last.name.clone(), conclusion.clone()));
            }
        }
        document.arguments.extend(split);
    }

    let mut seen: HashSet<(RelationKind, String, String)> = HashSet::new();
    let listed = statements
        .values()
        .chain(arguments.values())
        .filter_map(|entry| entry.get("relations").and_then(Value::as_array))
        .flatten();
    for rel in listed {
        let Some(decl) = relation(rel, &mains) else {
            continue;
        };
        if seen.insert((decl.kind, decl.from.clone(), decl.to.clone())) {
            document.relations.push(decl);
        }
    }

    debug!(
        statements = document.statements.len(),
        arguments = document.arguments.len(),
        relations = document.relations.len(),
        "Imported Argdown export"
    );
    Ok(document)
}

fn malformed(message: impl Into<String>) -> CredenceError {
    DocumentError::MalformedExport {
        message: message.into(),
    }
    .into()
}

fn section<'v>(root: &'v Map<String, Value>, key: &str) -> Result<Option<&'v Map<String, Value>>> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(malformed(format!("'{key}' is not an object"))),
    }
}

fn statement(title: &str, entry: &Value) -> StatementDecl {
    let mut decl = StatementDecl::new(title);
    if let Some(text) = entry
        .get("members")
        .and_then(Value::as_array)
        .and_then(|m| m.first())
        .and_then(|m| m.get("text"))
        .and_then(Value::as_str)
    {
        decl.text = text.to_string();
    }

    let Some(data) = entry.get("data") else {
        return decl;
    };
    decl.credence = data.get("credence").and_then(Value::as_f64);
    decl.math = data.get("math").and_then(Value::as_str).map(str::to_string);
    decl.target = data.get("target").and_then(Value::as_bool).unwrap_or(false);
    if let Some(tag) = data.get("tag") {
        match serde_json::from_value::<EpistemicTag>(tag.clone()) {
            Ok(tag) => decl.tag = Some(tag),
            Err(_) => warn!(statement = %title, tag = %tag, "Unknown epistemic tag ignored"),
        }
    }
    decl.source = match data.get("source") {
        Some(Value::String(url)) => Some(Source {
            url: url.clone(),
            quote: None,
        }),
        Some(source @ Value::Object(_)) => serde_json::from_value(source.clone()).ok(),
        _ => None,
    };
    decl
}

/// Split one exported argument into chained sub-arguments.
fn split_pcs(title: &str, entry: &Value) -> Vec<ArgumentDecl> {
    let Some(pcs) = entry.get("pcs").and_then(Value::as_array) else {
        return Vec::new();
    };
    let conclusions = pcs.iter().filter(|item| is_conclusion(item)).count();

    let mut steps = Vec::with_capacity(conclusions);
    let mut premises: Vec<PremiseDecl> = Vec::new();
    for (position, item) in pcs.iter().enumerate() {
        let item_title = item.get("title").and_then(Value::as_str).unwrap_or_default();
        if !is_conclusion(item) {
            premises.push(PremiseDecl {
                id: Some(format!("P{}", position + 1)),
                statement: StatementDecl::new(item_title),
            });
            continue;
        }

        let name = if conclusions > 1 {
            format!("{title} ({})", steps.len() + 1)
        } else {
            title.to_string()
        };
        let inference = item.get("inference");
        let inference_data = inference.and_then(|i| i.get("data"));
        let strength = inference_data
            .and_then(|d| d.get("inference").or_else(|| d.get("strength")))
            .or_else(|| item.get("data").and_then(|d| d.get("inference")))
            .or_else(|| entry.get("data").and_then(|d| d.get("inference")))
            .and_then(Value::as_f64);
        let uses = inference_data
            .and_then(|d| d.get("uses"))
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(premise_id).collect())
            .unwrap_or_default();
        let text = inference
            .and_then(|i| i.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        steps.push(ArgumentDecl {
            name,
            premises: std::mem::take(&mut premises),
            inference: InferenceDecl {
                text: text.to_string(),
                uses,
                strength,
            },
            conclusion: ConclusionDecl {
                title: Some(item_title.to_string()).filter(|t| !t.is_empty()),
                ..Default::default()
            },
            relations: Vec::new(),
        });
        // The intermediary conclusion becomes the next step's first premise.
        premises.push(PremiseDecl {
            id: Some(format!("P{}", position + 1)),
            statement: StatementDecl::new(item_title),
        });
    }

    // Anything after the carried-over conclusion has no conclusion to support.
    if !steps.is_empty() && premises.len() > 1 {
        let ignored: Vec<&str> = premises[1..]
            .iter()
            .map(|p| p.statement.title.as_str())
            .collect();
        warn!(argument = %title, ignored = ?ignored, "Premises after the main conclusion ignored");
    }
    steps
}

fn is_conclusion(item: &Value) -> bool {
    matches!(
        item.get("role").and_then(Value::as_str),
        Some("intermediary-conclusion" | "main-conclusion")
    )
}

/// Accepts `"P3"`, `"3"` or a bare number.
fn premise_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.chars().all(|c| c.is_ascii_digit()) => Some(format!("P{s}")),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(format!("P{n}")),
        _ => None,
    }
}

fn relation(rel: &Value, mains: &HashMap<&str, (String, String)>) -> Option<RelationDecl> {
    let from = rel.get("from").and_then(Value::as_str)?;
    let to = rel.get("to").and_then(Value::as_str)?;
    let raw = rel.get("relationType").or_else(|| rel.get("type"))?;
    let mut kind = match serde_json::from_value::<RelationKind>(raw.clone()) {
        Ok(kind) => kind,
        Err(_) => {
            warn!(from, to, relation = %raw, "Unsupported relation type skipped");
            return None;
        }
    };

    // Arguments stand in for their main conclusion; attacking an argument
    // attacks its inference.
    let from = mains.get(from).map_or(from, |(_, conclusion)| conclusion.as_str());
    let to = match mains.get(to) {
        Some((name, _)) if matches!(kind, RelationKind::Contrary | RelationKind::Undercut) => {
            kind = RelationKind::Undercut;
            name.as_str()
        }
        Some((_, conclusion)) => conclusion.as_str(),
        None => to,
    };
    Some(RelationDecl::new(kind, from, to))
}
