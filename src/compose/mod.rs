//! Document composer
//!
//! Flattens a graph of service documents, connected by `call` statements,
//! into one call-free document:
//!
//! 1. The entry service is the one nobody calls (or the one named by the caller)
//! 2. Statements are copied depth-first; each `call` is replaced by the
//!    callee's statements minus its `return`s
//! 3. A service reached again through another call site is not repeated
//! 4. A call back into a service still being inlined is a cycle

pub mod document;
pub mod lower;
pub mod parser;


use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::parser::ParseError;

pub use document::{Assignment, DocStmt, Document, QueryKind, ServiceCall};
pub use lower::{lower, script_ident, to_script};
pub use parser::parse_document;

/* ===================== Error Types ===================== */

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Invalid compose request: {0}")]
    Validation(String),

    #[error("Entry service '{0}' not found")]
    EntryNotFound(String),

    #[error("Circular dependency: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("Called service '{0}' not found")]
    ServiceNotFound(String),

    #[error("Failed to parse '{file}': {source}")]
    Parse {
        file: String,
        #[source]
        source: ParseError,
    },
}

/* ===================== Inputs & Outputs ===================== */

/// A named piece of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Outcome of entry detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDetection {
    pub entry: String,
    /// Every service nobody calls, sorted by name
    pub candidates: Vec<String>,
}

impl EntryDetection {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComposeReport {
    pub text: String,
    pub statements: Vec<DocStmt>,
    pub entry: String,
    pub service_count: usize,
}

/* ===================== Entry Detection ===================== */

/// Find the service no other document calls
///
/// Several candidates resolve to the first by name with a warning. No
/// candidate at all means every service sits on a cycle.
pub fn detect_entry(documents: &HashMap<String, Document>) -> Result<EntryDetection, ComposeError> {
    if documents.is_empty() {
        return Err(ComposeError::Validation("no documents to compose".to_string()));
    }

    let mut in_degree: BTreeMap<&str, usize> =
        documents.keys().map(|name| (name.as_str(), 0)).collect();
    for document in documents.values() {
        for target in document.call_targets() {
            if let Some(count) = in_degree.get_mut(target) {
                *count += 1;
            }
        }
    }

    let candidates: Vec<String> = in_degree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| name.to_string())
        .collect();

    let entry = match candidates.first() {
        Some(entry) => entry.clone(),
        None => {
            return Err(ComposeError::Cycle {
                chain: find_cycle(documents),
            })
        }
    };
    if candidates.len() > 1 {
        warn!(?candidates, entry = %entry, "multiple entry candidates, using the first");
    }

    Ok(EntryDetection { entry, candidates })
}

/// A cycle in a graph where every service has a caller, in call order and closed
fn find_cycle(documents: &HashMap<String, Document>) -> Vec<String> {
    let mut callers: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (name, document) in documents {
        for target in document.call_targets() {
            if documents.contains_key(target) {
                callers.entry(target).or_default().insert(name.as_str());
            }
        }
    }

    let mut path: Vec<&str> = Vec::new();
    let mut current = match callers.keys().next() {
        Some(start) => *start,
        None => return documents.keys().cloned().collect(),
    };

    loop {
        if let Some(pos) = path.iter().position(|name| *name == current) {
            // path[k + 1] calls path[k]; reverse into call order
            let mut cycle: Vec<&str> = path[pos..].iter().rev().copied().collect();
            if let Some(min) = (0..cycle.len()).min_by_key(|&i| cycle[i]) {
                cycle.rotate_left(min);
            }
            let mut chain: Vec<String> = cycle.iter().map(|name| name.to_string()).collect();
            if let Some(first) = chain.first().cloned() {
                chain.push(first);
            }
            return chain;
        }
        path.push(current);
        current = match callers.get(current).and_then(|set| set.iter().next()) {
            Some(caller) => *caller,
            None => return path.iter().map(|name| name.to_string()).collect(),
        };
    }
}

/// Entry to flatten from: the named one, or the detected one when blank
pub fn resolve_entry(
    documents: &HashMap<String, Document>,
    entry: Option<&str>,
) -> Result<String, ComposeError> {
    match entry.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) if documents.contains_key(name) => Ok(name.to_string()),
        Some(name) => Err(ComposeError::EntryNotFound(name.to_string())),
        None => Ok(detect_entry(documents)?.entry),
    }
}

/* ===================== Flattening ===================== */

struct Flattener<'a> {
    documents: &'a HashMap<String, Document>,
    /// Services currently being inlined, outermost first
    stack: Vec<String>,
    processed: HashSet<String>,
    output: Vec<DocStmt>,
}

impl<'a> Flattener<'a> {
    fn flatten(&mut self, statements: &[DocStmt]) -> Result<(), ComposeError> {
        for stmt in statements {
            match stmt {
                DocStmt::Call { service } => self.inline(service)?,
                DocStmt::ServiceCall(call) => {
                    self.output
                        .extend(call.pre.iter().cloned().map(DocStmt::Assign));
                    self.inline(&call.service)?;
                    self.output
                        .extend(call.post.iter().cloned().map(DocStmt::Assign));
                }
                other => self.output.push(other.clone()),
            }
        }
        Ok(())
    }

    fn inline(&mut self, target: &str) -> Result<(), ComposeError> {
        if self.stack.iter().any(|name| name == target) {
            let mut chain = self.stack.clone();
            chain.push(target.to_string());
            return Err(ComposeError::Cycle { chain });
        }
        let document = self
            .documents
            .get(target)
            .ok_or_else(|| ComposeError::ServiceNotFound(target.to_string()))?;
        if self.processed.contains(target) {
            debug!(service = target, "already inlined, skipping call");
            return Ok(());
        }

        let body: Vec<DocStmt> = document
            .statements
            .iter()
            .filter(|stmt| !matches!(stmt, DocStmt::Return { .. }))
            .cloned()
            .collect();

        debug!(service = target, statements = body.len(), "inlining");
        self.stack.push(target.to_string());
        self.flatten(&body)?;
        self.stack.pop();
        self.processed.insert(target.to_string());
        Ok(())
    }
}

/// Call-free statement sequence starting at `entry`
pub fn flatten(
    documents: &HashMap<String, Document>,
    entry: &str,
) -> Result<Vec<DocStmt>, ComposeError> {
    let document = documents
        .get(entry)
        .ok_or_else(|| ComposeError::EntryNotFound(entry.to_string()))?;

    let mut flattener = Flattener {
        documents,
        stack: vec![entry.to_string()],
        processed: HashSet::new(),
        output: Vec::new(),
    };
    flattener.flatten(&document.statements)?;
    Ok(flattener.output)
}

/// Canonical text of a composed statement sequence
pub fn render(statements: &[DocStmt]) -> String {
    let mut out = String::from("// Composed GraphQL+ document\n// Generated by gqlplus compose\n\n");
    for stmt in statements {
        out.push_str("// ");
        out.push_str(stmt.kind());
        out.push('\n');
        out.push_str(&stmt.to_string());
        out.push('\n');
    }
    out
}

/// Flatten `documents` from `entry` (detected when absent) into text
pub fn compose(
    documents: &HashMap<String, Document>,
    entry: Option<&str>,
) -> Result<String, ComposeError> {
    let entry = resolve_entry(documents, entry)?;
    info!(entry = %entry, services = documents.len(), "composing documents");
    let statements = flatten(documents, &entry)?;
    Ok(render(&statements))
}

/* ===================== File Helpers ===================== */

/// Parse files into documents keyed by service name
pub fn parse_documents(files: &[SourceFile]) -> Result<HashMap<String, Document>, ComposeError> {
    if files.is_empty() {
        return Err(ComposeError::Validation("at least one document is required".to_string()));
    }

    let mut documents = HashMap::with_capacity(files.len());
    for file in files {
        let document = parse_document(&file.name, &file.content)?;
        if documents.contains_key(&document.service) {
            return Err(ComposeError::Validation(format!(
                "service '{}' is defined more than once",
                document.service
            )));
        }
        documents.insert(document.service.clone(), document);
    }
    Ok(documents)
}

/// Parse and compose files in one step
pub fn compose_files(
    files: &[SourceFile],
    entry: Option<&str>,
) -> Result<ComposeReport, ComposeError> {
    let documents = parse_documents(files)?;
    let entry = resolve_entry(&documents, entry)?;
    info!(entry = %entry, services = documents.len(), "composing documents");

    let statements = flatten(&documents, &entry)?;
    let text = render(&statements);
    info!(statements = statements.len(), "composition finished");

    Ok(ComposeReport {
        text,
        statements,
        entry,
        service_count: documents.len(),
    })
}
