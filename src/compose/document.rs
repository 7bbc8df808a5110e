//! Service document model
//!
//! A document is one service's fragment: an ordered statement list whose
//! `call` statements are the edges of the service call graph.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryKind {
    Query,
    Mutation,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Query => "query",
            QueryKind::Mutation => "mutation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub left: String,
    pub right: String,
}

/// Assignments feeding a `call` and reading its results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub pre: Vec<Assignment>,
    pub service: String,
    pub post: Vec<Assignment>,
}

/// Statement of a service document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum DocStmt {
    /// `body` is the trimmed text inside the outer braces
    DataQuery {
        var: String,
        kind: QueryKind,
        body: String,
    },
    Assign(Assignment),
    Call {
        service: String,
    },
    PluginCall {
        outputs: Vec<String>,
        file: String,
        func: String,
        inputs: Vec<String>,
    },
    Return {
        var: String,
    },
    ServiceCall(ServiceCall),
}

impl DocStmt {
    /// Label written above the statement in composed output
    pub fn kind(&self) -> &'static str {
        match self {
            DocStmt::DataQuery { .. } => "data query",
            DocStmt::Assign(_) => "assignment",
            DocStmt::Call { .. } => "call",
            DocStmt::PluginCall { .. } => "plugin call",
            DocStmt::Return { .. } => "return",
            DocStmt::ServiceCall(_) => "service call",
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "assign {} = {};", self.left, self.right)
    }
}

impl fmt::Display for DocStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocStmt::DataQuery { var, kind, body } => {
                write!(f, "new {} = gql {} {{ {} }};", var, kind.as_str(), body)
            }
            DocStmt::Assign(assignment) => write!(f, "{}", assignment),
            DocStmt::Call { service } => write!(f, "call {};", service),
            DocStmt::PluginCall {
                outputs,
                file,
                func,
                inputs,
            } => write!(
                f,
                "new {} = plugin {}/{}({});",
                outputs.join(", "),
                file,
                func,
                inputs.join(", ")
            ),
            DocStmt::Return { var } => write!(f, "return {};", var),
            DocStmt::ServiceCall(call) => {
                let mut lines: Vec<String> = call.pre.iter().map(|a| a.to_string()).collect();
                lines.push(format!("call {};", call.service));
                lines.extend(call.post.iter().map(|a| a.to_string()));
                write!(f, "{}", lines.join("\n"))
            }
        }
    }
}

/// One parsed service document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub service: String,
    pub statements: Vec<DocStmt>,
    /// Raw text the document was parsed from
    pub source: String,
}

impl Document {
    /// Services this document calls, in statement order
    pub fn call_targets(&self) -> Vec<&str> {
        self.statements
            .iter()
            .filter_map(|stmt| match stmt {
                DocStmt::Call { service } => Some(service.as_str()),
                DocStmt::ServiceCall(call) => Some(call.service.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn calls_service(&self, service: &str) -> bool {
        self.call_targets().contains(&service)
    }

    /// Group each `call` with the runs of `assign` directly around it
    ///
    /// Assignments after one call and before the next are attached to the
    /// earlier call.
    pub fn service_calls(&self) -> Vec<ServiceCall> {
        let mut calls: Vec<ServiceCall> = Vec::new();
        let mut pending: Vec<Assignment> = Vec::new();
        // Whether the assignments since the last call still belong to it
        let mut trailing = false;

        for stmt in &self.statements {
            match stmt {
                DocStmt::Assign(assignment) => pending.push(assignment.clone()),
                DocStmt::Call { service } => {
                    if trailing {
                        if let Some(last) = calls.last_mut() {
                            last.post.append(&mut pending);
                        }
                    }
                    calls.push(ServiceCall {
                        pre: std::mem::take(&mut pending),
                        service: service.clone(),
                        post: Vec::new(),
                    });
                    trailing = true;
                }
                DocStmt::ServiceCall(call) => {
                    if trailing {
                        if let Some(last) = calls.last_mut() {
                            last.post.append(&mut pending);
                        }
                    }
                    pending.clear();
                    calls.push(call.clone());
                    trailing = false;
                }
                _ => {
                    if trailing {
                        if let Some(last) = calls.last_mut() {
                            last.post.append(&mut pending);
                        }
                    }
                    pending.clear();
                    trailing = false;
                }
            }
        }
        if trailing {
            if let Some(last) = calls.last_mut() {
                last.post.append(&mut pending);
            }
        }

        calls
    }

    /// Canonical `service name:{ ... }` text
    pub fn to_text(&self) -> String {
        let mut out = format!("service {}:{{\n", self.service);
        for stmt in &self.statements {
            for line in stmt.to_string().lines() {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('}');
        out
    }
}
