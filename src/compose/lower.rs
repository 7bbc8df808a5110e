//! Lowering composed documents into interpreter scripts
//!
//! Document references may contain `.`, `@` and `-`, which script
//! identifiers cannot, so every reference is mangled the same way
//! wherever it appears.

use super::document::DocStmt;
use super::ComposeError;
use crate::executor::types::{Span, Stmt};
use crate::parser::RESERVED_KEYWORDS;

/// Script identifier for a document reference
pub fn script_ident(reference: &str) -> String {
    let mut ident: String = reference
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if RESERVED_KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Translate call-free document statements into script statements
///
/// - `assign l = r` becomes `output l = r`
/// - `return v` becomes `output v = v`, designating the run result
/// - query and mutation bodies both become `gql query` statements keyed by
///   the same body text
///
/// Plugin inputs, and the function name, are mangled like every other
/// reference. Handlers receive script names as input keys (`cart@data`
/// arrives as `cart_data`) and are resolved under the mangled function name
/// (a function called `new` resolves as `new_`).
pub fn lower(statements: &[DocStmt]) -> Result<Vec<Stmt>, ComposeError> {
    statements.iter().map(lower_statement).collect()
}

/// Canonical script text of the lowered statements
pub fn to_script(statements: &[DocStmt]) -> Result<String, ComposeError> {
    Ok(lower(statements)?.iter().map(|stmt| stmt.to_string()).collect())
}

fn lower_statement(stmt: &DocStmt) -> Result<Stmt, ComposeError> {
    let span = Span::default();

    match stmt {
        DocStmt::DataQuery { var, body, .. } => Ok(Stmt::Query {
            var: script_ident(var),
            body: format!("{{ {} }}", body),
            span,
        }),
        DocStmt::Assign(assignment) => Ok(Stmt::Align {
            output: script_ident(&assignment.left),
            source: script_ident(&assignment.right),
            span,
        }),
        DocStmt::PluginCall {
            outputs,
            file,
            func,
            inputs,
        } => {
            let var = match outputs.as_slice() {
                [single] => script_ident(single),
                _ => {
                    return Err(ComposeError::Validation(format!(
                        "plugin call {}/{} binds {} outputs, scripts bind exactly one",
                        file,
                        func,
                        outputs.len()
                    )))
                }
            };
            Ok(Stmt::PluginCall {
                var,
                plugin: script_ident(file),
                func: script_ident(func),
                args: inputs.iter().map(|input| script_ident(input)).collect(),
                span,
            })
        }
        DocStmt::Return { var } => {
            let var = script_ident(var);
            Ok(Stmt::Align {
                output: var.clone(),
                source: var,
                span,
            })
        }
        DocStmt::Call { service } => Err(ComposeError::Validation(format!(
            "call to '{}' cannot be lowered, flatten the documents first",
            service
        ))),
        DocStmt::ServiceCall(call) => Err(ComposeError::Validation(format!(
            "call to '{}' cannot be lowered, flatten the documents first",
            call.service
        ))),
    }
}
