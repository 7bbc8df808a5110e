//! Runtime error types and their stable codes

use thiserror::Error;

use crate::graphql::RemoteCallError;

pub const UNDEFINED_VARIABLE: &str = "UNDEFINED_VARIABLE";
pub const TYPE_ERROR: &str = "TYPE_ERROR";
pub const UNSUPPORTED_OPERATOR: &str = "UNSUPPORTED_OPERATOR";
pub const INTEGER_OVERFLOW: &str = "INTEGER_OVERFLOW";
pub const TEMPLATE_NOT_FOUND: &str = "TEMPLATE_NOT_FOUND";
pub const REMOTE_CALL_ERROR: &str = "REMOTE_CALL_ERROR";
pub const EXTENSION_NOT_FOUND: &str = "EXTENSION_NOT_FOUND";
pub const EMPTY_RESULT: &str = "EMPTY_RESULT";
pub const ITERATION_LIMIT_EXCEEDED: &str = "ITERATION_LIMIT_EXCEEDED";

/// Fatal error raised while executing a script. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Unsupported operator '{0}', only '+' and '-' are allowed")]
    UnsupportedOperator(String),

    #[error("Integer overflow computing '{0}'")]
    IntegerOverflow(String),

    #[error("No query template registered for key '{0}'")]
    TemplateNotFound(String),

    #[error(transparent)]
    RemoteCall(#[from] RemoteCallError),

    #[error("No extension handler named '{0}'")]
    ExtensionNotFound(String),

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Loop on '{cond}' exceeded {limit} iterations")]
    IterationLimitExceeded { cond: String, limit: usize },
}

impl ExecError {
    pub fn code(&self) -> &'static str {
        match self {
            ExecError::UndefinedVariable(_) => UNDEFINED_VARIABLE,
            ExecError::Type(_) => TYPE_ERROR,
            ExecError::UnsupportedOperator(_) => UNSUPPORTED_OPERATOR,
            ExecError::IntegerOverflow(_) => INTEGER_OVERFLOW,
            ExecError::TemplateNotFound(_) => TEMPLATE_NOT_FOUND,
            ExecError::RemoteCall(_) => REMOTE_CALL_ERROR,
            ExecError::ExtensionNotFound(_) => EXTENSION_NOT_FOUND,
            ExecError::EmptyResult(_) => EMPTY_RESULT,
            ExecError::IterationLimitExceeded { .. } => ITERATION_LIMIT_EXCEEDED,
        }
    }
}
