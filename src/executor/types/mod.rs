//! Type definitions for the executor
//!
//! - AST nodes (Stmt, Literal, CalOp, Span)
//! - Runtime values (Value)

pub mod ast;
pub mod values;

pub use ast::{CalOp, Literal, Span, Stmt};
pub use values::Value;
