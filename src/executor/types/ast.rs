//! Abstract Syntax Tree node types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location span for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset
    pub end: usize,
    /// Start line (0-indexed)
    pub start_line: usize,
    /// Start column (0-indexed)
    pub start_col: usize,
    /// End line (0-indexed)
    pub end_line: usize,
    /// End column (0-indexed)
    pub end_col: usize,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
    ) -> Self {
        Self {
            start,
            end,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

/// Literal accepted by `def` and `set`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(v) => {
                // A float literal needs its decimal point to parse back as a float
                let text = v.to_string();
                if text.contains('.') {
                    write!(f, "{}", text)
                } else {
                    write!(f, "{}.0", text)
                }
            }
            Literal::Str(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }
}

/// Operator of a `cal` statement
///
/// The grammar accepts every arithmetic symbol; only `+` and `-` execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl CalOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(CalOp::Add),
            "-" => Some(CalOp::Sub),
            "*" => Some(CalOp::Mul),
            "/" => Some(CalOp::Div),
            "%" => Some(CalOp::Rem),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CalOp::Add => "+",
            CalOp::Sub => "-",
            CalOp::Mul => "*",
            CalOp::Div => "/",
            CalOp::Rem => "%",
        }
    }
}

/// Statement AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Stmt {
    /// `new var = gql query { ... }`; `body` keeps the outer braces verbatim
    Query {
        var: String,
        body: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// `output out = source`
    Align {
        output: String,
        source: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// `new var = plugin/func(args)`
    PluginCall {
        var: String,
        plugin: String,
        func: String,
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Def {
        var: String,
        value: Literal,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Set {
        var: String,
        value: Literal,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    IntDef {
        var: String,
        value: i64,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    IntCal {
        target: String,
        source: String,
        op: CalOp,
        operand: i64,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    If {
        cond: String,
        body: Box<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    While {
        cond: String,
        body: Box<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Block {
        body: Vec<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
}

impl Stmt {
    /// Get the span of this statement
    pub fn span(&self) -> Span {
        match self {
            Stmt::Query { span, .. } => *span,
            Stmt::Align { span, .. } => *span,
            Stmt::PluginCall { span, .. } => *span,
            Stmt::Def { span, .. } => *span,
            Stmt::Set { span, .. } => *span,
            Stmt::IntDef { span, .. } => *span,
            Stmt::IntCal { span, .. } => *span,
            Stmt::If { span, .. } => *span,
            Stmt::While { span, .. } => *span,
            Stmt::Block { span, .. } => *span,
        }
    }

    /// Short name of the statement kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Stmt::Query { .. } => "query",
            Stmt::Align { .. } => "output",
            Stmt::PluginCall { .. } => "plugin",
            Stmt::Def { .. } => "def",
            Stmt::Set { .. } => "set",
            Stmt::IntDef { .. } => "int",
            Stmt::IntCal { .. } => "cal",
            Stmt::If { .. } => "if",
            Stmt::While { .. } => "while",
            Stmt::Block { .. } => "block",
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "    ".repeat(depth);
        match self {
            Stmt::Query { var, body, .. } => writeln!(f, "{}new {} = gql query {};", pad, var, body),
            Stmt::Align { output, source, .. } => {
                writeln!(f, "{}output {} = {};", pad, output, source)
            }
            Stmt::PluginCall {
                var,
                plugin,
                func,
                args,
                ..
            } => writeln!(
                f,
                "{}new {} = {}/{}({});",
                pad,
                var,
                plugin,
                func,
                args.join(", ")
            ),
            Stmt::Def { var, value, .. } => writeln!(f, "{}def {} = {};", pad, var, value),
            Stmt::Set { var, value, .. } => writeln!(f, "{}set {} = {};", pad, var, value),
            Stmt::IntDef { var, value, .. } => writeln!(f, "{}int {} = {};", pad, var, value),
            Stmt::IntCal {
                target,
                source,
                op,
                operand,
                ..
            } => writeln!(
                f,
                "{}cal {} = {} {} {};",
                pad,
                target,
                source,
                op.symbol(),
                operand
            ),
            Stmt::If { cond, body, .. } => {
                write!(f, "{}if ({}) ", pad, cond)?;
                body.write_body(f, depth)
            }
            Stmt::While { cond, body, .. } => {
                write!(f, "{}while ({}) ", pad, cond)?;
                body.write_body(f, depth)
            }
            Stmt::Block { .. } => {
                write!(f, "{}", pad)?;
                self.write_body(f, depth)
            }
        }
    }

    fn write_body(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "    ".repeat(depth);
        match self {
            Stmt::Block { body, .. } => {
                writeln!(f, "{{")?;
                for stmt in body {
                    stmt.write_indented(f, depth + 1)?;
                }
                writeln!(f, "{}}}", pad)
            }
            other => {
                writeln!(f, "{{")?;
                other.write_indented(f, depth + 1)?;
                writeln!(f, "{}}}", pad)
            }
        }
    }
}

/// Canonical script text; parsing it back yields the same statement
impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// Helper function for serde to skip serializing default spans
fn is_default_span(span: &Span) -> bool {
    *span == Span::default()
}
