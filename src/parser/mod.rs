//! PEST-based parser for GraphQL+ scripts
//!
//! Produces the statement sequence consumed by the executor, with span
//! information for error reporting. Parsing is all-or-nothing: any error
//! discards the partially built tree.

use pest::iterators::{Pair, Pairs};
use pest::{Parser, RuleType};
use pest_derive::Parser;
use thiserror::Error;

use crate::executor::types::ast::{CalOp, Literal, Span, Stmt};


/// Words that can never be used as identifiers
pub const RESERVED_KEYWORDS: &[&str] = &[
    "new", "gql", "query", "output", "def", "set", "int", "cal", "if", "while", "true", "false",
];

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/gqlplus.pest"]
struct ScriptParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("{0}")]
    PestError(String, Option<Span>),
    #[error("{0}")]
    BuildError(String, Option<Span>),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::PestError(_, span) => *span,
            ParseError::BuildError(_, span) => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::PestError(msg, _) => msg,
            ParseError::BuildError(msg, _) => msg,
        }
    }

    pub(crate) fn from_pest<R: RuleType>(err: pest::error::Error<R>) -> Self {
        let span = match err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => Some(Span {
                start: 0,
                end: 0,
                start_line: line.saturating_sub(1),
                start_col: col.saturating_sub(1),
                end_line: line.saturating_sub(1),
                end_col: col,
            }),
            pest::error::LineColLocation::Span((start_line, start_col), (end_line, end_col)) => {
                Some(Span {
                    start: 0,
                    end: 0,
                    start_line: start_line.saturating_sub(1),
                    start_col: start_col.saturating_sub(1),
                    end_line: end_line.saturating_sub(1),
                    end_col: end_col.saturating_sub(1),
                })
            }
        };
        let (start, end) = match err.location {
            pest::error::InputLocation::Pos(pos) => (pos, pos),
            pest::error::InputLocation::Span((start, end)) => (start, end),
        };
        let span = span.map(|span| Span { start, end, ..span });
        ParseError::PestError(err.to_string(), span)
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::from_pest(err)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

/// Convert a PEST pair's span to our Span type
pub(crate) fn pair_to_span<R: RuleType>(pair: &Pair<R>, source: &str) -> Span {
    let pest_span = pair.as_span();
    let start = pest_span.start();
    let end = pest_span.end();

    let (start_line, start_col) = offset_to_line_col(source, start);
    let (end_line, end_col) = offset_to_line_col(source, end);

    Span::new(start, end, start_line, start_col, end_line, end_col)
}

/// Convert byte offset to (line, column) - 0-indexed
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;
    let mut current_offset = 0;

    for ch in source.chars() {
        if current_offset >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
        current_offset += ch.len_utf8();
    }

    (line, col)
}

/* ===================== Token Cursor ===================== */

/// Walks the significant children of a pair, skipping keyword tokens.
pub(crate) struct Tokens<'i, R: RuleType> {
    inner: Pairs<'i, R>,
    is_keyword: fn(R) -> bool,
    span: Span,
}

impl<'i, R: RuleType> Tokens<'i, R> {
    pub(crate) fn new(pair: Pair<'i, R>, source: &str, is_keyword: fn(R) -> bool) -> Self {
        let span = pair_to_span(&pair, source);
        Self {
            inner: pair.into_inner(),
            is_keyword,
            span,
        }
    }

    pub(crate) fn span(&self) -> Span {
        self.span
    }

    /// Next significant pair, or None when exhausted
    pub(crate) fn try_next(&mut self) -> Option<Pair<'i, R>> {
        let is_keyword = self.is_keyword;
        self.inner.by_ref().find(|pair| !is_keyword(pair.as_rule()))
    }

    /// Next significant pair; its absence means the grammar and builder disagree
    pub(crate) fn next(&mut self, what: &str) -> ParseResult<Pair<'i, R>> {
        self.try_next().ok_or_else(|| {
            ParseError::BuildError(format!("Expected {}", what), Some(self.span))
        })
    }

    pub(crate) fn text(&mut self, what: &str) -> ParseResult<String> {
        Ok(self.next(what)?.as_str().to_string())
    }
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_new
            | Rule::kw_gql
            | Rule::kw_query
            | Rule::kw_output
            | Rule::kw_plugin
            | Rule::kw_def
            | Rule::kw_set
            | Rule::kw_int
            | Rule::kw_cal
            | Rule::kw_if
            | Rule::kw_while
    )
}

fn tokens<'i>(pair: Pair<'i, Rule>, source: &str) -> Tokens<'i, Rule> {
    Tokens::new(pair, source, is_keyword)
}

/* ===================== Public API ===================== */

/// Parse GraphQL+ script text into its ordered statement sequence
pub fn parse(source: &str) -> ParseResult<Vec<Stmt>> {
    let mut pairs = ScriptParser::parse(Rule::script, source)?;
    let script = pairs.next().ok_or_else(|| {
        ParseError::BuildError("Parser produced no script".to_string(), None)
    })?;

    script
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::statement)
        .map(|pair| build_statement(pair, source))
        .collect()
}

/* ===================== AST Builder ===================== */

fn build_statement(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);

    match pair.as_rule() {
        Rule::statement => {
            let inner = tokens(pair, source).next("statement")?;
            build_statement(inner, source)
        }
        Rule::gql_query_stmt => {
            let mut inner = tokens(pair, source);
            let var = inner.text("query variable")?;
            let body = inner.text("query body")?;
            Ok(Stmt::Query { var, body, span })
        }
        Rule::align_stmt => {
            let mut inner = tokens(pair, source);
            let output = inner.text("output variable")?;
            let source_var = inner.text("source variable")?;
            Ok(Stmt::Align {
                output,
                source: source_var,
                span,
            })
        }
        Rule::plugin_call_stmt => build_plugin_call(pair, source),
        Rule::def_stmt | Rule::set_stmt => {
            let is_def = pair.as_rule() == Rule::def_stmt;
            let mut inner = tokens(pair, source);
            let var = inner.text("variable")?;
            let value = build_literal(inner.next("literal")?, source)?;
            if is_def {
                Ok(Stmt::Def { var, value, span })
            } else {
                Ok(Stmt::Set { var, value, span })
            }
        }
        Rule::int_def_stmt => {
            let mut inner = tokens(pair, source);
            let var = inner.text("variable")?;
            let value = build_integer(inner.next("integer")?, source)?;
            Ok(Stmt::IntDef { var, value, span })
        }
        Rule::int_cal_stmt => {
            let mut inner = tokens(pair, source);
            let target = inner.text("target variable")?;
            let source_var = inner.text("source variable")?;
            let op_pair = inner.next("operator")?;
            let op = CalOp::from_symbol(op_pair.as_str()).ok_or_else(|| {
                ParseError::BuildError(
                    format!("Unknown operator '{}'", op_pair.as_str()),
                    Some(pair_to_span(&op_pair, source)),
                )
            })?;
            let operand = build_integer(inner.next("integer")?, source)?;
            Ok(Stmt::IntCal {
                target,
                source: source_var,
                op,
                operand,
                span,
            })
        }
        Rule::if_stmt | Rule::while_stmt => {
            let is_if = pair.as_rule() == Rule::if_stmt;
            let mut inner = tokens(pair, source);
            let cond = inner.text("condition variable")?;
            let body = Box::new(build_block(inner.next("block")?, source)?);
            if is_if {
                Ok(Stmt::If { cond, body, span })
            } else {
                Ok(Stmt::While { cond, body, span })
            }
        }
        Rule::block => build_block(pair, source),
        _ => Err(ParseError::BuildError(
            format!("Unexpected statement rule: {:?}", pair.as_rule()),
            Some(span),
        )),
    }
}

fn build_block(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let body: ParseResult<Vec<Stmt>> = pair
        .into_inner()
        .map(|stmt_pair| build_statement(stmt_pair, source))
        .collect();

    Ok(Stmt::Block { body: body?, span })
}

fn build_plugin_call(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = tokens(pair, source);

    let var = inner.text("result variable")?;
    let plugin = inner.text("plugin name")?;
    let func = inner.text("function name")?;
    let args = match inner.try_next() {
        Some(arg_list) => arg_list
            .into_inner()
            .map(|arg| arg.as_str().to_string())
            .collect(),
        None => Vec::new(),
    };

    Ok(Stmt::PluginCall {
        var,
        plugin,
        func,
        args,
        span,
    })
}

fn build_literal(pair: Pair<Rule>, source: &str) -> ParseResult<Literal> {
    let span = pair_to_span(&pair, source);
    let inner = match pair.as_rule() {
        Rule::literal => tokens(pair, source).next("literal value")?,
        _ => pair,
    };

    match inner.as_rule() {
        Rule::boolean => Ok(Literal::Bool(inner.as_str() == "true")),
        Rule::float => {
            let text = inner.as_str();
            let value = text.parse::<f64>().map_err(|e| {
                ParseError::BuildError(
                    format!("Failed to parse float '{}': {}", text, e),
                    Some(span),
                )
            })?;
            if !value.is_finite() {
                return Err(ParseError::BuildError(
                    format!("Float '{}' is out of range", text),
                    Some(span),
                ));
            }
            Ok(Literal::Float(value))
        }
        Rule::integer => build_integer(inner, source).map(Literal::Int),
        Rule::string => {
            let content = tokens(inner, source).text("string content")?;
            Ok(Literal::Str(unescape(&content)))
        }
        _ => Err(ParseError::BuildError(
            format!("Unexpected literal rule: {:?}", inner.as_rule()),
            Some(span),
        )),
    }
}

fn build_integer(pair: Pair<Rule>, source: &str) -> ParseResult<i64> {
    let text = pair.as_str();
    text.parse::<i64>().map_err(|e| {
        ParseError::BuildError(
            format!("Failed to parse integer '{}': {}", text, e),
            Some(pair_to_span(&pair, source)),
        )
    })
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
