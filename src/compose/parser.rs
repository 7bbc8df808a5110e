//! PEST-based parser for service documents

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::document::{Assignment, DocStmt, Document, QueryKind};
use super::ComposeError;
use crate::parser::{ParseError, ParseResult, Tokens};
use crate::registry::script_name_from_file;

#[derive(Parser)]
#[grammar = "compose/document.pest"]
struct DocumentParser;

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_service
            | Rule::kw_new
            | Rule::kw_gql
            | Rule::kw_plugin
            | Rule::kw_assign
            | Rule::kw_call
            | Rule::kw_return
    )
}

fn tokens<'i>(pair: Pair<'i, Rule>, source: &str) -> Tokens<'i, Rule> {
    Tokens::new(pair, source, is_keyword)
}

/// Parse one document
///
/// Without a `service name:{ ... }` wrapper the service is named after the
/// file (minus a `.gqlp` extension).
pub fn parse_document(file_name: &str, content: &str) -> Result<Document, ComposeError> {
    if content.trim().is_empty() {
        return Err(ComposeError::Parse {
            file: file_name.to_string(),
            source: ParseError::BuildError("document is empty".to_string(), None),
        });
    }

    build_document(file_name, content).map_err(|source| ComposeError::Parse {
        file: file_name.to_string(),
        source,
    })
}

fn build_document(file_name: &str, content: &str) -> ParseResult<Document> {
    let mut pairs = DocumentParser::parse(Rule::document, content).map_err(ParseError::from_pest)?;
    let document = pairs
        .next()
        .ok_or_else(|| ParseError::BuildError("Parser produced no document".to_string(), None))?;

    let mut service = script_name_from_file(file_name);
    let mut statements = Vec::new();

    for pair in document.into_inner() {
        match pair.as_rule() {
            Rule::service_block => {
                let mut inner = tokens(pair, content);
                service = inner.text("service name")?;
                statements = build_statement_list(inner.next("statement list")?, content)?;
            }
            Rule::statement_list => statements = build_statement_list(pair, content)?,
            _ => {}
        }
    }

    Ok(Document {
        service,
        statements,
        source: content.to_string(),
    })
}

fn build_statement_list(pair: Pair<Rule>, source: &str) -> ParseResult<Vec<DocStmt>> {
    pair.into_inner()
        .map(|stmt| build_statement(stmt, source))
        .collect()
}

fn build_statement(pair: Pair<Rule>, source: &str) -> ParseResult<DocStmt> {
    let rule = pair.as_rule();
    let mut inner = tokens(pair, source);

    match rule {
        Rule::data_query => {
            let var = inner.text("query variable")?;
            let kind = if inner.text("query kind")?.eq_ignore_ascii_case("mutation") {
                QueryKind::Mutation
            } else {
                QueryKind::Query
            };
            let body_pair = inner.next("query body")?;
            let body = body_pair
                .into_inner()
                .next()
                .map(|p| p.as_str().trim().to_string())
                .unwrap_or_default();
            Ok(DocStmt::DataQuery { var, kind, body })
        }
        Rule::plugin_call => {
            let outputs = var_list(inner.next("output variables")?);
            let file = inner.text("plugin file")?;
            let func = inner.text("function name")?;
            let inputs = inner.try_next().map(var_list).unwrap_or_default();
            Ok(DocStmt::PluginCall {
                outputs,
                file,
                func,
                inputs,
            })
        }
        Rule::assign_stmt => {
            let left = inner.text("assignment target")?;
            let right = inner.text("assignment source")?;
            Ok(DocStmt::Assign(Assignment { left, right }))
        }
        Rule::call_stmt => Ok(DocStmt::Call {
            service: inner.text("service name")?,
        }),
        Rule::return_stmt => Ok(DocStmt::Return {
            var: inner.text("return variable")?,
        }),
        other => Err(ParseError::BuildError(
            format!("Unexpected document rule: {:?}", other),
            Some(inner.span()),
        )),
    }
}

fn var_list(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner().map(|p| p.as_str().to_string()).collect()
}
