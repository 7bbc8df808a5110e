//! Query template lookup key and `${name}` substitution

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value as JsonValue;

use super::context::ExecutionContext;
use super::types::Value;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\$\{([a-zA-Z0-9_.]+)\}").expect("placeholder pattern is valid"))
}

/// Template key of a query body: the text inside its outer braces, trimmed
pub fn query_key(body: &str) -> &str {
    let trimmed = body.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(trimmed);
    inner.trim()
}

/// Replace every bound `${name}` in `template`; unbound tokens stay as written
pub fn substitute(template: &str, ctx: &ExecutionContext) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures| match ctx.get(&caps[1]) {
            Some(value) => render(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn render(value: &Value) -> String {
    match value.as_str() {
        Some(s) => quote(s),
        None => value.to_json().to_string(),
    }
}

/// JSON string syntax is valid GraphQL string syntax
fn quote(s: &str) -> String {
    JsonValue::String(s.to_string()).to_string()
}
