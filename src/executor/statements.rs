//! Statement execution handlers
//!
//! Each statement kind has its own handler. Control-flow handlers recurse
//! through `Interpreter::exec_stmt`.

use std::time::Instant;

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use super::context::ExecutionContext;
use super::errors::ExecError;
use super::substitute::{query_key, substitute};
use super::types::{CalOp, Literal, Stmt, Value};
use super::Interpreter;
use crate::graphql::RemoteCallError;

/* ===================== Statement Handlers ===================== */

impl Interpreter {
    /// Execute Query statement
    pub(super) async fn exec_query(
        &self,
        ctx: &mut ExecutionContext,
        var: &str,
        body: &str,
    ) -> Result<(), ExecError> {
        let key = query_key(body);
        let template = self
            .templates
            .get(key)
            .ok_or_else(|| ExecError::TemplateNotFound(key.to_string()))?;
        let query = substitute(&template, ctx);

        let started = Instant::now();
        let response = self.transport.execute(&query).await?;
        ctx.stats.record_query(started.elapsed());

        let data = match response {
            JsonValue::Object(mut fields) => fields.remove("data").unwrap_or(JsonValue::Null),
            _ => JsonValue::Null,
        };
        debug!(var, elapsed_ms = started.elapsed().as_millis() as u64, "query complete");
        ctx.set(var, Value::Json(data));
        Ok(())
    }

    /// Execute Align statement
    pub(super) fn exec_align(
        &self,
        ctx: &mut ExecutionContext,
        output: &str,
        source: &str,
    ) -> Result<(), ExecError> {
        let value = ctx.get_required(source)?.clone();
        ctx.set(output, value);
        ctx.output_key = Some(output.to_string());
        Ok(())
    }

    /// Execute PluginCall statement
    pub(super) async fn exec_plugin_call(
        &self,
        ctx: &mut ExecutionContext,
        var: &str,
        func: &str,
        args: &[String],
    ) -> Result<(), ExecError> {
        let mut input = Map::new();
        for arg in args {
            input.insert(arg.clone(), ctx.get_required(arg)?.to_json());
        }

        let handler = self
            .extensions
            .resolve(func)
            .ok_or_else(|| ExecError::ExtensionNotFound(func.to_string()))?;

        ctx.stats.record_extension_call();
        let output = handler
            .invoke(JsonValue::Object(input))
            .await
            .map_err(|source| RemoteCallError::Extension {
                name: func.to_string(),
                source,
            })?;

        let first = match output {
            JsonValue::Object(fields) => fields.into_iter().next().map(|(_, value)| value),
            _ => None,
        };
        let value = first.ok_or_else(|| {
            ExecError::EmptyResult(format!("extension '{}' returned no fields", func))
        })?;

        ctx.set(var, Value::Json(value));
        Ok(())
    }

    /// Execute Def and Set statements
    pub(super) fn exec_def(&self, ctx: &mut ExecutionContext, var: &str, literal: &Literal) {
        ctx.set(var, Value::from_literal(literal));
    }

    /// Execute IntCal statement
    pub(super) fn exec_int_cal(
        &self,
        ctx: &mut ExecutionContext,
        target: &str,
        source: &str,
        op: CalOp,
        operand: i64,
    ) -> Result<(), ExecError> {
        let current = match ctx.get_required(source)? {
            Value::Int(n) => *n,
            other => {
                return Err(ExecError::Type(format!(
                    "'{}' holds a {} value, arithmetic needs an integer",
                    source,
                    other.kind()
                )))
            }
        };

        let result = match op {
            CalOp::Add => current.checked_add(operand),
            CalOp::Sub => current.checked_sub(operand),
            CalOp::Mul | CalOp::Div | CalOp::Rem => {
                return Err(ExecError::UnsupportedOperator(op.symbol().to_string()))
            }
        };
        let result = result.ok_or_else(|| {
            ExecError::IntegerOverflow(format!("{} {} {}", current, op.symbol(), operand))
        })?;

        ctx.set(target, Value::Int(result));
        Ok(())
    }

    /// Execute While statement
    pub(super) async fn exec_while(
        &self,
        ctx: &mut ExecutionContext,
        cond: &str,
        body: &Stmt,
    ) -> Result<(), ExecError> {
        let mut iterations = 0usize;
        while eval_condition(ctx, cond)? {
            iterations += 1;
            if iterations > self.max_loop_iterations {
                return Err(ExecError::IterationLimitExceeded {
                    cond: cond.to_string(),
                    limit: self.max_loop_iterations,
                });
            }
            self.exec_stmt(body, ctx).await?;
        }
        debug!(cond, iterations, "loop finished");
        Ok(())
    }
}

/* ===================== Conditions ===================== */

/// Evaluate the truth of a condition variable
///
/// Booleans (plain or JSON) are taken as-is. Raw integers are true when
/// positive; a negative integer is a type error, not false.
pub fn eval_condition(ctx: &ExecutionContext, cond: &str) -> Result<bool, ExecError> {
    let value = ctx.get_required(cond)?;
    if let Some(b) = value.as_bool() {
        return Ok(b);
    }
    match value {
        Value::Int(n) if *n < 0 => Err(ExecError::Type(format!(
            "condition '{}' is negative ({})",
            cond, n
        ))),
        Value::Int(n) => Ok(*n > 0),
        other => Err(ExecError::Type(format!(
            "condition '{}' holds a {} value",
            cond,
            other.kind()
        ))),
    }
}

/* ===================== Run Result ===================== */

/// Value designated by the last executed `output` statement
pub fn final_result(ctx: &ExecutionContext) -> Result<(String, Value), ExecError> {
    let key = ctx
        .output_key
        .as_ref()
        .ok_or_else(|| ExecError::EmptyResult("no output statement was executed".to_string()))?;

    match ctx.get(key) {
        Some(value) if !value.is_null() => Ok((key.clone(), value.clone())),
        _ => Err(ExecError::EmptyResult(format!("output '{}' holds nothing", key))),
    }
}
