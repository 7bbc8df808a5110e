//! # Executor - tree-walking interpreter for GraphQL+ scripts
//!
//! Runs a parsed statement sequence against one `ExecutionContext`.
//!
//! ## Core Principles
//!
//! 1. **Single environment**: one flat variable namespace per run, no scoping
//! 2. **Exhaustive dispatch**: every statement kind is one arm of `exec_stmt`
//! 3. **Fail fast**: the first error aborts the run, nothing is retried
//! 4. **Shared collaborators**: templates, extensions and the GraphQL
//!    transport are read-only from the run's point of view

pub mod context;
pub mod errors;
pub mod statements;
pub mod substitute;
pub mod types;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};

use crate::extensions::ExtensionRegistry;
use crate::graphql::QueryTransport;
use crate::registry::TemplateRegistry;

// Re-export commonly used items
pub use context::{ExecutionContext, RunStats};
pub use errors::ExecError;
pub use statements::eval_condition;
pub use types::{CalOp, Literal, Span, Stmt, Value};

/// Default cap on iterations of a single `while` loop
pub const MAX_LOOP_ITERATIONS: usize = 1000;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub value: Value,
    pub output_key: String,
    pub stats: RunStats,
}

/// Script interpreter
///
/// Cheap to clone; every run gets its own context so one interpreter can
/// serve concurrent runs.
#[derive(Clone)]
pub struct Interpreter {
    templates: Arc<TemplateRegistry>,
    extensions: Arc<ExtensionRegistry>,
    transport: Arc<dyn QueryTransport>,
    max_loop_iterations: usize,
}

impl Interpreter {
    pub fn new(
        templates: Arc<TemplateRegistry>,
        extensions: Arc<ExtensionRegistry>,
        transport: Arc<dyn QueryTransport>,
    ) -> Self {
        Self {
            templates,
            extensions,
            transport,
            max_loop_iterations: MAX_LOOP_ITERATIONS,
        }
    }

    pub fn with_max_loop_iterations(mut self, limit: usize) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    pub fn max_loop_iterations(&self) -> usize {
        self.max_loop_iterations
    }

    /// Run a script with fresh state seeded from `params`
    pub async fn run(
        &self,
        stmts: &[Stmt],
        params: HashMap<String, String>,
    ) -> Result<RunOutcome, ExecError> {
        let mut ctx = ExecutionContext::with_params(params);
        self.run_in(stmts, &mut ctx).await
    }

    /// Run a script against a caller-owned context
    ///
    /// The context is left as the run finished, including on error.
    pub async fn run_in(
        &self,
        stmts: &[Stmt],
        ctx: &mut ExecutionContext,
    ) -> Result<RunOutcome, ExecError> {
        let span = info_span!("run", run_id = %ctx.run_id, script = %ctx.script);

        async move {
            info!(statements = stmts.len(), "run started");

            for stmt in stmts {
                self.exec_stmt(stmt, ctx).await?;
            }

            let (output_key, value) = statements::final_result(ctx)?;
            info!(
                output = %output_key,
                queries = ctx.stats.queries,
                extension_calls = ctx.stats.extension_calls,
                query_time_ms = ctx.stats.query_time_ms as u64,
                "run finished"
            );

            Ok(RunOutcome {
                value,
                output_key,
                stats: ctx.stats.clone(),
            })
        }
        .instrument(span)
        .await
    }

    /// Execute a single statement
    fn exec_stmt<'a>(
        &'a self,
        stmt: &'a Stmt,
        ctx: &'a mut ExecutionContext,
    ) -> BoxFuture<'a, Result<(), ExecError>> {
        Box::pin(async move {
            debug!(kind = stmt.kind(), line = stmt.span().start_line + 1, "exec");

            match stmt {
                Stmt::Query { var, body, .. } => self.exec_query(ctx, var, body).await,
                Stmt::Align { output, source, .. } => self.exec_align(ctx, output, source),
                Stmt::PluginCall {
                    var, func, args, ..
                } => self.exec_plugin_call(ctx, var, func, args).await,
                Stmt::Def { var, value, .. } | Stmt::Set { var, value, .. } => {
                    self.exec_def(ctx, var, value);
                    Ok(())
                }
                Stmt::IntDef { var, value, .. } => {
                    ctx.set(var.as_str(), Value::Int(*value));
                    Ok(())
                }
                Stmt::IntCal {
                    target,
                    source,
                    op,
                    operand,
                    ..
                } => self.exec_int_cal(ctx, target, source, *op, *operand),
                Stmt::If { cond, body, .. } => {
                    if eval_condition(ctx, cond)? {
                        self.exec_stmt(body, ctx).await?;
                    }
                    Ok(())
                }
                Stmt::While { cond, body, .. } => self.exec_while(ctx, cond, body).await,
                Stmt::Block { body, .. } => {
                    for child in body {
                        self.exec_stmt(child, ctx).await?;
                    }
                    Ok(())
                }
            }
        })
    }
}
