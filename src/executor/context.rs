//! Per-run execution state

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::errors::ExecError;
use super::types::Value;

/// Counters collected over one run
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub queries: usize,
    pub extension_calls: usize,
    /// Accumulated GraphQL round-trip time
    pub query_time_ms: u128,
}

impl RunStats {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            queries: 0,
            extension_calls: 0,
            query_time_ms: 0,
        }
    }

    pub(crate) fn record_query(&mut self, elapsed: Duration) {
        self.queries += 1;
        self.query_time_ms += elapsed.as_millis();
    }

    pub(crate) fn record_extension_call(&mut self) {
        self.extension_calls += 1;
    }
}

/// Variable environment of a single run
///
/// One flat namespace: blocks do not introduce scopes and later writes
/// overwrite earlier ones.
#[derive(Debug)]
pub struct ExecutionContext {
    pub run_id: Uuid,
    /// Name of the script being run, for log correlation
    pub script: String,
    vars: HashMap<String, Value>,
    /// Variable named by the most recent `output` statement
    pub output_key: Option<String>,
    pub stats: RunStats,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            script: "<inline>".to_string(),
            vars: HashMap::new(),
            output_key: None,
            stats: RunStats::new(),
        }
    }

    /// Seed the environment with caller parameters, each bound as a string
    pub fn with_params(params: HashMap<String, String>) -> Self {
        let mut ctx = Self::new();
        ctx.vars = params
            .into_iter()
            .map(|(name, value)| (name, Value::Str(value)))
            .collect();
        ctx
    }

    pub fn with_script(mut self, name: impl Into<String>) -> Self {
        self.script = name.into();
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn get_required(&self, name: &str) -> Result<&Value, ExecError> {
        self.vars
            .get(name)
            .ok_or_else(|| ExecError::UndefinedVariable(name.to_string()))
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
