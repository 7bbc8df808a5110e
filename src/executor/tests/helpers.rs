//! Test helpers for executor tests
//!
//! Common utilities for parsing scripts and building interpreters backed by
//! an in-memory GraphQL transport.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::executor::{ExecError, ExecutionContext, Interpreter, RunOutcome};
use crate::extensions::ExtensionRegistry;
use crate::graphql::{QueryTransport, RemoteCallError};
use crate::registry::TemplateRegistry;

/// Transport that records every query and answers from a queue
#[derive(Default)]
pub struct FakeTransport {
    pub queries: Mutex<Vec<String>>,
    responses: Mutex<VecDeque<Result<JsonValue, RemoteCallError>>>,
}

impl FakeTransport {
    pub fn respond(&self, response: JsonValue) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn fail(&self, status: u16) {
        self.responses.lock().unwrap().push_back(Err(RemoteCallError::Status {
            status,
            body: "failed".to_string(),
        }));
    }

    pub fn sent(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryTransport for FakeTransport {
    async fn execute(&self, query: &str) -> Result<JsonValue, RemoteCallError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(JsonValue::Null))
    }
}

/// Interpreter plus handles on everything it talks to
pub struct Harness {
    pub interpreter: Interpreter,
    pub templates: Arc<TemplateRegistry>,
    pub extensions: Arc<ExtensionRegistry>,
    pub transport: Arc<FakeTransport>,
}

impl Harness {
    pub fn new() -> Self {
        let templates = Arc::new(TemplateRegistry::new());
        let extensions = Arc::new(ExtensionRegistry::new());
        let transport = Arc::new(FakeTransport::default());
        let interpreter = Interpreter::new(
            Arc::clone(&templates),
            Arc::clone(&extensions),
            transport.clone() as Arc<dyn QueryTransport>,
        );

        Self {
            interpreter,
            templates,
            extensions,
            transport,
        }
    }

    pub fn with_max_loop_iterations(mut self, limit: usize) -> Self {
        self.interpreter = self.interpreter.with_max_loop_iterations(limit);
        self
    }

    /// Parse and run `source` with the given parameters
    pub async fn run(
        &self,
        source: &str,
        params: HashMap<String, String>,
    ) -> Result<RunOutcome, ExecError> {
        let stmts = crate::parser::parse(source).expect("Parse script failed");
        self.interpreter.run(&stmts, params).await
    }

    /// Parse and run `source`, returning the context for inspection
    pub async fn run_with_context(
        &self,
        source: &str,
    ) -> (Result<RunOutcome, ExecError>, ExecutionContext) {
        let stmts = crate::parser::parse(source).expect("Parse script failed");
        let mut ctx = ExecutionContext::new();
        let result = self.interpreter.run_in(&stmts, &mut ctx).await;
        (result, ctx)
    }
}
