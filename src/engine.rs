//! Engine facade
//!
//! Owns the shared registries and the interpreter, and ties the pipeline
//! together: compose -> lower -> parse -> run.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::compose::{self, ComposeError, ComposeReport, SourceFile};
use crate::config::Config;
use crate::executor::{ExecError, ExecutionContext, Interpreter, RunOutcome, Stmt};
use crate::extensions::ExtensionRegistry;
use crate::graphql::{HttpTransport, QueryTransport, RemoteCallError};
use crate::parser::{self, ParseError};
use crate::registry::{parse_template_pack, script_name_from_file, ScriptRegistry, TemplateRegistry};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Script '{0}' is not registered")]
    ScriptNotFound(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Transport(#[from] RemoteCallError),
}

/// Counts of what an update registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub scripts: usize,
    pub templates: usize,
}

pub struct Engine {
    config: Config,
    templates: Arc<TemplateRegistry>,
    scripts: Arc<ScriptRegistry>,
    extensions: Arc<ExtensionRegistry>,
    interpreter: Interpreter,
}

impl Engine {
    /// Engine talking to the configured GraphQL endpoint over HTTP
    pub fn new(config: Config) -> Result<Self, EngineError> {
        let transport = HttpTransport::from_config(&config.graphql)?;
        info!(endpoint = %transport.endpoint(), "GraphQL transport ready");
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn QueryTransport>, config: Config) -> Self {
        let templates = Arc::new(TemplateRegistry::new());
        let scripts = Arc::new(ScriptRegistry::new());
        let extensions = Arc::new(ExtensionRegistry::new());
        let interpreter =
            Interpreter::new(Arc::clone(&templates), Arc::clone(&extensions), transport)
                .with_max_loop_iterations(config.engine.max_loop_iterations);

        Self {
            config,
            templates,
            scripts,
            extensions,
            interpreter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    pub fn scripts(&self) -> &Arc<ScriptRegistry> {
        &self.scripts
    }

    pub fn extensions(&self) -> &Arc<ExtensionRegistry> {
        &self.extensions
    }

    /// Register script files and merge template packs
    ///
    /// Scripts are named after their file stem. Each table is published in
    /// one swap.
    pub fn update(&self, scripts: &[SourceFile], template_packs: &[SourceFile]) -> UpdateSummary {
        let script_map: HashMap<String, String> = scripts
            .iter()
            .map(|file| (script_name_from_file(&file.name), file.content.clone()))
            .collect();

        let mut templates = HashMap::new();
        for pack in template_packs {
            let entries = parse_template_pack(&pack.content);
            info!(pack = %pack.name, entries = entries.len(), "read template pack");
            templates.extend(entries);
        }

        let summary = UpdateSummary {
            scripts: script_map.len(),
            templates: templates.len(),
        };
        if !script_map.is_empty() {
            self.scripts.merge(script_map);
        }
        if !templates.is_empty() {
            self.templates.merge(templates);
        }
        info!(scripts = summary.scripts, templates = summary.templates, "registries updated");
        summary
    }

    /// Run a registered script by name
    pub async fn execute(
        &self,
        script_name: &str,
        params: HashMap<String, String>,
    ) -> Result<RunOutcome, EngineError> {
        let entry = self
            .scripts
            .get(script_name)
            .ok_or_else(|| EngineError::ScriptNotFound(script_name.to_string()))?;

        let stmts = parser::parse(&entry.source)?;
        self.run_statements(script_name, &stmts, params).await
    }

    /// Parse and run ad-hoc script text
    pub async fn run_source(
        &self,
        source: &str,
        params: HashMap<String, String>,
    ) -> Result<RunOutcome, EngineError> {
        let stmts = parser::parse(source)?;
        self.run_statements("<inline>", &stmts, params).await
    }

    pub fn compose_files(
        &self,
        files: &[SourceFile],
        entry: Option<&str>,
    ) -> Result<ComposeReport, EngineError> {
        Ok(compose::compose_files(files, entry)?)
    }

    /// Compose documents, lower them to a script and run it
    pub async fn compose_and_run(
        &self,
        files: &[SourceFile],
        entry: Option<&str>,
        params: HashMap<String, String>,
    ) -> Result<RunOutcome, EngineError> {
        let report = compose::compose_files(files, entry)?;
        let script = compose::to_script(&report.statements)?;
        let stmts = parser::parse(&script)?;
        self.run_statements(&report.entry, &stmts, params).await
    }

    async fn run_statements(
        &self,
        name: &str,
        stmts: &[Stmt],
        params: HashMap<String, String>,
    ) -> Result<RunOutcome, EngineError> {
        let mut ctx = ExecutionContext::with_params(params).with_script(name);
        Ok(self.interpreter.run_in(stmts, &mut ctx).await?)
    }
}
