pub mod cli;
pub mod compose;
pub mod config;
pub mod engine;
pub mod executor;
pub mod extensions;
pub mod graphql;
pub mod parser;
pub mod registry;

// Re-export main types
pub use compose::{ComposeError, ComposeReport, SourceFile};
pub use config::Config;
pub use engine::{Engine, EngineError, UpdateSummary};
pub use executor::{ExecError, ExecutionContext, Interpreter, RunOutcome, RunStats, Stmt, Value};
pub use extensions::{ExtensionRegistry, Handler, InvocationError};
pub use graphql::{HttpTransport, QueryTransport, RemoteCallError};
pub use parser::{parse, ParseError};
