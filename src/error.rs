// Error types for the esbuild plugin

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for plugin operations
///
/// This is the error surfaced to the bundler from a hook. Individual error
/// types are exposed through `From` conversions.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Invalid plugin options: {0}")]
    Options(#[from] OptionsError),

    #[error("tsconfig error: {0}")]
    Tsconfig(#[from] TsconfigError),

    #[error("esbuild service error: {0}")]
    Service(#[from] ServiceError),
}

/// Errors while building the plugin from its options
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid glob pattern '{pattern}': {message}")]
    Glob { pattern: String, message: String },

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),
}

/// Errors while loading a discovered project configuration file
#[derive(Debug, Error)]
pub enum TsconfigError {
    #[error("failed to read {}: {error}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Errors reported by or about the transform service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(
        "esbuild service binary '{0}' not found. Install esbuild or set the service program path."
    )]
    NotFound(String),

    #[error("failed to start esbuild service: {0}")]
    Spawn(String),

    #[error("esbuild service protocol error: {0}")]
    Protocol(String),

    #[error("esbuild service is not running")]
    Stopped,

    #[error("{}", format_compile_errors(.errors))]
    Compile { errors: Vec<CompileMessage> },
}

/// One fatal diagnostic returned by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileMessage {
    pub text: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

fn format_compile_errors(errors: &[CompileMessage]) -> String {
    let mut lines = Vec::with_capacity(errors.len());
    for err in errors {
        match (&err.file, err.line, err.column) {
            (Some(file), Some(line), Some(column)) => {
                lines.push(format!("{}:{}:{}: {}", file, line, column, err.text))
            }
            (Some(file), _, _) => lines.push(format!("{}: {}", file, err.text)),
            _ => lines.push(err.text.clone()),
        }
    }
    if lines.is_empty() {
        return "Transform failed".to_string();
    }
    format!("Transform failed with {} error(s):\n{}", lines.len(), lines.join("\n"))
}
