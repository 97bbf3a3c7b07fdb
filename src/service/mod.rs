// Transform service - the persistent esbuild process and its lifecycle

pub mod lifecycle;
pub mod process;

pub use lifecycle::ServiceManager;
pub use process::{ProcessLauncher, ProcessService};

use crate::error::ServiceError;
use crate::loader::Loader;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Options sent with one transform request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOptions {
    pub loader: Loader,

    pub target: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsx_factory: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsx_fragment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub define: Option<IndexMap<String, String>>,

    pub sourcemap: bool,

    /// Source identity for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcefile: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub minify: bool,
}

impl TransformOptions {
    /// Options for a whole-chunk minify pass
    pub fn minify(target: impl Into<String>) -> Self {
        Self {
            loader: Loader::Js,
            target: target.into(),
            jsx_factory: None,
            jsx_fragment: None,
            define: None,
            sourcemap: false,
            sourcefile: None,
            minify: true,
        }
    }
}

/// Position of a diagnostic, 1-based line and 0-based column as the
/// service reports them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}

/// One diagnostic returned by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    #[serde(default)]
    pub location: Option<Location>,
}

/// Result of a successful transform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutput {
    /// `None` means the service produced nothing for this input
    pub code: Option<String>,
    pub map: Option<serde_json::Value>,
    pub warnings: Vec<Message>,
}

/// A running transform service
///
/// Implementations must accept concurrent `transform` calls; responses are
/// correlated to requests by the implementation.
#[async_trait]
pub trait TransformService: Send + Sync {
    /// Transform one source text
    ///
    /// Compile failures come back as [`ServiceError::Compile`].
    async fn transform(
        &self,
        source: &str,
        options: &TransformOptions,
    ) -> Result<TransformOutput, ServiceError>;

    /// Shut the service down. Calling this more than once is harmless.
    async fn stop(&self);
}

/// Starts transform services
#[async_trait]
pub trait ServiceLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn TransformService>, ServiceError>;
}
