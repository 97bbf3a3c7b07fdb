// Bundler plugin seam - the hooks a bundler drives and the context it provides

pub mod esbuild;
pub mod warnings;

pub use esbuild::{BuildSnapshot, EsbuildPlugin};

use crate::error::PluginError;
use async_trait::async_trait;
use std::error::Error as StdError;
use std::path::PathBuf;

/// Build metadata the bundler exposes to plugins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildMeta {
    /// The bundler stays resident and rebuilds on file changes
    pub watch_mode: bool,
}

/// Services the bundler offers a plugin while a hook runs
pub trait PluginContext: Send + Sync {
    /// Emit a non-fatal diagnostic
    fn warn(&self, message: String);

    fn meta(&self) -> BuildMeta;
}

/// Code plus optional source map returned from a hook
#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    pub code: String,
    pub map: Option<serde_json::Value>,
}

/// Bundler lifecycle hooks
///
/// `Ok(None)` from `resolve_id`, `transform` and `render_chunk` means
/// "not handled": the bundler keeps its default behavior.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once before the bundler processes any file
    async fn build_start(&self, ctx: &dyn PluginContext) -> Result<(), PluginError>;

    /// Resolve `importee` as imported from `importer`
    async fn resolve_id(
        &self,
        importee: &str,
        importer: Option<&str>,
    ) -> Result<Option<PathBuf>, PluginError>;

    /// Transform one module's source; may run concurrently for many ids
    async fn transform(
        &self,
        ctx: &dyn PluginContext,
        code: &str,
        id: &str,
    ) -> Result<Option<TransformResult>, PluginError>;

    /// Called when module processing ends, with the build error if any
    async fn build_end(
        &self,
        ctx: &dyn PluginContext,
        error: Option<&(dyn StdError + Send + Sync)>,
    );

    /// Post-process one rendered chunk
    async fn render_chunk(
        &self,
        ctx: &dyn PluginContext,
        code: &str,
    ) -> Result<Option<TransformResult>, PluginError>;

    /// Called after all chunks are rendered, before they are written
    async fn generate_bundle(&self, ctx: &dyn PluginContext);
}
