// EsbuildPlugin - transforms modules and chunks through the esbuild service

use super::warnings::print_warnings;
use super::{Plugin, PluginContext, TransformResult};
use crate::config::{PluginOptions, DEFAULT_TARGET};
use crate::error::{PluginError, ServiceError};
use crate::filter::PathFilter;
use crate::loader::{ExtensionTable, Loader};
use crate::resolve::ModuleResolver;
use crate::service::{ProcessLauncher, ServiceLauncher, ServiceManager, TransformOptions};
use crate::tsconfig::{ResolvedConfig, TsconfigLoader};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings fixed for the duration of one build
///
/// Computed at `build_start` before any module is transformed, and read by
/// the chunk minify pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSnapshot {
    pub target: String,
}

/// Treat empty strings like absent options
fn non_empty(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|v| !v.is_empty())
}

/// Name the module on compile errors the service left unattributed
fn attribute(error: ServiceError, id: &str) -> ServiceError {
    match error {
        ServiceError::Compile { mut errors } => {
            for message in errors.iter_mut().filter(|m| m.file.is_none()) {
                message.file = Some(id.to_string());
            }
            ServiceError::Compile { errors }
        }
        other => other,
    }
}

/// Merge explicit options over the project configuration
///
/// Explicit options win, then tsconfig, then the built-in target. JSX
/// factories have no built-in default.
pub fn merge_options(
    options: &PluginOptions,
    config: &ResolvedConfig,
    loader: Loader,
    id: &str,
) -> TransformOptions {
    TransformOptions {
        loader,
        target: non_empty(&options.target)
            .or(non_empty(&config.target))
            .cloned()
            .unwrap_or_else(|| DEFAULT_TARGET.to_string()),
        jsx_factory: non_empty(&options.jsx_factory)
            .or(non_empty(&config.jsx_factory))
            .cloned(),
        jsx_fragment: non_empty(&options.jsx_fragment)
            .or(non_empty(&config.jsx_fragment))
            .cloned(),
        define: options.define.clone(),
        sourcemap: options.source_map,
        sourcefile: Some(id.to_string()),
        minify: false,
    }
}

/// The esbuild bundler plugin
///
/// Holds the one transform service for its bundler. The service starts at
/// `build_start`; it is stopped after `generate_bundle`, or at `build_end`
/// when the build failed, except in watch mode where it lives until
/// [`close`](EsbuildPlugin::close).
pub struct EsbuildPlugin {
    options: PluginOptions,
    cwd: PathBuf,
    table: ExtensionTable,
    filter: PathFilter,
    resolver: ModuleResolver,
    tsconfig: TsconfigLoader,
    service: ServiceManager,
    snapshot: RwLock<Arc<BuildSnapshot>>,
}

impl EsbuildPlugin {
    /// Create a plugin that spawns the service described by `options.service`
    ///
    /// The service itself is not started until `build_start`.
    ///
    /// # Errors
    ///
    /// Returns `PluginError::Options` if an include or exclude pattern does
    /// not compile.
    pub fn new(options: PluginOptions) -> Result<Self, PluginError> {
        let launcher = Arc::new(ProcessLauncher::new(options.service.clone()));
        Self::with_launcher(options, launcher)
    }

    /// Create a plugin with a custom service launcher
    ///
    /// # Errors
    ///
    /// Same as [`new`](EsbuildPlugin::new).
    pub fn with_launcher(
        options: PluginOptions,
        launcher: Arc<dyn ServiceLauncher>,
    ) -> Result<Self, PluginError> {
        let cwd = options.resolved_cwd();
        let table = ExtensionTable::with_overrides(&options.loaders);
        let filter = PathFilter::new(
            &table,
            options.include.as_ref(),
            options.exclude.as_ref(),
            &cwd,
        )?;
        let resolver = ModuleResolver::new(&cwd, table.extensions());
        let snapshot = BuildSnapshot {
            target: non_empty(&options.target)
                .cloned()
                .unwrap_or_else(|| DEFAULT_TARGET.to_string()),
        };

        Ok(Self {
            options,
            cwd,
            table,
            filter,
            resolver,
            tsconfig: TsconfigLoader::new(),
            service: ServiceManager::new(launcher),
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    pub fn service(&self) -> &ServiceManager {
        &self.service
    }

    /// Settings of the current (or last) build
    pub fn snapshot(&self) -> Arc<BuildSnapshot> {
        self.snapshot.read().clone()
    }

    /// Release the service when the bundler discards the plugin
    pub async fn close(&self) {
        self.service.stop().await;
    }

    async fn build_snapshot(&self) -> BuildSnapshot {
        if let Some(target) = non_empty(&self.options.target) {
            return BuildSnapshot {
                target: target.clone(),
            };
        }
        let target = match self.tsconfig.load(&self.cwd, &self.options.tsconfig).await {
            Ok(config) => config.target.clone(),
            Err(e) => {
                // the same error resurfaces when a module under cwd is transformed
                tracing::warn!(error = %e, "could not read project tsconfig");
                None
            }
        };
        BuildSnapshot {
            target: target.unwrap_or_else(|| DEFAULT_TARGET.to_string()),
        }
    }

    /// Transform options for one module, after tsconfig discovery
    pub async fn effective_options(
        &self,
        id: &str,
        loader: Loader,
    ) -> Result<TransformOptions, PluginError> {
        let dir = Path::new(id).parent().unwrap_or_else(|| Path::new(""));
        let config = self.tsconfig.load(dir, &self.options.tsconfig).await?;
        Ok(merge_options(&self.options, &config, loader, id))
    }
}

#[async_trait]
impl Plugin for EsbuildPlugin {
    fn name(&self) -> &'static str {
        "esbuild"
    }

    async fn build_start(&self, _ctx: &dyn PluginContext) -> Result<(), PluginError> {
        self.service.start().await?;
        self.tsconfig.clear();
        let snapshot = self.build_snapshot().await;
        tracing::debug!(es_target = %snapshot.target, "build started");
        *self.snapshot.write() = Arc::new(snapshot);
        Ok(())
    }

    async fn resolve_id(
        &self,
        importee: &str,
        importer: Option<&str>,
    ) -> Result<Option<PathBuf>, PluginError> {
        Ok(self.resolver.resolve(importee, importer))
    }

    async fn transform(
        &self,
        ctx: &dyn PluginContext,
        code: &str,
        id: &str,
    ) -> Result<Option<TransformResult>, PluginError> {
        if !self.filter.accepts(id) {
            return Ok(None);
        }
        let Some(loader) = self.table.loader_for(Path::new(id)) else {
            return Ok(None);
        };
        let Some(service) = self.service.current().await else {
            return Ok(None);
        };

        let options = self.effective_options(id, loader).await?;
        tracing::trace!(id, %loader, es_target = %options.target, "transforming");

        let output = service
            .transform(code, &options)
            .await
            .map_err(|e| attribute(e, id))?;
        print_warnings(ctx, id, &self.cwd, &output.warnings);

        Ok(output.code.map(|code| TransformResult {
            code,
            map: output.map,
        }))
    }

    async fn build_end(
        &self,
        ctx: &dyn PluginContext,
        error: Option<&(dyn StdError + Send + Sync)>,
    ) {
        if let Some(error) = error {
            tracing::debug!(%error, watch = ctx.meta().watch_mode, "build failed");
            if !ctx.meta().watch_mode {
                self.service.stop().await;
            }
        }
    }

    async fn render_chunk(
        &self,
        ctx: &dyn PluginContext,
        code: &str,
    ) -> Result<Option<TransformResult>, PluginError> {
        if !self.options.minify {
            return Ok(None);
        }
        let Some(service) = self.service.current().await else {
            return Ok(None);
        };

        let options = TransformOptions::minify(self.snapshot().target.clone());
        match service.transform(code, &options).await {
            Ok(output) => Ok(output.code.map(|code| TransformResult {
                code,
                map: output.map,
            })),
            Err(e) => {
                tracing::warn!(error = %e, "chunk minification failed");
                ctx.warn(format!("[esbuild] minify failed, chunk left unchanged: {}", e));
                Ok(None)
            }
        }
    }

    async fn generate_bundle(&self, ctx: &dyn PluginContext) {
        if !ctx.meta().watch_mode {
            self.service.stop().await;
        }
    }
}
