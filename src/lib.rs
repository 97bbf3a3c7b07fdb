// Bundler plugin that drives a persistent esbuild transform service
//
// The plugin lets relative imports omit extensions, transforms TypeScript
// and JSX modules through one long-lived service process per bundler, and
// can minify rendered chunks with the same service.

pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod plugin;
pub mod resolve;
pub mod service;
pub mod tsconfig;

pub use config::{FilterPattern, PluginOptions, ServiceCommand, TsconfigOption};
pub use error::{OptionsError, PluginError, ServiceError, TsconfigError};
pub use loader::{ExtensionTable, Loader, LoaderOverride};
pub use plugin::{
    BuildMeta, BuildSnapshot, EsbuildPlugin, Plugin, PluginContext, TransformResult,
};
pub use service::{
    ProcessLauncher, ServiceLauncher, ServiceManager, TransformOptions, TransformOutput,
    TransformService,
};

/// Create the plugin with the subprocess service described by `options`
pub fn esbuild(options: PluginOptions) -> Result<EsbuildPlugin, PluginError> {
    EsbuildPlugin::new(options)
}
