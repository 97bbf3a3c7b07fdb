// Configuration types for the esbuild plugin

use crate::loader::LoaderOverride;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Target used when neither the options nor tsconfig name one
pub const DEFAULT_TARGET: &str = "es2017";

/// Project configuration file looked up by default
pub const DEFAULT_TSCONFIG: &str = "tsconfig.json";

/// Service executable looked up in PATH by default
pub const DEFAULT_SERVICE_PROGRAM: &str = "esbuild-service";

/// Plugin options
///
/// Every field is optional. Deserializes from the camelCase option object
/// used by bundler configuration files.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginOptions {
    /// Extension overrides, applied in order on top of the defaults
    pub loaders: IndexMap<String, LoaderOverride>,

    /// Files to transform; replaces the extension-based default
    pub include: Option<FilterPattern>,

    /// Files to skip; replaces the `node_modules` default
    pub exclude: Option<FilterPattern>,

    pub jsx_factory: Option<String>,

    pub jsx_fragment: Option<String>,

    /// ECMAScript target, e.g. "es2020"
    pub target: Option<String>,

    /// Substitution table passed to the service verbatim
    pub define: Option<IndexMap<String, String>>,

    /// Request source maps from the service
    pub source_map: bool,

    /// Minify each rendered chunk
    pub minify: bool,

    /// Project configuration discovery
    pub tsconfig: TsconfigOption,

    /// Base directory for glob anchoring and relative warning paths
    pub cwd: Option<PathBuf>,

    /// How to start the transform service subprocess
    pub service: ServiceCommand,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            loaders: IndexMap::new(),
            include: None,
            exclude: None,
            jsx_factory: None,
            jsx_fragment: None,
            target: None,
            define: None,
            source_map: true,
            minify: false,
            tsconfig: TsconfigOption::Default,
            cwd: None,
            service: ServiceCommand::default(),
        }
    }
}

impl PluginOptions {
    /// Parse options from a JSON object
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Working directory, falling back to the process's
    pub fn resolved_cwd(&self) -> PathBuf {
        match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// Where to look for the project configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TsconfigOption {
    /// Search for `tsconfig.json`
    #[default]
    Default,
    /// Search for a file with this name (or check this absolute path)
    Named(String),
    /// Never read a project configuration file
    Disabled,
}

impl TsconfigOption {
    /// File name to search for, or `None` when discovery is off
    pub fn file_name(&self) -> Option<&str> {
        match self {
            TsconfigOption::Default => Some(DEFAULT_TSCONFIG),
            TsconfigOption::Named(name) => Some(name),
            TsconfigOption::Disabled => None,
        }
    }
}

impl<'de> Deserialize<'de> for TsconfigOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Flag(bool),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Name(name)) if !name.is_empty() => TsconfigOption::Named(name),
            Some(Raw::Flag(false)) => TsconfigOption::Disabled,
            _ => TsconfigOption::Default,
        })
    }
}

/// Command line of the transform service subprocess
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceCommand {
    /// Executable name (looked up in PATH) or path
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for ServiceCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_SERVICE_PROGRAM),
            args: vec![],
        }
    }
}

/// Path predicate supplied by the caller
pub type PathPredicate = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// An include or exclude matcher
///
/// Only glob lists come from deserialized options; regexes and predicates
/// are set programmatically.
#[derive(Clone)]
pub enum FilterPattern {
    Globs(Vec<String>),
    Regex(Regex),
    Predicate(PathPredicate),
}

impl FilterPattern {
    pub fn glob(pattern: impl Into<String>) -> Self {
        FilterPattern::Globs(vec![pattern.into()])
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(FilterPattern::Regex(Regex::new(pattern)?))
    }

    pub fn predicate(f: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        FilterPattern::Predicate(Arc::new(f))
    }
}

impl fmt::Debug for FilterPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterPattern::Globs(globs) => f.debug_tuple("Globs").field(globs).finish(),
            FilterPattern::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            FilterPattern::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for FilterPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(glob) => FilterPattern::Globs(vec![glob]),
            Raw::Many(globs) => FilterPattern::Globs(globs),
        })
    }
}
