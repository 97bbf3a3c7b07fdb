// Extension table - maps file extensions to esbuild loaders

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Language tag understood by the transform service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
}

impl Loader {
    pub fn as_str(&self) -> &'static str {
        match self {
            Loader::Js => "js",
            Loader::Jsx => "jsx",
            Loader::Ts => "ts",
            Loader::Tsx => "tsx",
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller-supplied override for one extension
///
/// Deserializes from a loader name or a boolean. `false` removes the
/// extension; `true` and any other value are accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LoaderOverride {
    Use(Loader),
    Flag(bool),
    Ignored(serde::de::IgnoredAny),
}

impl LoaderOverride {
    pub const DISABLED: LoaderOverride = LoaderOverride::Flag(false);
}

impl From<Loader> for LoaderOverride {
    fn from(loader: Loader) -> Self {
        LoaderOverride::Use(loader)
    }
}

/// Default extension mapping, in probe order
pub const DEFAULT_LOADERS: [(&str, Loader); 4] = [
    (".js", Loader::Js),
    (".jsx", Loader::Jsx),
    (".ts", Loader::Ts),
    (".tsx", Loader::Tsx),
];

/// Effective extension -> loader table
///
/// Built once from the defaults overlaid with overrides and immutable
/// afterwards. Iteration follows insertion order: defaults first, then
/// extensions added by overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionTable {
    entries: IndexMap<String, Loader>,
}

impl ExtensionTable {
    /// Build the table from the defaults and an ordered override map
    pub fn with_overrides(overrides: &IndexMap<String, LoaderOverride>) -> Self {
        let mut entries: IndexMap<String, Loader> = DEFAULT_LOADERS
            .iter()
            .map(|(ext, loader)| (ext.to_string(), *loader))
            .collect();

        for (ext, value) in overrides {
            match value {
                LoaderOverride::Use(loader) => {
                    entries.insert(ext.clone(), *loader);
                }
                LoaderOverride::Flag(false) => {
                    entries.shift_remove(ext);
                }
                LoaderOverride::Flag(true) | LoaderOverride::Ignored(_) => {}
            }
        }

        Self { entries }
    }

    /// Loader registered for an extension (with leading dot)
    pub fn get(&self, ext: &str) -> Option<Loader> {
        self.entries.get(ext).copied()
    }

    /// Loader for a file path, looked up by its final extension
    pub fn loader_for(&self, path: &Path) -> Option<Loader> {
        let ext = path.extension()?.to_str()?;
        self.get(&format!(".{}", ext))
    }

    pub fn contains(&self, ext: &str) -> bool {
        self.entries.contains_key(ext)
    }

    /// Extensions in probe order
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Regular expression matching any path ending in a known extension
    pub fn include_pattern(&self) -> String {
        let alternation = self
            .extensions()
            .map(|ext| regex::escape(ext.strip_prefix('.').unwrap_or(ext)))
            .collect::<Vec<_>>()
            .join("|");
        format!(r"\.({})$", alternation)
    }
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self::with_overrides(&IndexMap::new())
    }
}
