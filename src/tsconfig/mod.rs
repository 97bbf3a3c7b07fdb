// Project configuration discovery (tsconfig.json)

use crate::config::TsconfigOption;
use crate::error::TsconfigError;
use jsonc_parser::ParseOptions;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compiler fields the plugin reads from a project configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub jsx_factory: Option<String>,
    pub jsx_fragment: Option<String>,
    /// Lower-cased
    pub target: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TsconfigFile {
    #[serde(default)]
    compiler_options: Option<CompilerOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerOptions {
    jsx_factory: Option<String>,
    jsx_fragment_factory: Option<String>,
    target: Option<String>,
}

/// Parse the text of a project configuration file
///
/// Comments and trailing commas are allowed. Only `compilerOptions`
/// `jsxFactory`, `jsxFragmentFactory` and `target` are kept.
pub fn parse_tsconfig(path: &Path, text: &str) -> Result<ResolvedConfig, TsconfigError> {
    let parse_error = |message: String| TsconfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let value = jsonc_parser::parse_to_serde_value(text, &ParseOptions::default())
        .map_err(|e| parse_error(e.to_string()))?
        .ok_or_else(|| parse_error("file is empty".to_string()))?;

    if value.is_null() {
        return Ok(ResolvedConfig::default());
    }

    let file: TsconfigFile =
        serde_json::from_value(value).map_err(|e| parse_error(e.to_string()))?;
    let options = file.compiler_options.unwrap_or_default();

    Ok(ResolvedConfig {
        jsx_factory: options.jsx_factory,
        jsx_fragment: options.jsx_fragment_factory,
        target: options.target.map(|t| t.to_lowercase()),
    })
}

/// Find `name` in `start` or the nearest ancestor directory
///
/// An absolute `name` is checked as-is.
pub async fn find_up(start: &Path, name: &str) -> Option<PathBuf> {
    let named = Path::new(name);
    if named.is_absolute() {
        return is_file(named).await.then(|| named.to_path_buf());
    }

    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(named);
        if is_file(&candidate).await {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Loads the nearest project configuration for a directory
///
/// Lookups are memoized per (directory, file name) until [`clear`] is
/// called. The plugin clears the memo at the start of every build so that
/// rebuilds in watch mode see edited files.
///
/// [`clear`]: TsconfigLoader::clear
#[derive(Default)]
pub struct TsconfigLoader {
    cache: Mutex<HashMap<(PathBuf, String), Arc<ResolvedConfig>>>,
}

impl TsconfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the configuration that applies to files in `dir`
    ///
    /// Returns an empty config when discovery is disabled or no file is
    /// found.
    ///
    /// # Errors
    ///
    /// Returns `TsconfigError::Read` or `TsconfigError::Parse` when a file
    /// was found but cannot be read or parsed.
    pub async fn load(
        &self,
        dir: &Path,
        option: &TsconfigOption,
    ) -> Result<Arc<ResolvedConfig>, TsconfigError> {
        let Some(name) = option.file_name() else {
            return Ok(Arc::new(ResolvedConfig::default()));
        };

        let key = (dir.to_path_buf(), name.to_string());
        if let Some(hit) = self.cache.lock().get(&key) {
            tracing::trace!(dir = %dir.display(), "tsconfig cache hit");
            return Ok(hit.clone());
        }

        let config = match find_up(dir, name).await {
            Some(path) => {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|error| TsconfigError::Read {
                        path: path.clone(),
                        error,
                    })?;
                let config = parse_tsconfig(&path, &text)?;
                tracing::debug!(path = %path.display(), ?config, "loaded tsconfig");
                config
            }
            None => ResolvedConfig::default(),
        };

        let config = Arc::new(config);
        self.cache.lock().insert(key, config.clone());
        Ok(config)
    }

    /// Forget every memoized lookup
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}
