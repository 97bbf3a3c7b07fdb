// Path filter - decides which module ids the plugin transforms

use crate::config::{FilterPattern, PathPredicate};
use crate::error::OptionsError;
use crate::loader::ExtensionTable;
use glob::{MatchOptions, Pattern};
use regex::Regex;
use std::path::Path;

const DEFAULT_EXCLUDE: &str = "node_modules";

// `*` stays within one path segment
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

enum Matcher {
    Globs(Vec<Pattern>),
    Regex(Regex),
    Predicate(PathPredicate),
}

impl Matcher {
    fn compile(pattern: &FilterPattern, cwd: &Path) -> Result<Self, OptionsError> {
        Ok(match pattern {
            FilterPattern::Globs(globs) => {
                let compiled = globs
                    .iter()
                    .map(|glob| {
                        let anchored = anchor_glob(glob, cwd);
                        Pattern::new(&anchored).map_err(|e| OptionsError::Glob {
                            pattern: glob.clone(),
                            message: e.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Matcher::Globs(compiled)
            }
            FilterPattern::Regex(re) => Matcher::Regex(re.clone()),
            FilterPattern::Predicate(f) => Matcher::Predicate(f.clone()),
        })
    }

    fn matches(&self, id: &Path, normalized: &str) -> bool {
        match self {
            Matcher::Globs(globs) => globs
                .iter()
                .any(|g| g.matches_with(normalized, GLOB_OPTIONS)),
            Matcher::Regex(re) => re.is_match(normalized),
            Matcher::Predicate(f) => f(id),
        }
    }
}

/// Relative globs are anchored at the working directory unless they
/// already start with `**`.
fn anchor_glob(glob: &str, cwd: &Path) -> String {
    if glob.starts_with("**") || Path::new(glob).is_absolute() {
        return glob.to_string();
    }
    let base = normalize_separators(&cwd.to_string_lossy());
    let glob = glob.strip_prefix("./").unwrap_or(glob);
    format!("{}/{}", base.trim_end_matches('/'), glob)
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Include/exclude predicate over module ids
///
/// Each side is either the caller's matcher or the default; a caller's
/// matcher replaces the default outright.
pub struct PathFilter {
    include: Matcher,
    exclude: Matcher,
}

impl PathFilter {
    /// Build the filter from optional caller matchers
    ///
    /// Default include accepts any path ending in an extension of `table`;
    /// default exclude rejects any path containing `node_modules`.
    pub fn new(
        table: &ExtensionTable,
        include: Option<&FilterPattern>,
        exclude: Option<&FilterPattern>,
        cwd: &Path,
    ) -> Result<Self, OptionsError> {
        let include = match include {
            Some(pattern) => Matcher::compile(pattern, cwd)?,
            None => Matcher::Regex(Regex::new(&table.include_pattern())?),
        };
        let exclude = match exclude {
            Some(pattern) => Matcher::compile(pattern, cwd)?,
            None => Matcher::Regex(Regex::new(&regex::escape(DEFAULT_EXCLUDE))?),
        };
        Ok(Self { include, exclude })
    }

    /// Whether the plugin should transform `id`
    pub fn accepts(&self, id: &str) -> bool {
        // virtual modules
        if id.contains('\0') {
            return false;
        }
        let normalized = normalize_separators(id);
        let path = Path::new(id);
        self.include.matches(path, &normalized) && !self.exclude.matches(path, &normalized)
    }
}
