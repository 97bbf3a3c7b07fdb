// Module resolver - lets relative imports omit the file extension

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path, folding `.` and `..` components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = path.components().peekable();
    let mut ret = if let Some(c @ Component::Prefix(..)) = components.peek().cloned() {
        components.next();
        PathBuf::from(c.as_os_str())
    } else {
        PathBuf::new()
    };

    for component in components {
        match component {
            Component::Prefix(..) => {}
            Component::RootDir => {
                ret.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                ret.pop();
            }
            Component::Normal(c) => {
                ret.push(c);
            }
        }
    }
    ret
}

/// Probes the extension table to turn `./foo` into `./foo.ts`
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    cwd: PathBuf,
    extensions: Vec<String>,
}

impl ModuleResolver {
    /// Create a resolver probing `extensions` in the given order
    ///
    /// Relative importers are taken relative to `cwd`.
    pub fn new<I, S>(cwd: impl Into<PathBuf>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cwd: cwd.into(),
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve a relative specifier against its importer
    ///
    /// The result is always absolute. Returns `None` when the specifier is not relative, there is no
    /// importer, or nothing on disk matches. `None` defers to the
    /// bundler's own resolution.
    pub fn resolve(&self, importee: &str, importer: Option<&str>) -> Option<PathBuf> {
        let importer = importer?;
        if !importee.starts_with('.') {
            return None;
        }

        let base = Path::new(importer).parent().unwrap_or_else(|| Path::new(""));
        let resolved = normalize_path(&self.cwd.join(base).join(importee));

        if let Some(file) = self.probe(&resolved, false) {
            return Some(file);
        }
        if resolved.is_dir() {
            return self.probe(&resolved, true);
        }
        None
    }

    fn probe(&self, resolved: &Path, index: bool) -> Option<PathBuf> {
        for ext in &self.extensions {
            let file = if index {
                resolved.join(format!("index{}", ext))
            } else {
                let mut raw = resolved.as_os_str().to_os_string();
                raw.push(ext);
                PathBuf::from(raw)
            };
            if file.exists() {
                tracing::trace!(path = %file.display(), "resolved extensionless import");
                return Some(file);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn resolver() -> ModuleResolver {
        ModuleResolver::new("/", [".js", ".jsx", ".ts", ".tsx"])
    }

    fn importer(dir: &Path) -> String {
        dir.join("main.ts").to_string_lossy().into_owned()
    }

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./c/../d")),
            PathBuf::from("/a/b/d")
        );
    }

    #[test]
    fn resolves_single_match() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("util.tsx"), "export {}").unwrap();

        let found = resolver().resolve("./util", Some(&importer(dir.path())));
        assert_eq!(found, Some(dir.path().join("util.tsx")));
    }

    #[test]
    fn probe_order_follows_table() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("util.ts"), "").unwrap();
        fs::write(dir.path().join("util.js"), "").unwrap();

        let found = resolver().resolve("./util", Some(&importer(dir.path())));
        assert_eq!(found, Some(dir.path().join("util.js")));
    }

    #[test]
    fn resolves_directory_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("components")).unwrap();
        fs::write(dir.path().join("components").join("index.ts"), "").unwrap();

        let found = resolver().resolve("./components", Some(&importer(dir.path())));
        assert_eq!(found, Some(dir.path().join("components").join("index.ts")));
    }

    #[test]
    fn file_wins_over_directory_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib").join("index.ts"), "").unwrap();
        fs::write(dir.path().join("lib.ts"), "").unwrap();

        let found = resolver().resolve("./lib", Some(&importer(dir.path())));
        assert_eq!(found, Some(dir.path().join("lib.ts")));
    }

    #[test]
    fn parent_relative_specifier() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("shared.ts"), "").unwrap();

        let found = resolver().resolve("../shared", Some(&importer(&dir.path().join("src"))));
        assert_eq!(found, Some(dir.path().join("shared.ts")));
    }

    #[test]
    fn relative_importer_resolves_from_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("proj");
        fs::create_dir_all(project.join("src")).unwrap();
        fs::write(dir.path().join("shared.ts"), "").unwrap();

        let r = ModuleResolver::new(&project, [".js", ".ts"]);
        let found = r.resolve("../../shared", Some("src/main.ts"));
        assert_eq!(found, Some(dir.path().join("shared.ts")));
        assert!(found.unwrap().is_absolute());
    }

    #[test]
    fn misses_return_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let r = resolver();
        assert_eq!(r.resolve("./missing", Some(&importer(dir.path()))), None);
        assert_eq!(r.resolve("./empty", Some(&importer(dir.path()))), None);
    }

    #[test]
    fn bare_or_entry_specifiers_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("react.ts"), "").unwrap();

        let r = resolver();
        assert_eq!(r.resolve("react", Some(&importer(dir.path()))), None);
        assert_eq!(r.resolve("./react", None), None);
    }
}
