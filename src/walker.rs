//! @ai:module:intent Enumerate candidate source files under a root with glob filters
//! @ai:module:layer infrastructure
//! @ai:module:public_api FileFilter, for_each_candidate_file, DEFAULT_INCLUDE
//! @ai:module:depends_on error
//! @ai:module:stateless true

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Include glob used when none is given.
pub const DEFAULT_INCLUDE: &str = "**/*.java";

/// @ai:intent Compiled include/exclude glob sets over root-relative paths
#[derive(Debug, Clone)]
pub struct FileFilter {
    includes: GlobSet,
    excludes: GlobSet,
}

impl FileFilter {
    /// @ai:intent Compile include and exclude patterns
    /// @ai:pre every pattern is valid glob syntax
    /// @ai:post empty includes fall back to DEFAULT_INCLUDE
    /// @ai:effects pure
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self> {
        let includes = if includes.is_empty() {
            build_glob_set(&[DEFAULT_INCLUDE.to_string()])?
        } else {
            build_glob_set(includes)?
        };
        Ok(Self {
            includes,
            excludes: build_glob_set(excludes)?,
        })
    }

    /// @ai:intent Decide whether a file is a candidate; exclude wins over include
    pub fn accepts_file(&self, relative: &Path) -> bool {
        self.includes.is_match(relative) && !self.excludes.is_match(relative)
    }

    /// @ai:intent Decide whether a whole directory is pruned
    /// @ai:example ("**/generated/**", "src/generated") -> true
    pub fn prunes_dir(&self, relative: &Path) -> bool {
        if relative.as_os_str().is_empty() {
            return false;
        }
        self.excludes.is_match(relative) || self.excludes.is_match(relative.join("_"))
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| Error::InvalidGlob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }

    builder.build().map_err(|e| Error::InvalidGlob {
        pattern: "<combined>".to_string(),
        message: e.to_string(),
    })
}

/// @ai:intent List candidate files under a root in lexicographic order
/// @ai:pre root exists
/// @ai:post excluded directories are never descended into
/// @ai:effects fs:read
pub fn for_each_candidate_file(root: &Path, filter: &FileFilter) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(Error::NotFound(root.to_path_buf()));
    }

    if root.is_file() {
        let name = root.file_name().map(PathBuf::from).unwrap_or_default();
        return Ok(if filter.accepts_file(&name) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let relative = |path: &Path| path.strip_prefix(root).unwrap_or(path).to_path_buf();

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && filter.prunes_dir(&relative(e.path()))));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && filter.accepts_file(&relative(entry.path())) {
            files.push(entry.into_path());
        }
    }

    tracing::debug!(root = %root.display(), count = files.len(), "collected candidate files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in [
            "src/main/java/com/acme/WidgetRepository.java",
            "src/main/java/com/acme/Widget.java",
            "src/main/java/com/acme/generated/Stub.java",
            "src/main/resources/application.properties",
            "build/Copy.java",
        ] {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "class X {}").unwrap();
        }
        dir
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_default_include_is_sorted() {
        let dir = tree();
        let filter = FileFilter::new(&[], &[]).unwrap();
        let files = for_each_candidate_file(dir.path(), &filter).unwrap();
        assert_eq!(
            names(dir.path(), &files),
            vec![
                "build/Copy.java",
                "src/main/java/com/acme/Widget.java",
                "src/main/java/com/acme/WidgetRepository.java",
                "src/main/java/com/acme/generated/Stub.java",
            ]
        );
    }

    #[test]
    fn test_excluded_directories_are_pruned() {
        let dir = tree();
        let filter = FileFilter::new(
            &["src/**/*.java".to_string()],
            &["**/generated/**".to_string(), "**/Widget.java".to_string()],
        )
        .unwrap();
        let files = for_each_candidate_file(dir.path(), &filter).unwrap();
        assert_eq!(
            names(dir.path(), &files),
            vec!["src/main/java/com/acme/WidgetRepository.java"]
        );
        assert!(filter.prunes_dir(Path::new("src/main/java/com/acme/generated")));
        assert!(!filter.prunes_dir(Path::new("src/main/java")));
    }

    #[test]
    fn test_single_file_root() {
        let dir = tree();
        let file = dir.path().join("build/Copy.java");
        let filter = FileFilter::new(&[], &[]).unwrap();
        assert_eq!(for_each_candidate_file(&file, &filter).unwrap(), vec![file]);
    }

    #[test]
    fn test_invalid_glob_and_missing_root() {
        assert!(matches!(
            FileFilter::new(&["src/[".to_string()], &[]),
            Err(Error::InvalidGlob { .. })
        ));
        let filter = FileFilter::new(&[], &[]).unwrap();
        assert!(matches!(
            for_each_candidate_file(Path::new("/definitely/not/here"), &filter),
            Err(Error::NotFound(_))
        ));
    }
}
