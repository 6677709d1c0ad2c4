//! Source tree walk: discover eligible files, extract their units.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::extractor::extract_units;
use crate::unit::CodeUnit;

/// Which files the walker visits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalkConfig {
    /// File extensions (without the dot) treated as source.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Honor `.gitignore`, `.ignore` and git exclude files.
    #[serde(default)]
    pub respect_gitignore: bool,
    /// Descend into dot-files and dot-directories.
    #[serde(default = "default_include_hidden")]
    pub include_hidden: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["py".into()]
}

fn default_include_hidden() -> bool {
    true
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            respect_gitignore: false,
            include_hidden: default_include_hidden(),
        }
    }
}

impl WalkConfig {
    #[must_use]
    pub fn is_eligible(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|want| want.trim_start_matches('.') == ext)
            })
    }
}

/// Units collected from a tree, plus per-file bookkeeping.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub units: Vec<CodeUnit>,
    pub files_scanned: usize,
    pub files_skipped: usize,
    /// One line per skipped file: `path: reason`.
    pub errors: Vec<String>,
}

/// List eligible files under `root` in walk order (sorted by file name
/// within each directory).
///
/// Entries the walker cannot read are logged and left out.
///
/// # Errors
///
/// Returns [`IndexError::RootNotFound`] if `root` is not a directory.
pub fn discover_files(root: &Path, config: &WalkConfig) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(IndexError::RootNotFound(root.to_path_buf()));
    }

    let respect = config.respect_gitignore;
    let walker = ignore::WalkBuilder::new(root)
        .hidden(!config.include_hidden)
        .ignore(respect)
        .git_ignore(respect)
        .git_global(respect)
        .git_exclude(respect)
        .parents(respect)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file())
                    && config.is_eligible(entry.path())
                {
                    files.push(entry.into_path());
                }
            }
            Err(e) => tracing::warn!("walk error: {e}"),
        }
    }
    Ok(files)
}

/// Read and extract every file in order. A file that cannot be read or
/// parsed is skipped with a diagnostic; the walk always continues.
pub async fn extract_files(files: &[PathBuf]) -> WalkReport {
    let mut report = WalkReport::default();
    let total = files.len();

    for (i, path) in files.iter().enumerate() {
        report.files_scanned += 1;
        let filepath = path.to_string_lossy().into_owned();
        tracing::info!(
            file = %filepath,
            progress = format_args!("{}/{total}", i + 1),
            "parsing"
        );

        match extract_file(path, &filepath).await {
            Ok(units) => {
                tracing::debug!(file = %filepath, units = units.len(), "extracted");
                report.units.extend(units);
            }
            Err(e @ IndexError::Syntax { .. }) => {
                tracing::warn!("skipping {filepath} due to syntax error: {e}");
                report.files_skipped += 1;
                report.errors.push(format!("{filepath}: syntax error: {e}"));
            }
            Err(e) => {
                tracing::warn!("skipping {filepath}: {e}");
                report.files_skipped += 1;
                report.errors.push(format!("{filepath}: {e}"));
            }
        }
    }

    report
}

async fn extract_file(path: &Path, filepath: &str) -> Result<Vec<CodeUnit>> {
    let source = tokio::fs::read_to_string(path).await?;
    extract_units(&source, filepath)
}

/// Walk `root` and collect units from every eligible file.
///
/// # Errors
///
/// Returns [`IndexError::RootNotFound`] if `root` is not a directory.
/// Per-file failures are recorded in the report instead.
pub async fn collect_units(root: &Path, config: &WalkConfig) -> Result<WalkReport> {
    let files = discover_files(root, config)?;
    tracing::info!(total = files.len(), root = %root.display(), "walk complete");
    Ok(extract_files(&files).await)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn eligibility_by_extension() {
        let config = WalkConfig::default();
        assert!(config.is_eligible(Path::new("pkg/mod.py")));
        assert!(!config.is_eligible(Path::new("pkg/mod.pyc")));
        assert!(!config.is_eligible(Path::new("README.md")));
        assert!(!config.is_eligible(Path::new("py")));
    }

    #[test]
    fn eligibility_accepts_dotted_config() {
        let config = WalkConfig {
            extensions: vec![".pyi".into()],
            ..WalkConfig::default()
        };
        assert!(config.is_eligible(Path::new("stub.pyi")));
        assert!(!config.is_eligible(Path::new("real.py")));
    }

    #[test]
    fn discover_recurses_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "");
        write(dir.path(), "pkg/sub/b.py", "");
        write(dir.path(), "pkg/notes.txt", "");
        write(dir.path(), ".hidden/c.py", "");

        let files = discover_files(dir.path(), &WalkConfig::default()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&PathBuf::from("a.py")));
        assert!(names.contains(&PathBuf::from("pkg/sub/b.py")));
        assert!(names.contains(&PathBuf::from(".hidden/c.py")));
        assert!(files.iter().all(|p| p.starts_with(dir.path())));
    }

    #[test]
    fn discover_can_skip_hidden_and_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "keep.py", "");
        write(dir.path(), ".hidden/c.py", "");
        write(dir.path(), "build/gen.py", "");
        write(dir.path(), ".ignore", "build/\n");

        let config = WalkConfig {
            respect_gitignore: true,
            include_hidden: false,
            ..WalkConfig::default()
        };
        let files = discover_files(dir.path(), &config).unwrap();
        assert_eq!(files, vec![dir.path().join("keep.py")]);
    }

    #[test]
    fn discover_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover_files(&missing, &WalkConfig::default()),
            Err(IndexError::RootNotFound(_))
        ));
    }

    #[tokio::test]
    async fn collect_skips_bad_files_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a_bad.py", "def broken(:\n    pass\n");
        write(dir.path(), "b_good.py", "def ok():\n    return 1\n");
        fs::write(dir.path().join("c_binary.py"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let report = collect_units(dir.path(), &WalkConfig::default())
            .await
            .unwrap();
        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.files_skipped, 2);
        assert_eq!(report.units.len(), 1);
        assert_eq!(report.units[0].name, "ok");
        assert!(report.errors.iter().any(|e| e.contains("a_bad.py")));
        assert!(report.errors.iter().any(|e| e.contains("c_binary.py")));
    }

    #[tokio::test]
    async fn units_keep_file_order_and_walked_path() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "def first(): pass\n");
        write(dir.path(), "b.py", "class Second: pass\n");

        let report = collect_units(dir.path(), &WalkConfig::default())
            .await
            .unwrap();
        let names: Vec<_> = report.units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["first", "Second"]);
        assert_eq!(
            report.units[0].filepath,
            dir.path().join("a.py").to_string_lossy()
        );
    }

    #[tokio::test]
    async fn empty_tree_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README.md", "# nothing\n");
        let report = collect_units(dir.path(), &WalkConfig::default())
            .await
            .unwrap();
        assert_eq!(report.files_scanned, 0);
        assert!(report.units.is_empty());
    }
}
