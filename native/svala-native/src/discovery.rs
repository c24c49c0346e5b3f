//! Discovery Module
//!
//! Recursively scans a directory for component files.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Finds all files under `dir` whose extension is in `extensions`, sorted by path.
pub fn find_component_files(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if extensions.iter().any(|wanted| wanted == ext) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_finds_nested_components() {
        let dir = tempfile::tempdir().unwrap();
        let routes = dir.path().join("src/routes/about");
        fs::create_dir_all(&routes).unwrap();
        fs::write(dir.path().join("src/routes/+page.svelte"), "").unwrap();
        fs::write(routes.join("+page.svelte"), "").unwrap();
        fs::write(routes.join("+page.ts"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let files = find_component_files(dir.path(), &["svelte".to_string()]);
        assert_eq!(
            files,
            vec![
                dir.path().join("src/routes/+page.svelte"),
                routes.join("+page.svelte"),
            ]
        );
    }

    #[test]
    fn test_multiple_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("A.svelte"), "").unwrap();
        fs::write(dir.path().join("B.vue"), "").unwrap();
        let files = find_component_files(dir.path(), &["svelte".to_string(), "vue".to_string()]);
        assert_eq!(files.len(), 2);
    }
}
