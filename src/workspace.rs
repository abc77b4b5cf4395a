//! Per-request scratch directory.
//!
//! Everything a request writes lives under one `TempDir`, so dropping the
//! workspace (on success, on error, or when the request future is cancelled)
//! removes it all.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct RequestWorkspace {
    dir: TempDir,
    saved: usize,
}

impl RequestWorkspace {
    pub fn new(base_dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(base_dir)?;
        let dir = tempfile::Builder::new().prefix("pdftools-").tempdir_in(base_dir)?;
        tracing::debug!(path = %dir.path().display(), "Created request workspace");
        Ok(RequestWorkspace { dir, saved: 0 })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write uploaded bytes under a sanitized, collision-free name.
    pub fn save_upload(&mut self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        self.saved += 1;
        let path = self
            .dir
            .path()
            .join(format!("{:03}_{}", self.saved, sanitize_file_name(file_name)));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// A fresh path like `<prefix>_<random>.<extension>` inside the workspace
    pub fn output_path(&self, prefix: &str, extension: &str) -> PathBuf {
        self.dir.path().join(format!(
            "{}_{}.{}",
            prefix,
            uuid::Uuid::new_v4().simple(),
            extension
        ))
    }
}

impl Drop for RequestWorkspace {
    fn drop(&mut self) {
        tracing::debug!(path = %self.dir.path().display(), "Removing request workspace");
    }
}

/// Keep only the final path component and a conservative character set.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\my file.pdf"), "my_file.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name(".."), "upload");
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let mut ws = RequestWorkspace::new(base.path()).unwrap();
        let saved = ws.save_upload("a.pdf", b"%PDF").unwrap();
        let root = ws.path().to_path_buf();
        assert!(saved.starts_with(&root));
        assert!(saved.exists());

        drop(ws);
        assert!(!root.exists());
    }

    #[test]
    fn test_same_name_uploads_do_not_collide() {
        let base = tempfile::tempdir().unwrap();
        let mut ws = RequestWorkspace::new(base.path()).unwrap();
        let first = ws.save_upload("doc.pdf", b"1").unwrap();
        let second = ws.save_upload("doc.pdf", b"2").unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read(first).unwrap(), b"1");
    }

    #[test]
    fn test_output_paths_unique() {
        let base = tempfile::tempdir().unwrap();
        let ws = RequestWorkspace::new(base.path()).unwrap();
        let a = ws.output_path("merged", "pdf");
        let b = ws.output_path("merged", "pdf");
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "pdf");
    }
}
