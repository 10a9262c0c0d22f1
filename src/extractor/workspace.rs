use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Scratch space for fragments and merged output.
pub trait Workspace {
    /// Returns a writable path that no other call on this workspace has
    /// returned. The suggested name is kept as the file name suffix.
    fn create_file_name(&self, suggested: &str) -> PathBuf;
}

/// Workspace backed by a temporary directory that is removed on drop.
pub struct TempWorkspace {
    dir: TempDir,
    counter: AtomicUsize,
}

impl TempWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("potgather-").tempdir()?;
        Ok(Self {
            dir,
            counter: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Workspace for TempWorkspace {
    fn create_file_name(&self, suggested: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let name = sanitize_file_name(suggested);
        self.dir.path().join(format!("{}_{}", n, name))
    }
}

pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim_end_matches(['.', ' ']).to_string();
    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}
