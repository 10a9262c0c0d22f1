use crate::error::{PotGatherError, Result};
use crate::scanner::file_list::FileList;
use crate::scanner::path_matcher::ExclusionSet;
use std::collections::HashSet;
use std::path::{Component, Path};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// The only base path the collector knows how to resolve against.
pub const CURRENT_DIR: &str = ".";

/// What to scan, relative to the working directory.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub base_path: String,
    pub search_paths: Vec<String>,
    pub excluded_paths: ExclusionSet,
}

impl SourceSpec {
    pub fn new<S: AsRef<str>>(base_path: &str, search_paths: Vec<String>, excluded: &[S]) -> Self {
        Self {
            base_path: base_path.to_string(),
            search_paths,
            excluded_paths: ExclusionSet::new(excluded),
        }
    }

    /// Sources resolved against the working directory.
    pub fn in_current_dir<S: AsRef<str>>(search_paths: Vec<String>, excluded: &[S]) -> Self {
        Self::new(CURRENT_DIR, search_paths, excluded)
    }

    pub fn ensure_supported_base_path(&self) -> Result<()> {
        if self.base_path.trim() != CURRENT_DIR {
            return Err(PotGatherError::UnsupportedBasePath {
                path: self.base_path.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub files: FileList,
    /// Directories actually descended into, roots included.
    pub visited_dirs: usize,
    /// Search-path entries that contributed no files.
    pub empty_entries: Vec<String>,
}

pub struct FileCollector {
    follow_links: bool,
}

impl FileCollector {
    pub fn new() -> Self {
        Self {
            follow_links: false,
        }
    }

    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn collect(&self, spec: &SourceSpec) -> Result<CollectionReport> {
        spec.ensure_supported_base_path()?;

        let exclusions = &spec.excluded_paths;
        let mut collected = Vec::new();
        let mut report = CollectionReport::default();
        let mut seen_roots = HashSet::new();

        for raw_entry in &spec.search_paths {
            let entry = normalize_search_path(raw_entry);
            if !seen_roots.insert(entry.clone()) {
                debug!(target: "potgather::scanner", path = %raw_entry, "search path already scanned");
                continue;
            }

            if Path::new(&entry).is_file() {
                if exclusions.is_excluded(&entry) {
                    debug!(
                        target: "potgather::scanner",
                        path = %entry,
                        "no files found in '{}' (excluded)",
                        entry
                    );
                    report.empty_entries.push(raw_entry.clone());
                    continue;
                }
                collected.push(entry);
                continue;
            }

            let found = self.collect_dir(&entry, exclusions, &mut collected, &mut report.visited_dirs);
            if found == 0 {
                debug!(
                    target: "potgather::scanner",
                    path = %entry,
                    "no files found in '{}'",
                    entry
                );
                report.empty_entries.push(raw_entry.clone());
            }
        }

        // Directory enumeration order differs between filesystems; the
        // sorted order is what ends up in the template.
        report.files = FileList::from_unsorted(collected);

        debug!(
            target: "potgather::scanner",
            files = report.files.len(),
            visited_dirs = report.visited_dirs,
            "collection finished"
        );

        Ok(report)
    }

    fn collect_dir(
        &self,
        root: &str,
        exclusions: &ExclusionSet,
        output: &mut Vec<String>,
        visited_dirs: &mut usize,
    ) -> usize {
        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                match compose_path(root, e.path()) {
                    Some(path) => !exclusions.is_excluded(&path),
                    None => false,
                }
            });

        let mut found = 0;

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    // Unreadable directories are skipped, the rest of the
                    // tree is still collected.
                    if err.depth() == 0 {
                        debug!(target: "potgather::scanner", path = root, error = %err, "cannot open directory");
                    } else {
                        warn!(target: "potgather::scanner", error = %err, "skipping unreadable entry");
                    }
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                *visited_dirs += 1;
                continue;
            }

            if !is_regular_file(&entry) {
                continue;
            }

            match compose_path(root, entry.path()) {
                Some(path) => {
                    output.push(path);
                    found += 1;
                }
                None => {
                    warn!(
                        target: "potgather::scanner",
                        path = %entry.path().display(),
                        "skipping file with non UTF-8 name"
                    );
                }
            }
        }

        found
    }
}

impl Default for FileCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn is_regular_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

/// Lexically cleans a search path: repeated separators and `.` segments
/// go away and `name/..` pairs cancel out, so two spellings of the same
/// directory compare equal. An empty relative result means the working
/// directory.
pub fn normalize_search_path(raw: &str) -> String {
    let absolute = raw.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            name => parts.push(name),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        CURRENT_DIR.to_string()
    } else {
        joined
    }
}

/// Builds the path string reported for `entry_path` found under `root`:
/// the bare relative name when `root` is `.`, otherwise `root/relative`.
pub fn compose_path(root: &str, entry_path: &Path) -> Option<String> {
    let relative = entry_path.strip_prefix(root).unwrap_or(entry_path);

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            other => parts.push(other.as_os_str().to_str()?),
        }
    }
    let relative = parts.join("/");

    Some(if relative.is_empty() {
        root.to_string()
    } else if root == CURRENT_DIR {
        relative
    } else if root.ends_with('/') {
        format!("{}{}", root, relative)
    } else {
        format!("{}/{}", root, relative)
    })
}
