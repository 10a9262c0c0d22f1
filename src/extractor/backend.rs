use crate::extractor::workspace::Workspace;
use crate::scanner::{FileList, SourceSpec};
use std::path::PathBuf;

/// Whether file support is tested on the lowercased path.
pub const CASE_INSENSITIVE_FS: bool = cfg!(windows);

/// A format-specific string extraction backend.
///
/// Implementations must be deterministic for a given file set and must
/// not depend on the order they are invoked in relative to other
/// backends.
pub trait Extractor {
    /// Stable identifier, used in diagnostics and configuration.
    fn id(&self) -> &str;

    /// Tests a (possibly case-folded) path for support.
    fn is_file_supported(&self, path: &str) -> bool;

    /// Extracts strings from `files` into a fragment allocated from
    /// `workspace`. `None` means no fragment was produced, which covers
    /// both "nothing found" and a failed tool run.
    fn extract(
        &self,
        workspace: &dyn Workspace,
        spec: &SourceSpec,
        files: &FileList,
    ) -> Option<PathBuf>;

    /// The subset of `files` this backend claims.
    fn filter_files(&self, files: &FileList) -> FileList {
        claim_files(self, files, CASE_INSENSITIVE_FS)
    }
}

/// Selects the files `backend` supports. With `fold_case` the test runs
/// on the lowercased path; the returned list always keeps the original
/// spelling so tools receive the real file names.
pub fn claim_files<E: Extractor + ?Sized>(backend: &E, files: &FileList, fold_case: bool) -> FileList {
    files.filtered(|path| {
        if fold_case {
            backend.is_file_supported(&path.to_lowercase())
        } else {
            backend.is_file_supported(path)
        }
    })
}

/// Extension of the last path component as written, if any.
pub fn file_extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SuffixExtractor(&'static str);

    impl Extractor for SuffixExtractor {
        fn id(&self) -> &str {
            "suffix"
        }

        fn is_file_supported(&self, path: &str) -> bool {
            path.ends_with(self.0)
        }

        fn extract(&self, _: &dyn Workspace, _: &SourceSpec, _: &FileList) -> Option<PathBuf> {
            None
        }
    }

    fn list(paths: &[&str]) -> FileList {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_claim_without_folding() {
        let files = list(&["A.C", "b.c", "c.py"]);
        let claimed = claim_files(&SuffixExtractor(".c"), &files, false);
        assert_eq!(claimed.as_slice(), &["b.c"]);
    }

    #[test]
    fn test_claim_with_folding_keeps_original_case() {
        let files = list(&["Src/A.C", "b.c", "c.py"]);
        let claimed = claim_files(&SuffixExtractor(".c"), &files, true);
        assert_eq!(claimed.as_slice(), &["Src/A.C", "b.c"]);
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("src/main.c"), Some("c"));
        assert_eq!(file_extension("src/archive.tar.gz"), Some("gz"));
        assert_eq!(file_extension("src/Widget.C"), Some("C"));
        assert_eq!(file_extension("src/.hidden"), None);
        assert_eq!(file_extension("Makefile"), None);
        assert_eq!(file_extension("dir.d/Makefile"), None);
    }
}
