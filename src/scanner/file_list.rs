use serde::Serialize;
use std::cmp::Ordering;

/// Lexicographically sorted, duplicate-free list of source paths.
///
/// Every constructor sorts and deduplicates, so two lists built from the
/// same paths are equal regardless of the order the paths arrived in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileList {
    paths: Vec<String>,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_unsorted(mut paths: Vec<String>) -> Self {
        paths.sort();
        paths.dedup();
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.paths.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.paths
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths
            .binary_search_by(|p| p.as_str().cmp(path))
            .is_ok()
    }

    /// Elements of `self` that are not in `other`, in order.
    ///
    /// Both lists are sorted, so this is a single merge pass.
    pub fn difference(&self, other: &FileList) -> FileList {
        let mut remaining = Vec::with_capacity(self.len().saturating_sub(other.len()));
        let mut theirs = other.paths.iter().peekable();

        for path in &self.paths {
            loop {
                match theirs.peek() {
                    Some(next) if next.as_str() < path.as_str() => {
                        theirs.next();
                    }
                    _ => break,
                }
            }

            match theirs.peek().map(|next| next.as_str().cmp(path.as_str())) {
                Some(Ordering::Equal) => {
                    theirs.next();
                }
                _ => remaining.push(path.clone()),
            }
        }

        FileList { paths: remaining }
    }

    /// Keeps the elements accepted by `keep`, preserving order.
    pub fn filtered<F>(&self, mut keep: F) -> FileList
    where
        F: FnMut(&str) -> bool,
    {
        FileList {
            paths: self
                .paths
                .iter()
                .filter(|p| keep(p.as_str()))
                .cloned()
                .collect(),
        }
    }
}

impl FromIterator<String> for FileList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::from_unsorted(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

impl IntoIterator for FileList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}
