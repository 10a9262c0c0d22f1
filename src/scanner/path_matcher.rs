use glob::{MatchOptions, Pattern};
use tracing::warn;

/// Glob options shared by every wildcard pattern: `*` crosses `/`,
/// case sensitivity follows the platform's filesystem.
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: !cfg!(windows),
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Returns true if the raw text uses glob metacharacters.
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

#[derive(Debug, Clone)]
pub enum PathPattern {
    Wildcard(Pattern),
    /// Matches the path itself and everything below it.
    ExactOrPrefix(String),
}

impl PathPattern {
    pub fn new(raw: &str) -> Self {
        if is_wildcard(raw) {
            match Pattern::new(raw) {
                Ok(pattern) => return PathPattern::Wildcard(pattern),
                Err(err) => {
                    warn!(
                        target: "potgather::scanner",
                        pattern = raw,
                        error = %err,
                        "malformed wildcard, falling back to literal path matching"
                    );
                }
            }
        }

        let trimmed = raw.trim_end_matches('/');
        let literal = if trimmed.is_empty() { raw } else { trimmed };
        PathPattern::ExactOrPrefix(literal.to_string())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, PathPattern::Wildcard(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            PathPattern::Wildcard(pattern) => pattern.as_str(),
            PathPattern::ExactOrPrefix(path) => path,
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            PathPattern::Wildcard(pattern) => pattern.matches_with(candidate, MATCH_OPTIONS),
            PathPattern::ExactOrPrefix(path) => {
                candidate == path
                    || candidate
                        .strip_prefix(path.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<PathPattern>,
}

impl ExclusionSet {
    /// Blank entries, such as the one a trailing comma leaves behind, are
    /// dropped: as a prefix they would match every path.
    pub fn new<S: AsRef<str>>(raw_patterns: &[S]) -> Self {
        Self {
            patterns: raw_patterns
                .iter()
                .map(|p| p.as_ref())
                .filter(|p| !p.trim().is_empty())
                .map(PathPattern::new)
                .collect(),
        }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
