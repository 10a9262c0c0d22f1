use crate::error::Result;
use crate::extractor::merger::TemplateMerger;
use crate::extractor::registry::ExtractorRegistry;
use crate::extractor::workspace::Workspace;
use crate::scanner::{FileList, SourceSpec};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One backend that received a non-empty share of the files.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub backend_id: String,
    pub claimed: FileList,
    /// `None` when the backend produced nothing.
    pub fragment: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// Merged template, `None` if there was nothing to extract.
    pub template: Option<PathBuf>,
    pub results: Vec<ExtractionResult>,
    /// Files no backend claimed.
    pub unmatched: FileList,
}

impl ExtractionOutcome {
    pub fn fragments(&self) -> impl Iterator<Item = &PathBuf> {
        self.results.iter().filter_map(|r| r.fragment.as_ref())
    }
}

/// The file partition `extract_all` would use, computed without running
/// any backend.
#[derive(Debug, Clone, Default)]
pub struct DispatchPlan {
    pub assignments: Vec<(String, FileList)>,
    pub unmatched: FileList,
}

impl DispatchPlan {
    pub fn claimed_count(&self) -> usize {
        self.assignments.iter().map(|(_, files)| files.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct DispatchProgress {
    pub backends_done: usize,
    pub total_backends: usize,
    pub current_backend: Option<String>,
    pub files_remaining: usize,
    pub start_time: Instant,
}

impl DispatchProgress {
    fn new(total_backends: usize, files_remaining: usize) -> Self {
        Self {
            backends_done: 0,
            total_backends,
            current_backend: None,
            files_remaining,
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Drives every registered backend over a file list and merges what
/// they produce.
///
/// Each backend sees only the files earlier backends did not claim, so a
/// file is processed at most once. Holds no state between calls.
pub struct ExtractionCoordinator<'a> {
    registry: &'a ExtractorRegistry,
    merger: &'a TemplateMerger,
}

impl<'a> ExtractionCoordinator<'a> {
    pub fn new(registry: &'a ExtractorRegistry, merger: &'a TemplateMerger) -> Self {
        Self { registry, merger }
    }

    pub fn plan(&self, files: &FileList) -> DispatchPlan {
        let mut remaining = files.clone();
        let mut plan = DispatchPlan::default();

        for backend in self.registry.iter() {
            if remaining.is_empty() {
                break;
            }

            let claimed = backend.filter_files(&remaining);
            if claimed.is_empty() {
                continue;
            }

            remaining = remaining.difference(&claimed);
            plan.assignments.push((backend.id().to_string(), claimed));
        }

        plan.unmatched = remaining;
        plan
    }

    pub fn extract_all(
        &self,
        workspace: &dyn Workspace,
        spec: &SourceSpec,
        files: &FileList,
        progress_callback: Option<&dyn Fn(&DispatchProgress)>,
    ) -> Result<ExtractionOutcome> {
        info!(
            target: "potgather::extractor",
            files = files.len(),
            "extracting from {} files",
            files.len()
        );

        let mut remaining = files.clone();
        let mut results = Vec::new();
        let mut progress = DispatchProgress::new(self.registry.len(), remaining.len());

        for backend in self.registry.iter() {
            let claimed = backend.filter_files(&remaining);
            progress.backends_done += 1;
            if claimed.is_empty() {
                continue;
            }

            debug!(
                target: "potgather::extractor",
                extractor = backend.id(),
                files = claimed.len(),
                "using extractor '{}' for {} files",
                backend.id(),
                claimed.len()
            );

            progress.current_backend = Some(backend.id().to_string());
            if let Some(callback) = progress_callback {
                callback(&progress);
            }

            let fragment = backend.extract(workspace, spec, &claimed);

            let exhausted = claimed.len() >= remaining.len();
            remaining = if exhausted {
                FileList::new()
            } else {
                remaining.difference(&claimed)
            };
            progress.files_remaining = remaining.len();

            results.push(ExtractionResult {
                backend_id: backend.id().to_string(),
                claimed,
                fragment,
            });

            if exhausted {
                break;
            }
        }

        progress.current_backend = None;
        if let Some(callback) = progress_callback {
            callback(&progress);
        }

        let fragments: Vec<PathBuf> = results
            .iter()
            .filter_map(|r| r.fragment.clone())
            .collect();

        info!(
            target: "potgather::extractor",
            unmatched = remaining.len(),
            fragments = fragments.len(),
            "extraction finished with {} unrecognized files and {} fragments",
            remaining.len(),
            fragments.len()
        );

        let template = self.merger.merge(workspace, &fragments)?;

        Ok(ExtractionOutcome {
            template,
            results,
            unmatched: remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PotGatherError;
    use crate::extractor::backend::Extractor;
    use crate::extractor::merger::tests::StubMergeTool;
    use crate::extractor::workspace::TempWorkspace;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;
    use std::sync::atomic::Ordering;

    type CallLog = Rc<RefCell<Vec<(String, Vec<String>)>>>;

    /// Claims files by suffix and records every invocation.
    struct StubExtractor {
        id: &'static str,
        suffixes: Vec<&'static str>,
        produces: bool,
        log: CallLog,
    }

    impl Extractor for StubExtractor {
        fn id(&self) -> &str {
            self.id
        }

        fn is_file_supported(&self, path: &str) -> bool {
            self.suffixes.iter().any(|s| path.ends_with(s))
        }

        fn extract(
            &self,
            workspace: &dyn Workspace,
            _spec: &SourceSpec,
            files: &FileList,
        ) -> Option<PathBuf> {
            self.log
                .borrow_mut()
                .push((self.id.to_string(), files.as_slice().to_vec()));
            if !self.produces {
                return None;
            }
            let fragment = workspace.create_file_name(&format!("{}.pot", self.id));
            std::fs::write(&fragment, files.as_slice().join("\n")).ok()?;
            Some(fragment)
        }
    }

    fn stub(id: &'static str, suffixes: &[&'static str], log: &CallLog) -> StubExtractor {
        StubExtractor {
            id,
            suffixes: suffixes.to_vec(),
            produces: true,
            log: log.clone(),
        }
    }

    fn list(paths: &[&str]) -> FileList {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn spec() -> SourceSpec {
        SourceSpec::in_current_dir::<&str>(vec![".".to_string()], &[])
    }

    #[test]
    fn test_two_backends_and_unmatched_file() {
        let log = CallLog::default();
        let registry = ExtractorRegistry::new()
            .with(stub("a", &[".c"], &log))
            .with(stub("b", &[".py"], &log));
        let (tool, merges) = StubMergeTool::new(false);
        let merger = TemplateMerger::new(tool);
        let workspace = TempWorkspace::new().unwrap();

        let coordinator = ExtractionCoordinator::new(&registry, &merger);
        let outcome = coordinator
            .extract_all(&workspace, &spec(), &list(&["a.c", "b.py", "c.txt"]), None)
            .unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                ("a".to_string(), vec!["a.c".to_string()]),
                ("b".to_string(), vec!["b.py".to_string()]),
            ]
        );
        assert_eq!(outcome.unmatched.as_slice(), &["c.txt"]);
        assert_eq!(outcome.fragments().count(), 2);
        assert_eq!(merges.load(Ordering::SeqCst), 1);
        assert!(outcome.template.unwrap().exists());
    }

    #[test]
    fn test_first_backend_claiming_everything_stops_dispatch() {
        let log = CallLog::default();
        let registry = ExtractorRegistry::new()
            .with(stub("all", &[""], &log))
            .with(stub("never", &[""], &log));
        let (tool, merges) = StubMergeTool::new(false);
        let merger = TemplateMerger::new(tool);
        let workspace = TempWorkspace::new().unwrap();

        let outcome = ExtractionCoordinator::new(&registry, &merger)
            .extract_all(&workspace, &spec(), &list(&["x.c", "y.py"]), None)
            .unwrap();

        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].0, "all");
        assert!(outcome.unmatched.is_empty());
        assert_eq!(outcome.results.len(), 1);
        // A single fragment is used as is.
        assert_eq!(merges.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.template, outcome.results[0].fragment);
    }

    #[test]
    fn test_overlapping_backends_first_registered_wins() {
        let log = CallLog::default();
        let registry = ExtractorRegistry::new()
            .with(stub("headers", &[".h"], &log))
            .with(stub("c-family", &[".c", ".h"], &log));
        let (tool, _) = StubMergeTool::new(false);
        let merger = TemplateMerger::new(tool);
        let workspace = TempWorkspace::new().unwrap();

        ExtractionCoordinator::new(&registry, &merger)
            .extract_all(&workspace, &spec(), &list(&["a.c", "a.h", "b.h"]), None)
            .unwrap();

        let log = log.borrow();
        assert_eq!(log[0], ("headers".to_string(), vec!["a.h".to_string(), "b.h".to_string()]));
        assert_eq!(log[1], ("c-family".to_string(), vec!["a.c".to_string()]));
    }

    #[test]
    fn test_backend_without_claims_is_not_invoked() {
        let log = CallLog::default();
        let registry = ExtractorRegistry::new()
            .with(stub("php", &[".php"], &log))
            .with(stub("c", &[".c"], &log));
        let (tool, _) = StubMergeTool::new(false);
        let merger = TemplateMerger::new(tool);
        let workspace = TempWorkspace::new().unwrap();

        let outcome = ExtractionCoordinator::new(&registry, &merger)
            .extract_all(&workspace, &spec(), &list(&["main.c"]), None)
            .unwrap();

        assert_eq!(log.borrow().len(), 1);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].backend_id, "c");
    }

    #[test]
    fn test_partition_is_complete() {
        let log = CallLog::default();
        let registry = ExtractorRegistry::new()
            .with(stub("c", &[".c", ".h"], &log))
            .with(stub("cxx", &[".h", ".cpp"], &log))
            .with(stub("py", &[".py"], &log));
        let (tool, _) = StubMergeTool::new(false);
        let merger = TemplateMerger::new(tool);
        let coordinator = ExtractionCoordinator::new(&registry, &merger);

        let files = list(&[
            "a.c", "a.h", "b.cpp", "c.py", "d.txt", "e/f.c", "e/g.cpp", "README",
        ]);
        let plan = coordinator.plan(&files);

        let mut seen = HashSet::new();
        let mut total = 0;
        for (_, claimed) in &plan.assignments {
            for file in claimed {
                assert!(seen.insert(file.clone()), "{} claimed twice", file);
                total += 1;
            }
        }
        for file in &plan.unmatched {
            assert!(seen.insert(file.clone()), "{} both claimed and unmatched", file);
            total += 1;
        }

        assert_eq!(total, files.len());
        assert_eq!(plan.claimed_count() + plan.unmatched.len(), files.len());
        assert_eq!(plan.unmatched.as_slice(), &["README", "d.txt"]);
        // Planning never runs a backend.
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_plan_matches_extract_all() {
        let log = CallLog::default();
        let registry = ExtractorRegistry::new()
            .with(stub("c", &[".c"], &log))
            .with(stub("py", &[".py"], &log));
        let (tool, _) = StubMergeTool::new(false);
        let merger = TemplateMerger::new(tool);
        let workspace = TempWorkspace::new().unwrap();
        let coordinator = ExtractionCoordinator::new(&registry, &merger);

        let files = list(&["a.c", "b.py", "c.rb", "d.c"]);
        let plan = coordinator.plan(&files);
        let outcome = coordinator
            .extract_all(&workspace, &spec(), &files, None)
            .unwrap();

        let executed: Vec<(String, FileList)> = outcome
            .results
            .iter()
            .map(|r| (r.backend_id.clone(), r.claimed.clone()))
            .collect();
        assert_eq!(plan.assignments, executed);
        assert_eq!(plan.unmatched, outcome.unmatched);
    }

    #[test]
    fn test_empty_fragments_are_not_merged() {
        let log = CallLog::default();
        let mut silent = stub("silent", &[".c"], &log);
        silent.produces = false;
        let registry = ExtractorRegistry::new()
            .with(silent)
            .with(stub("py", &[".py"], &log));
        let (tool, merges) = StubMergeTool::new(false);
        let merger = TemplateMerger::new(tool);
        let workspace = TempWorkspace::new().unwrap();

        let outcome = ExtractionCoordinator::new(&registry, &merger)
            .extract_all(&workspace, &spec(), &list(&["a.c", "b.py"]), None)
            .unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results[0].fragment.is_none());
        assert_eq!(outcome.fragments().count(), 1);
        assert_eq!(merges.load(Ordering::SeqCst), 0);
        assert!(outcome.template.is_some());
    }

    #[test]
    fn test_nothing_to_extract() {
        let log = CallLog::default();
        let registry = ExtractorRegistry::new().with(stub("c", &[".c"], &log));
        let (tool, merges) = StubMergeTool::new(false);
        let merger = TemplateMerger::new(tool);
        let workspace = TempWorkspace::new().unwrap();

        let outcome = ExtractionCoordinator::new(&registry, &merger)
            .extract_all(&workspace, &spec(), &list(&["notes.txt"]), None)
            .unwrap();

        assert!(outcome.template.is_none());
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.unmatched.len(), 1);
        assert_eq!(merges.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_merge_failure_is_reported() {
        let log = CallLog::default();
        let registry = ExtractorRegistry::new()
            .with(stub("c", &[".c"], &log))
            .with(stub("py", &[".py"], &log));
        let (tool, merges) = StubMergeTool::new(true);
        let merger = TemplateMerger::new(tool);
        let workspace = TempWorkspace::new().unwrap();

        let result = ExtractionCoordinator::new(&registry, &merger).extract_all(
            &workspace,
            &spec(),
            &list(&["a.c", "b.py"]),
            None,
        );

        assert!(matches!(result, Err(PotGatherError::MergeFailed { .. })));
        assert_eq!(merges.load(Ordering::SeqCst), 1);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_progress_callback_sees_each_invocation() {
        let log = CallLog::default();
        let registry = ExtractorRegistry::new()
            .with(stub("c", &[".c"], &log))
            .with(stub("py", &[".py"], &log));
        let (tool, _) = StubMergeTool::new(false);
        let merger = TemplateMerger::new(tool);
        let workspace = TempWorkspace::new().unwrap();

        let seen = RefCell::new(Vec::new());
        let callback = |p: &DispatchProgress| {
            seen.borrow_mut()
                .push((p.current_backend.clone(), p.files_remaining));
        };

        ExtractionCoordinator::new(&registry, &merger)
            .extract_all(&workspace, &spec(), &list(&["a.c", "b.py"]), Some(&callback))
            .unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                (Some("c".to_string()), 2),
                (Some("py".to_string()), 1),
                (None, 0),
            ]
        );
    }
}
