use crate::config::{ExtractorConfig, FILES_FROM_PLACEHOLDER, OUTPUT_PLACEHOLDER};
use crate::error::Result;
use crate::extractor::backend::{file_extension, Extractor, CASE_INSENSITIVE_FS};
use crate::extractor::tool::ToolInvocation;
use crate::extractor::workspace::Workspace;
use crate::scanner::path_matcher::MATCH_OPTIONS;
use crate::scanner::{FileList, SourceSpec};
use glob::Pattern;
use std::ffi::OsString;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Backend that runs an external extraction program (usually `xgettext`)
/// over the claimed files.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    id: String,
    extensions: Vec<String>,
    patterns: Vec<Pattern>,
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandExtractor {
    pub fn new<S: Into<String>, P: Into<String>>(id: S, program: P) -> Self {
        Self {
            id: id.into(),
            extensions: Vec::new(),
            patterns: Vec::new(),
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        let mut extractor = Self::new(config.id.clone(), config.program.clone())
            .with_args(config.args.iter().cloned());
        for extension in &config.extensions {
            extractor = extractor.with_extension(extension.as_str());
        }
        for pattern in &config.patterns {
            extractor = extractor.with_pattern(pattern);
        }
        extractor
    }

    /// Extensions are stored as written, without the leading dot. Case is
    /// only ignored on case-insensitive filesystems.
    pub fn with_extension<S: AsRef<str>>(mut self, extension: S) -> Self {
        let ext = extension.as_ref().trim_start_matches('.').to_string();
        if !ext.is_empty() && !self.extensions.contains(&ext) {
            self.extensions.push(ext);
        }
        self
    }

    /// Adds a file-name wildcard such as `*.desktop.in`. Invalid patterns
    /// are skipped with a warning.
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        match Pattern::new(pattern) {
            Ok(compiled) => self.patterns.push(compiled),
            Err(err) => {
                warn!(
                    target: "potgather::extractor",
                    extractor = %self.id,
                    pattern,
                    error = %err,
                    "ignoring invalid file pattern"
                );
            }
        }
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// The tool invocation for one run, with placeholders substituted.
    pub fn invocation(&self, output: &Path, files_from: &Path) -> ToolInvocation {
        let args = self.args.iter().map(|arg| substitute(arg, output, files_from));
        ToolInvocation::new(self.program.clone())
            .args(args)
            .with_timeout(self.timeout)
    }

    fn write_file_list(&self, path: &Path, files: &FileList) -> Result<()> {
        let mut writer = BufWriter::new(fs::File::create(path)?);
        for file in files {
            writeln!(writer, "{}", file)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn run(&self, workspace: &dyn Workspace, files: &FileList) -> Result<Option<PathBuf>> {
        let output = workspace.create_file_name(&format!("{}.pot", self.id));
        let files_from = workspace.create_file_name(&format!("{}.files", self.id));
        self.write_file_list(&files_from, files)?;

        let result = self.invocation(&output, &files_from).run()?;
        if !result.stderr.trim().is_empty() {
            debug!(
                target: "potgather::extractor",
                extractor = %self.id,
                stderr = %result.stderr.trim(),
                "extractor reported warnings"
            );
        }

        let produced = fs::metadata(&output).map(|m| m.len() > 0).unwrap_or(false);
        Ok(produced.then_some(output))
    }
}

impl Extractor for CommandExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_file_supported(&self, path: &str) -> bool {
        if let Some(ext) = file_extension(path) {
            let matched = if CASE_INSENSITIVE_FS {
                self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
            } else {
                self.extensions.iter().any(|e| e == ext)
            };
            if matched {
                return true;
            }
        }

        if self.patterns.is_empty() {
            return false;
        }

        let name = path.rsplit('/').next().unwrap_or(path);
        self.patterns
            .iter()
            .any(|p| p.matches_with(name, MATCH_OPTIONS))
    }

    fn extract(
        &self,
        workspace: &dyn Workspace,
        _spec: &SourceSpec,
        files: &FileList,
    ) -> Option<PathBuf> {
        match self.run(workspace, files) {
            Ok(Some(fragment)) => Some(fragment),
            Ok(None) => {
                debug!(
                    target: "potgather::extractor",
                    extractor = %self.id,
                    "extractor produced no output"
                );
                None
            }
            Err(err) => {
                warn!(
                    target: "potgather::extractor",
                    extractor = %self.id,
                    files = files.len(),
                    error = %err,
                    "extractor failed, continuing without its strings"
                );
                None
            }
        }
    }
}

fn substitute(arg: &str, output: &Path, files_from: &Path) -> OsString {
    if arg == OUTPUT_PLACEHOLDER {
        return output.as_os_str().to_os_string();
    }
    if arg == FILES_FROM_PLACEHOLDER {
        return files_from.as_os_str().to_os_string();
    }

    arg.replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy())
        .replace(FILES_FROM_PLACEHOLDER, &files_from.to_string_lossy())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::workspace::TempWorkspace;

    fn list(paths: &[&str]) -> FileList {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_extension_matching() {
        let extractor = CommandExtractor::new("c", "xgettext")
            .with_extension("c")
            .with_extension(".h")
            .with_extension("h");

        assert_eq!(extractor.extensions(), &["c", "h"]);
        assert!(extractor.is_file_supported("src/main.c"));
        assert!(extractor.is_file_supported("include/api.h"));
        assert!(!extractor.is_file_supported("src/main.cpp"));
        assert!(!extractor.is_file_supported("src/c"));
    }

    #[test]
    fn test_extension_case_is_kept() {
        let extractor = CommandExtractor::new("cxx", "xgettext").with_extension("C");

        assert_eq!(extractor.extensions(), &["C"]);
        assert!(extractor.is_file_supported("src/widget.C"));
        assert_eq!(extractor.is_file_supported("src/main.c"), CASE_INSENSITIVE_FS);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_upper_and_lower_case_extensions_go_to_different_backends() {
        let cxx = CommandExtractor::new("cxx", "xgettext").with_extension("C");
        let c = CommandExtractor::new("c", "xgettext").with_extension("c");
        let files = list(&["a.C", "b.c"]);

        assert_eq!(cxx.filter_files(&files).as_slice(), &["a.C"]);
        assert_eq!(c.filter_files(&files).as_slice(), &["b.c"]);
    }

    #[test]
    fn test_pattern_matching_uses_file_name() {
        let extractor = CommandExtractor::new("desktop", "xgettext").with_pattern("*.desktop.in");

        assert!(extractor.is_file_supported("data/app.desktop.in"));
        assert!(!extractor.is_file_supported("data/app.desktop"));
    }

    #[test]
    fn test_filter_files_by_extension() {
        let extractor = CommandExtractor::new("python", "xgettext").with_extension("py");
        let files = list(&["a.c", "b.py", "c.txt", "pkg/d.py"]);

        let claimed = extractor.filter_files(&files);
        assert_eq!(claimed.as_slice(), &["b.py", "pkg/d.py"]);
    }

    #[test]
    fn test_invocation_substitutes_placeholders() {
        let extractor = CommandExtractor::new("c", "xgettext").with_args([
            "--language=C",
            "-o",
            "{output}",
            "--files-from={files_from}",
        ]);

        let invocation =
            extractor.invocation(Path::new("/tmp/ws/0_c.pot"), Path::new("/tmp/ws/1_c.files"));
        let args: Vec<_> = invocation
            .arguments()
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(invocation.program(), "xgettext");
        assert_eq!(
            args,
            vec![
                "--language=C",
                "-o",
                "/tmp/ws/0_c.pot",
                "--files-from=/tmp/ws/1_c.files"
            ]
        );
    }

    #[test]
    fn test_from_config() {
        let config = ExtractorConfig {
            id: "php".to_string(),
            extensions: vec!["php".to_string(), "phtml".to_string()],
            patterns: vec![],
            program: "xgettext".to_string(),
            args: vec!["-o".to_string(), "{output}".to_string()],
        };

        let extractor = CommandExtractor::from_config(&config);
        assert_eq!(extractor.id(), "php");
        assert!(extractor.is_file_supported("index.phtml"));
    }

    #[test]
    fn test_missing_program_yields_no_fragment() {
        let workspace = TempWorkspace::new().unwrap();
        let spec = SourceSpec::in_current_dir::<&str>(vec![".".to_string()], &[]);
        let extractor = CommandExtractor::new("c", "potgather-missing-xgettext")
            .with_extension("c")
            .with_args(["-o", "{output}"]);

        assert!(extractor.extract(&workspace, &spec, &list(&["a.c"])).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_writes_fragment() {
        let workspace = TempWorkspace::new().unwrap();
        let spec = SourceSpec::in_current_dir::<&str>(vec![".".to_string()], &[]);
        // Copies the file list into the fragment so the test can see
        // exactly what the tool received.
        let extractor = CommandExtractor::new("sh-copy", "sh")
            .with_extension("c")
            .with_args(["-c", "cat \"$1\" > \"$0\"", "{output}", "{files_from}"]);

        let files = list(&["dir with space/a.c", "b;echo pwned.c"]);
        let fragment = extractor.extract(&workspace, &spec, &files).unwrap();

        assert!(fragment.starts_with(workspace.path()));
        let content = fs::read_to_string(fragment).unwrap();
        assert_eq!(content, "b;echo pwned.c\ndir with space/a.c\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_output_counts_as_nothing() {
        let workspace = TempWorkspace::new().unwrap();
        let spec = SourceSpec::in_current_dir::<&str>(vec![".".to_string()], &[]);
        let extractor = CommandExtractor::new("touch", "sh")
            .with_extension("c")
            .with_args(["-c", ": > \"$0\"", "{output}"]);

        assert!(extractor.extract(&workspace, &spec, &list(&["a.c"])).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_tool_yields_no_fragment() {
        let workspace = TempWorkspace::new().unwrap();
        let spec = SourceSpec::in_current_dir::<&str>(vec![".".to_string()], &[]);
        let extractor = CommandExtractor::new("broken", "sh")
            .with_extension("c")
            .with_args(["-c", "echo partial > \"$0\"; exit 1", "{output}"]);

        assert!(extractor.extract(&workspace, &spec, &list(&["a.c"])).is_none());
    }
}
