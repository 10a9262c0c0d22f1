pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExtractorConfig};
pub use error::{PotGatherError, Result, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{
    CommandExtractor, DispatchPlan, ExtractionCoordinator, ExtractionOutcome, ExtractionReport,
    Extractor, ExtractorRegistry, MsgcatTool, TemplateMerger, TempWorkspace, Workspace,
};
pub use scanner::{CollectionReport, FileCollector, FileList, SourceSpec};
pub use ui::{OutputFormatter, OutputMode, ProgressManager};

use extractor::report::report_path_for;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Main library interface: collect, dispatch, merge, install.
pub struct PotGather {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
}

impl PotGather {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Self {
            config,
            output_formatter,
            progress_manager,
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(
            config,
            output_mode,
            cli_args.verbose,
            cli_args.quiet,
        ))
    }

    /// Runs the whole pipeline and leaves the template at the configured
    /// output path.
    pub fn run(&self) -> Result<ExtractionReport> {
        let start_time = Instant::now();
        let spec = self.config.source_spec();

        let collection = self.collect_sources(&spec)?;
        self.output_formatter
            .info(&format!("Found {} source files", collection.files.len()));

        let output = self.config.output.path.as_path();
        self.ensure_output_writable(output)?;

        let outcome = self.extract(&spec, &collection.files, |workspace, outcome| {
            let template = outcome.template.as_ref().ok_or_else(|| {
                PotGatherError::NoTranslatableContent {
                    files_scanned: collection.files.len(),
                }
            })?;
            debug!(
                target: "potgather::extractor",
                workspace = %workspace.path().display(),
                "installing template"
            );
            self.install_template(template, output)
        })?;

        if !outcome.unmatched.is_empty() {
            self.output_formatter.info(&format!(
                "{} files were not recognized by any extractor",
                outcome.unmatched.len()
            ));
        }

        let report = ExtractionReport::new(&spec, &collection.files, &outcome, start_time.elapsed())
            .with_template(output);

        if self.config.output.report {
            let report_path = report_path_for(output);
            report.save_json(&report_path)?;
            self.output_formatter
                .info(&format!("Report written to {}", report_path.display()));
        }

        self.output_formatter.print_extraction_summary(&report, output);
        Ok(report)
    }

    /// Files and extractor assignments a run would use. No tool is started.
    pub fn plan(&self) -> Result<(FileList, DispatchPlan)> {
        let spec = self.config.source_spec();
        let collection = self.collect_sources(&spec)?;

        let registry = self.build_registry();
        let merger = self.build_merger();
        let plan = ExtractionCoordinator::new(&registry, &merger).plan(&collection.files);

        Ok((collection.files, plan))
    }

    fn collect_sources(&self, spec: &SourceSpec) -> Result<CollectionReport> {
        spec.ensure_supported_base_path()?;
        self.output_formatter.start_operation("Collecting source files");

        let spinner = self.progress_manager.create_spinner("Scanning search paths");
        let collection = FileCollector::new()
            .with_follow_links(self.config.sources.follow_links)
            .collect(spec);
        spinner.finish_and_clear();
        let collection = collection?;

        for entry in &collection.empty_entries {
            self.output_formatter
                .warning(&format!("No source files under '{}'", entry));
        }

        if collection.files.is_empty() {
            return Err(PotGatherError::NoSourceFiles {
                search_paths: spec.search_paths.clone(),
            });
        }

        Ok(collection)
    }

    /// Dispatches `files` and hands the outcome to `finish` while the
    /// workspace holding the fragments still exists.
    fn extract<F>(&self, spec: &SourceSpec, files: &FileList, finish: F) -> Result<ExtractionOutcome>
    where
        F: FnOnce(&TempWorkspace, &ExtractionOutcome) -> Result<()>,
    {
        self.output_formatter.start_operation("Extracting translatable strings");

        let registry = self.build_registry();
        let merger = self.build_merger();
        let workspace = TempWorkspace::new()?;

        let dispatch_progress = self
            .progress_manager
            .create_dispatch_progress(registry.len() as u64);
        let progress_callback = {
            let pb = dispatch_progress.clone();
            move |progress: &extractor::DispatchProgress| {
                ui::progress::update_dispatch_progress(&pb, progress);
            }
        };

        let result = ExtractionCoordinator::new(&registry, &merger).extract_all(
            &workspace,
            spec,
            files,
            Some(&progress_callback),
        );

        match result {
            Ok(outcome) => {
                ui::progress::finish_progress_with_summary(
                    &dispatch_progress,
                    &format!("Ran {} extractors", outcome.results.len()),
                    dispatch_progress.elapsed(),
                );
                finish(&workspace, &outcome)?;
                Ok(outcome)
            }
            Err(err) => {
                dispatch_progress.abandon_with_message("Extraction failed");
                Err(err)
            }
        }
    }

    fn build_registry(&self) -> ExtractorRegistry {
        ExtractorRegistry::from_config(&self.config.extractors, Some(self.config.tool_timeout()))
    }

    fn build_merger(&self) -> TemplateMerger {
        TemplateMerger::new(
            MsgcatTool::from_config(&self.config.merge)
                .with_timeout(Some(self.config.tool_timeout())),
        )
    }

    fn ensure_output_writable(&self, output: &Path) -> Result<()> {
        if output.is_dir() {
            return Err(PotGatherError::InvalidPath {
                path: format!("{} is a directory", output.display()),
            });
        }
        if output.exists() && !self.config.output.overwrite {
            return Err(PotGatherError::OutputExists {
                path: output.display().to_string(),
            });
        }
        Ok(())
    }

    fn install_template(&self, template: &Path, output: &Path) -> Result<()> {
        self.ensure_output_writable(output)?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::copy(template, output)?;
        self.output_formatter
            .success(&format!("Wrote {}", output.display()));
        Ok(())
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &PotGatherError) {
        self.progress_manager.clear();
        self.output_formatter.print_user_friendly_error(error);
    }
}
