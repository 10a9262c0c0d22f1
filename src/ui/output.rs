use crate::error::{PotGatherError, UserFriendlyError};
use crate::extractor::{DispatchPlan, ExtractionReport};
use crate::scanner::FileList;
use console::{style, Emoji, Term};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static GEAR: Emoji = Emoji("⚙️  ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    /// Errors are printed even in quiet mode.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", GEAR, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &PotGatherError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => eprintln!("SUGGESTION: {}", suggestion),
            }
        }
    }

    pub fn print_extraction_summary(&self, report: &ExtractionReport, output: &Path) {
        match self.mode {
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            _ if self.quiet => {}
            OutputMode::Human => self.print_human_summary(report, output),
            OutputMode::Plain => self.print_plain_summary(report, output),
        }
    }

    /// What a real run would do, backend by backend.
    pub fn print_dispatch_plan(&self, files: &FileList, plan: &DispatchPlan) {
        if self.mode == OutputMode::Json {
            let assignments: Vec<_> = plan
                .assignments
                .iter()
                .map(|(id, claimed)| serde_json::json!({ "extractor": id, "files": claimed }))
                .collect();
            self.print_json_object(&serde_json::json!({
                "type": "plan",
                "files": files,
                "assignments": assignments,
                "unmatched": plan.unmatched,
            }));
            return;
        }

        self.print_header("Extraction plan");
        println!("Source files: {}", files.len());
        for file in files {
            println!("  {}", file);
        }

        for (id, claimed) in &plan.assignments {
            println!();
            if self.use_colors {
                println!("{} ({} files)", style(id).bold().cyan(), claimed.len());
            } else {
                println!("{} ({} files)", id, claimed.len());
            }
            for file in claimed {
                println!("  {}", file);
            }
        }

        if !plan.unmatched.is_empty() {
            println!();
            println!("Not recognized ({} files)", plan.unmatched.len());
            for file in &plan.unmatched {
                println!("  {}", file);
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => println!("=== {} ===", title),
        }
    }

    pub fn print_separator(&self) {
        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => println!("{}", "-".repeat(60)),
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let styled = match msg_type {
                MessageType::Success => style(message).green().bold(),
                MessageType::Error => style(message).red().bold(),
                MessageType::Warning => style(message).yellow().bold(),
                MessageType::Info => style(message).cyan(),
            };
            let emoji = match msg_type {
                MessageType::Success => CHECKMARK,
                MessageType::Error => CROSS,
                MessageType::Warning => WARNING,
                MessageType::Info => INFO,
            };

            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, styled),
                _ => println!("{}{}", emoji, styled),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn highlight(&self, value: String) -> String {
        if self.use_colors {
            style(value).cyan().bold().to_string()
        } else {
            value
        }
    }

    fn print_human_summary(&self, report: &ExtractionReport, output: &Path) {
        let summary = &report.summary;

        println!();
        self.print_separator();
        if self.use_colors {
            println!(
                "{} {}",
                style("Template written!").green().bold(),
                CHECKMARK
            );
        } else {
            println!("✓ Template written!");
        }
        println!();

        println!("  Output:          {}", self.highlight(output.display().to_string()));
        println!(
            "  Files collected: {}",
            self.highlight(summary.files_collected.to_string())
        );
        for backend in &report.backends {
            let marker = if backend.produced_fragment { "" } else { " (no strings)" };
            println!("    {:<13} {} files{}", backend.id, backend.files, marker);
        }
        if summary.files_unmatched > 0 {
            println!("  Not recognized:  {}", summary.files_unmatched);
        }
        println!(
            "  Time taken:      {}",
            self.highlight(format_duration(summary.extraction_duration))
        );

        self.print_separator();
    }

    fn print_plain_summary(&self, report: &ExtractionReport, output: &Path) {
        let summary = &report.summary;

        println!("COMPLETED: {}", output.display());
        println!("Files collected: {}", summary.files_collected);
        for backend in &report.backends {
            println!("Extractor {}: {} files", backend.id, backend.files);
        }
        println!("Not recognized: {}", summary.files_unmatched);
        println!("Fragments: {}", summary.fragments);
        println!("Duration: {:?}", summary.extraction_duration);
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
