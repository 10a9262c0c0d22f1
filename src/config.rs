use crate::error::{PotGatherError, Result};
use crate::scanner::file_collector::CURRENT_DIR;
use crate::scanner::SourceSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder replaced by the fragment path in extractor arguments.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";
/// Placeholder replaced by the path of the file list in extractor arguments.
pub const FILES_FROM_PLACEHOLDER: &str = "{files_from}";

const DEFAULT_CONFIG_FILES: &[&str] = &["potgather.toml", ".potgather.toml"];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourceConfig,
    #[serde(default = "default_extractors")]
    pub extractors: Vec<ExtractorConfig>,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<String>,
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Descend into symlinked directories.
    #[serde(default)]
    pub follow_links: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ExtractorConfig {
    pub id: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Wildcard patterns tested against the file name.
    #[serde(default)]
    pub patterns: Vec<String>,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MergeConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Deadline for every external tool run, in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub report: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourceConfig::default(),
            extractors: default_extractors(),
            merge: MergeConfig::default(),
            tools: ToolsConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            search_paths: default_search_paths(),
            excluded_paths: vec![
                ".git".to_string(),
                "target".to_string(),
                "node_modules".to_string(),
                "*.min.js".to_string(),
            ],
            follow_links: false,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            program: "msgcat".to_string(),
            args: vec!["--force-po".to_string()],
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 } // 5 minutes
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("messages.pot"),
            overwrite: false,
            report: false,
        }
    }
}

fn default_base_path() -> String {
    CURRENT_DIR.to_string()
}

fn default_search_paths() -> Vec<String> {
    vec![CURRENT_DIR.to_string()]
}

fn xgettext(id: &str, language: &str, extensions: &[&str]) -> ExtractorConfig {
    ExtractorConfig {
        id: id.to_string(),
        extensions: extensions.iter().map(|e| e.to_string()).collect(),
        patterns: Vec::new(),
        program: "xgettext".to_string(),
        args: vec![
            "--force-po".to_string(),
            "--from-code=UTF-8".to_string(),
            "--add-comments=TRANSLATORS:".to_string(),
            format!("--language={}", language),
            "-o".to_string(),
            OUTPUT_PLACEHOLDER.to_string(),
            format!("--files-from={}", FILES_FROM_PLACEHOLDER),
        ],
    }
}

/// Built-in backends, in priority order.
pub fn default_extractors() -> Vec<ExtractorConfig> {
    vec![
        xgettext("c", "C", &["c", "h"]),
        xgettext("cxx", "C++", &["cpp", "cxx", "cc", "c++", "hpp", "hxx", "hh"]),
        xgettext("csharp", "C#", &["cs"]),
        xgettext("python", "Python", &["py"]),
        xgettext("php", "PHP", &["php", "php3", "php4", "phtml"]),
        xgettext("javascript", "JavaScript", &["js", "jsx", "mjs"]),
        xgettext("perl", "Perl", &["pl", "pm"]),
        xgettext("glade", "Glade", &["glade", "ui", "gtkbuilder"]),
    ]
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PotGatherError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PotGatherError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| PotGatherError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                for default_path in DEFAULT_CONFIG_FILES {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref search_paths) = cli_args.search_paths {
            if !search_paths.is_empty() {
                self.sources.search_paths = search_paths.clone();
            }
        }

        if let Some(ref exclude) = cli_args.exclude {
            self.sources.excluded_paths.extend(exclude.iter().cloned());
        }

        if let Some(ref output) = cli_args.output {
            self.output.path = output.clone();
        }

        if let Some(overwrite) = cli_args.overwrite {
            self.output.overwrite = overwrite;
        }

        if let Some(report) = cli_args.report {
            self.output.report = report;
        }

        if let Some(timeout) = cli_args.timeout {
            self.tools.timeout_secs = timeout;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| PotGatherError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| PotGatherError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.base_path.trim() != CURRENT_DIR {
            return Err(PotGatherError::UnsupportedBasePath {
                path: self.sources.base_path.clone(),
            });
        }

        if self.sources.search_paths.is_empty() {
            return Err(PotGatherError::Config {
                message: "At least one search path must be specified".to_string(),
            });
        }

        let mut seen_ids = HashSet::new();
        for extractor in &self.extractors {
            if extractor.id.trim().is_empty() {
                return Err(PotGatherError::Config {
                    message: "Extractor ids cannot be empty".to_string(),
                });
            }

            if !seen_ids.insert(extractor.id.as_str()) {
                return Err(PotGatherError::Config {
                    message: format!("Duplicate extractor id: {}", extractor.id),
                });
            }

            if extractor.extensions.is_empty() && extractor.patterns.is_empty() {
                return Err(PotGatherError::Config {
                    message: format!(
                        "Extractor '{}' needs at least one extension or pattern",
                        extractor.id
                    ),
                });
            }

            if extractor.program.trim().is_empty() {
                return Err(PotGatherError::Config {
                    message: format!("Extractor '{}' has no program", extractor.id),
                });
            }

            if !extractor.args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER)) {
                return Err(PotGatherError::Config {
                    message: format!(
                        "Extractor '{}' arguments must contain {}",
                        extractor.id, OUTPUT_PLACEHOLDER
                    ),
                });
            }
        }

        if self.merge.program.trim().is_empty() {
            return Err(PotGatherError::Config {
                message: "Merge program cannot be empty".to_string(),
            });
        }

        if self.tools.timeout_secs == 0 {
            return Err(PotGatherError::Config {
                message: "Tool timeout must be greater than 0".to_string(),
            });
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(PotGatherError::Config {
                message: "Output path cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn source_spec(&self) -> SourceSpec {
        SourceSpec::new(
            &self.sources.base_path,
            self.sources.search_paths.clone(),
            &self.sources.excluded_paths,
        )
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.timeout_secs)
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub search_paths: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub output: Option<PathBuf>,
    pub overwrite: Option<bool>,
    pub report: Option<bool>,
    pub timeout: Option<u64>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_paths(mut self, search_paths: Option<Vec<String>>) -> Self {
        self.search_paths = search_paths;
        self
    }

    pub fn with_exclude(mut self, exclude: Option<Vec<String>>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_overwrite(mut self, overwrite: Option<bool>) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_report(mut self, report: Option<bool>) -> Self {
        self.report = report;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sources.base_path, ".");
        assert_eq!(config.tools.timeout_secs, 300);
        assert_eq!(config.merge.program, "msgcat");
        assert!(config.extractors.iter().any(|e| e.id == "python"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.sources.search_paths.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tools.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        let duplicate = config.extractors[0].clone();
        config.extractors.push(duplicate);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.extractors[0].args.retain(|a| a != OUTPUT_PLACEHOLDER);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsupported_base_path_is_rejected() {
        let mut config = Config::default();
        config.sources.base_path = "/srv/project".to_string();
        assert!(matches!(
            config.validate(),
            Err(PotGatherError::UnsupportedBasePath { .. })
        ));
    }

    #[test]
    fn test_config_file_operations() {
        let config = Config::default();
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.tools.timeout_secs, loaded_config.tools.timeout_secs);
        assert_eq!(config.extractors, loaded_config.extractors);
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sources]
            search_paths = ["src"]
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.base_path, ".");
        assert_eq!(config.sources.search_paths, vec!["src"]);
        assert_eq!(config.extractors, default_extractors());
        assert_eq!(config.output.path, PathBuf::from("messages.pot"));
    }

    #[test]
    fn test_custom_extractors_replace_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sources]
            search_paths = ["."]

            [[extractors]]
            id = "lua"
            extensions = ["lua"]
            program = "xgettext"
            args = ["--language=Lua", "-o", "{output}", "--files-from={files_from}"]
            "#,
        )
        .unwrap();

        assert_eq!(config.extractors.len(), 1);
        assert_eq!(config.extractors[0].id, "lua");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        let default_exclusions = config.sources.excluded_paths.len();

        let overrides = CliOverrides::new()
            .with_search_paths(Some(vec!["src".to_string(), "lib".to_string()]))
            .with_exclude(Some(vec!["src/vendor".to_string()]))
            .with_timeout(Some(60))
            .with_overwrite(Some(true));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.sources.search_paths, vec!["src", "lib"]);
        assert_eq!(config.sources.excluded_paths.len(), default_exclusions + 1);
        assert_eq!(config.tools.timeout_secs, 60);
        assert!(config.output.overwrite);
    }

    #[test]
    fn test_empty_cli_search_paths_keep_config() {
        let mut config = Config::default();
        config.merge_with_cli_args(&CliOverrides::new().with_search_paths(Some(vec![])));
        assert_eq!(config.sources.search_paths, vec!["."]);
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(sample.contains("[sources]"));
        assert!(sample.contains("[[extractors]]"));
        assert!(sample.contains("[merge]"));
        assert!(sample.contains("[output]"));
    }
}
