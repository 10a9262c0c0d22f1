use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PotGatherError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported base path: {path} (only \".\" is supported)")]
    UnsupportedBasePath { path: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("No source files found in the search paths")]
    NoSourceFiles { search_paths: Vec<String> },

    #[error("No translatable strings found in {files_scanned} files")]
    NoTranslatableContent { files_scanned: usize },

    #[error("Failed to merge {fragments} catalog fragments: {message}")]
    MergeFailed { fragments: usize, message: String },

    #[error("Failed to launch {program}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    ToolFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} timed out after {:.1}s", .timeout.as_secs_f64())]
    ToolTimeout { program: String, timeout: Duration },

    #[error("Output file already exists: {path}")]
    OutputExists { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for PotGatherError {
    fn user_message(&self) -> String {
        match self {
            PotGatherError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            PotGatherError::UnsupportedBasePath { path } => {
                format!("Base path '{}' is not supported", path)
            }
            PotGatherError::NoSourceFiles { search_paths } => {
                format!(
                    "No source files found in: {}",
                    search_paths.join(", ")
                )
            }
            PotGatherError::NoTranslatableContent { files_scanned } => {
                format!(
                    "None of the {} scanned files contained translatable strings",
                    files_scanned
                )
            }
            PotGatherError::MergeFailed { fragments, message } => {
                format!("Failed to merge {} catalogs: {}", fragments, message)
            }
            PotGatherError::ToolSpawn { program, source } => {
                format!("Could not run {}: {}", program, source)
            }
            PotGatherError::ToolFailed {
                program, stderr, ..
            } => {
                let detail = stderr.lines().next().unwrap_or("").trim();
                if detail.is_empty() {
                    format!("{} failed", program)
                } else {
                    format!("{} failed: {}", program, detail)
                }
            }
            PotGatherError::OutputExists { path } => {
                format!("Output file already exists: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            PotGatherError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            PotGatherError::UnsupportedBasePath { .. } => Some(
                "Run potgather from the project root and set base_path = \".\" in the [sources] table.".to_string()
            ),
            PotGatherError::NoSourceFiles { .. } => Some(
                "Check the search paths and make sure the exclusions do not cover every file.".to_string()
            ),
            PotGatherError::NoTranslatableContent { .. } => Some(
                "Make sure an extractor is configured for your source languages (see --generate-config).".to_string()
            ),
            PotGatherError::MergeFailed { .. } => Some(
                "Install GNU gettext (msgcat) or point [merge].program at a compatible tool.".to_string()
            ),
            PotGatherError::ToolSpawn { .. } => Some(
                "Install GNU gettext or adjust the extractor program in the configuration file.".to_string()
            ),
            PotGatherError::ToolTimeout { .. } => Some(
                "Increase the tool timeout with --timeout.".to_string()
            ),
            PotGatherError::OutputExists { .. } => Some(
                "Remove the existing file, choose another path with --output, or use --force to overwrite.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for PotGatherError {
    fn from(error: toml::de::Error) -> Self {
        PotGatherError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PotGatherError>;
