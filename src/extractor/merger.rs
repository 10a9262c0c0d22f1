use crate::config::MergeConfig;
use crate::error::{PotGatherError, Result};
use crate::extractor::tool::ToolInvocation;
use crate::extractor::workspace::Workspace;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

/// External catalog concatenation.
pub trait MergeTool {
    /// Writes the union of `fragments` to `output`.
    fn merge(&self, output: &Path, fragments: &[PathBuf]) -> Result<()>;
}

/// `msgcat --force-po -o <output> <fragments...>`.
#[derive(Debug, Clone)]
pub struct MsgcatTool {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl MsgcatTool {
    pub fn new() -> Self {
        Self::from_config(&MergeConfig::default())
    }

    pub fn from_config(config: &MergeConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn invocation(&self, output: &Path, fragments: &[PathBuf]) -> ToolInvocation {
        ToolInvocation::new(self.program.clone())
            .args(&self.args)
            .arg("-o")
            .arg(output)
            .args(fragments)
            .with_timeout(self.timeout)
    }
}

impl Default for MsgcatTool {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeTool for MsgcatTool {
    fn merge(&self, output: &Path, fragments: &[PathBuf]) -> Result<()> {
        let invocation = self.invocation(output, fragments);
        invocation.run().map_err(|err| {
            error!(
                target: "potgather::extractor",
                command = %invocation.command_line(),
                "failed command"
            );
            PotGatherError::MergeFailed {
                fragments: fragments.len(),
                message: err.to_string(),
            }
        })?;
        Ok(())
    }
}

/// Combines per-backend fragments into one template.
pub struct TemplateMerger {
    tool: Box<dyn MergeTool>,
}

impl TemplateMerger {
    pub fn new<T: MergeTool + 'static>(tool: T) -> Self {
        Self {
            tool: Box::new(tool),
        }
    }

    /// No fragments give `None`, a single fragment is returned as is, and
    /// anything more is concatenated into a fresh workspace file.
    pub fn merge(&self, workspace: &dyn Workspace, fragments: &[PathBuf]) -> Result<Option<PathBuf>> {
        match fragments {
            [] => Ok(None),
            [single] => Ok(Some(single.clone())),
            _ => {
                debug!(
                    target: "potgather::extractor",
                    fragments = fragments.len(),
                    "merging fragments"
                );

                let output = workspace.create_file_name("concatenated.pot");
                match self.tool.merge(&output, fragments) {
                    Ok(()) => {
                        debug!(target: "potgather::extractor", output = %output.display(), "merge succeeded");
                        Ok(Some(output))
                    }
                    Err(err) => {
                        error!(
                            target: "potgather::extractor",
                            fragments = fragments.len(),
                            error = %err,
                            "failed to merge gettext catalogs"
                        );
                        Err(match err {
                            PotGatherError::MergeFailed { .. } => err,
                            other => PotGatherError::MergeFailed {
                                fragments: fragments.len(),
                                message: other.to_string(),
                            },
                        })
                    }
                }
            }
        }
    }
}

impl Default for TemplateMerger {
    fn default() -> Self {
        Self::new(MsgcatTool::new())
    }
}
