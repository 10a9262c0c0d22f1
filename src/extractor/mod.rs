pub mod backend;
pub mod command;
pub mod coordinator;
pub mod merger;
pub mod registry;
pub mod report;
pub mod tool;
pub mod workspace;

pub use backend::{claim_files, Extractor};
pub use command::CommandExtractor;
pub use coordinator::{
    DispatchPlan, DispatchProgress, ExtractionCoordinator, ExtractionOutcome, ExtractionResult,
};
pub use merger::{MergeTool, MsgcatTool, TemplateMerger};
pub use registry::ExtractorRegistry;
pub use report::ExtractionReport;
pub use tool::{ToolInvocation, ToolOutput};
pub use workspace::{TempWorkspace, Workspace};
