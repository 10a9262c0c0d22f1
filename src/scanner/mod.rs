pub mod file_collector;
pub mod file_list;
pub mod path_matcher;

pub use file_collector::{CollectionReport, FileCollector, SourceSpec};
pub use file_list::FileList;
pub use path_matcher::{ExclusionSet, PathPattern};
