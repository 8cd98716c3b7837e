pub mod admission;
pub mod canonicalize;
pub mod content_pipeline;
pub mod low_info;
pub mod reports;

pub use admission::is_valid;
pub use canonicalize::canonicalize;
pub use content_pipeline::extract_next_links;
pub use reports::ReportSink;
