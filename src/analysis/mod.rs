pub mod format;
pub mod parser;
pub mod prompt;
pub mod service;

pub use format::TemplateVersion;
pub use parser::{CompletionParser, HeaderRule};
pub use prompt::build_analysis_prompt;
pub use service::{fallback_analysis, AnalysisService, Analyzed};
