pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod utils;

pub use analysis::{AnalysisService, CompletionParser, HeaderRule, TemplateVersion};
pub use api::{CompletionClient, ScoreboardSource};
pub use config::{PipelineConfig, StoreKind};
pub use error::{PipelineError, Result};
pub use models::*;
pub use pipeline::{open_store, BatchResult, GameOutcome, Pipeline, WeekFeed};
pub use store::GameStore;
