pub mod analytics;
pub mod api;
pub mod backend;
pub mod config;
pub mod data;
pub mod database;
pub mod error;
pub mod model;
pub mod summary;

pub use analytics::ChartProjections;
pub use backend::{AnalysisClient, AnalysisContext, AnalysisReport};
pub use error::AppError;
pub use model::{CategorySet, EngagementStatus, EngagementSummary, FrameObservation};
pub use summary::EngagementSummarizer;
