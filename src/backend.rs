use log::{error, info};
use serde::Serialize;
use std::time::Duration;

use crate::analytics::ChartProjections;
use crate::data::frames_from_payload;
use crate::error::{AppError, Result};
use crate::model::{AnalysisResultPayload, CategorySet, EngagementSummary, FrameObservation};
use crate::summary::EngagementSummarizer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize, Clone, Debug)]
pub struct AnalysisReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_name: Option<String>,
    pub summary: EngagementSummary,
    pub charts: ChartProjections,
}

/// Everything one analysis view needs, passed explicitly into the pipeline.
#[derive(Clone, Debug)]
pub struct AnalysisContext {
    pub video_name: Option<String>,
    pub categories: CategorySet,
    pub heatmap_bucket: usize,
}

impl AnalysisContext {
    pub fn new(categories: CategorySet, heatmap_bucket: usize) -> Self {
        Self {
            video_name: None,
            categories,
            heatmap_bucket,
        }
    }

    pub fn for_video(mut self, video_name: impl Into<String>) -> Self {
        self.video_name = Some(video_name.into());
        self
    }

    pub fn report(&self, frames: &[FrameObservation]) -> AnalysisReport {
        let summary = EngagementSummarizer::new().summarize(frames, &self.categories);
        let charts = ChartProjections::build(frames, &summary, &self.categories, self.heatmap_bucket);
        AnalysisReport {
            video_name: self.video_name.clone(),
            summary,
            charts,
        }
    }
}

// Client for the video analysis service that produces per-frame labels
#[derive(Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_frames(&self, video_name: &str) -> Result<Vec<FrameObservation>> {
        let url = format!("{}/analysis-result", self.base_url);
        info!("Fetching analysis results for {}", video_name);

        let response = self
            .http
            .get(&url)
            .query(&[("video_name", video_name)])
            .send()
            .await
            .map_err(|e| {
                error!("Error fetching analysis results for {}: {}", video_name, e);
                AppError::Backend(e)
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            error!("Analysis backend returned {} for {}", status, video_name);
            return Err(AppError::BackendStatus {
                status,
                video_name: video_name.to_string(),
            });
        }

        let payload: AnalysisResultPayload = response.json().await?;
        Ok(frames_from_payload(&payload))
    }

    pub async fn fetch_report(&self, context: &AnalysisContext) -> Result<AnalysisReport> {
        let video_name = context
            .video_name
            .as_deref()
            .ok_or_else(|| AppError::Validation("video_name is required".to_string()))?;
        let frames = self.fetch_frames(video_name).await?;
        Ok(context.report(&frames))
    }
}
