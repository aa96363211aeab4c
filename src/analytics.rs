use ndarray::Array2;
use serde::Serialize;

use crate::model::{CategorySet, EngagementStatus, EngagementSummary, FrameObservation};
use crate::summary::round2;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TimelinePoint {
    pub frame: usize,
    pub engaged: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distracted: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neutral: Option<u8>,
}

// Area charts stack the same per-frame indicators
pub type AreaPoint = TimelinePoint;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PieSlice {
    pub name: EngagementStatus,
    pub value: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ScatterPoint {
    pub x: usize,
    pub y: u8,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SummaryRow {
    pub status: EngagementStatus,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Heatmap {
    pub bucket_size: usize,
    pub categories: Vec<EngagementStatus>,
    pub rows: Vec<Vec<f64>>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChartProjections {
    pub summary: Vec<SummaryRow>,
    pub timeline: Vec<TimelinePoint>,
    pub pie: Vec<PieSlice>,
    pub scatter: Vec<ScatterPoint>,
    pub area: Vec<AreaPoint>,
    pub heatmap: Heatmap,
}

impl ChartProjections {
    pub fn build(
        frames: &[FrameObservation],
        summary: &EngagementSummary,
        categories: &CategorySet,
        bucket_size: usize,
    ) -> Self {
        ChartProjections {
            summary: project_summary_rows(summary),
            timeline: project_timeline(frames, categories),
            pie: project_pie(summary),
            scatter: project_scatter(frames, categories),
            area: project_area(frames, categories),
            heatmap: project_heatmap(frames, categories, bucket_size),
        }
    }
}

fn indicator(frame: &FrameObservation, status: EngagementStatus) -> u8 {
    if frame.status == Some(status) {
        1
    } else {
        0
    }
}

// Indicators only for tracked categories; Engaged is always tracked
pub fn project_timeline(frames: &[FrameObservation], categories: &CategorySet) -> Vec<TimelinePoint> {
    let track_distracted = categories.contains(EngagementStatus::Distracted);
    let track_neutral = categories.contains(EngagementStatus::Neutral);
    frames
        .iter()
        .map(|frame| TimelinePoint {
            frame: frame.display_frame(),
            engaged: indicator(frame, EngagementStatus::Engaged),
            distracted: track_distracted.then(|| indicator(frame, EngagementStatus::Distracted)),
            neutral: track_neutral.then(|| indicator(frame, EngagementStatus::Neutral)),
        })
        .collect()
}

pub fn project_area(frames: &[FrameObservation], categories: &CategorySet) -> Vec<AreaPoint> {
    project_timeline(frames, categories)
}

pub fn project_pie(summary: &EngagementSummary) -> Vec<PieSlice> {
    summary
        .percentages
        .iter()
        .map(|(name, value)| PieSlice { name, value })
        .collect()
}

// Frames outside the tracked set get no point
pub fn project_scatter(frames: &[FrameObservation], categories: &CategorySet) -> Vec<ScatterPoint> {
    frames
        .iter()
        .filter_map(|frame| {
            let level = categories.level(frame.status?)?;
            Some(ScatterPoint {
                x: frame.display_frame(),
                y: level,
            })
        })
        .collect()
}

pub fn project_summary_rows(summary: &EngagementSummary) -> Vec<SummaryRow> {
    summary
        .counts
        .iter()
        .map(|(status, count)| SummaryRow {
            status,
            count,
            percentage: summary.percentages.get(status).unwrap_or(0.0),
        })
        .collect()
}

/// Share of each tracked category within consecutive buckets of frames.
///
/// One row per bucket, one column per category in set order. A bucket with no
/// tracked frames is an all-zero row.
pub fn project_heatmap(frames: &[FrameObservation], categories: &CategorySet, bucket_size: usize) -> Heatmap {
    let bucket_size = bucket_size.max(1);
    let buckets = frames.len().div_ceil(bucket_size);
    let mut counts = Array2::<f64>::zeros((buckets, categories.iter().count()));

    for (i, frame) in frames.iter().enumerate() {
        if let Some(col) = frame.status.and_then(|s| categories.position(s)) {
            counts[[i / bucket_size, col]] += 1.0;
        }
    }

    let rows = counts
        .rows()
        .into_iter()
        .map(|row| {
            let tracked = row.sum();
            row.iter()
                .map(|&c| if tracked > 0.0 { round2(c / tracked) } else { 0.0 })
                .collect()
        })
        .collect();

    Heatmap {
        bucket_size,
        categories: categories.iter().collect(),
        rows,
    }
}
