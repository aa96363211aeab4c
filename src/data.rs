use csv::Reader;
use log::warn;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::model::{AnalysisResultPayload, EngagementStatus, FrameObservation, RawFrame};

const STATUS_COLUMN: &str = "engagement_status";

pub fn frames_from_statuses<S: AsRef<str>>(labels: &[S]) -> Vec<FrameObservation> {
    let frames: Vec<FrameObservation> = labels
        .iter()
        .enumerate()
        .map(|(index, label)| FrameObservation::new(index, EngagementStatus::parse(label.as_ref())))
        .collect();

    let unrecognized = frames.iter().filter(|f| f.status.is_none()).count();
    if unrecognized > 0 {
        warn!("{} of {} frames carry an unrecognized engagement status", unrecognized, frames.len());
    }

    frames
}

pub fn frames_from_raw(raw: &[RawFrame]) -> Vec<FrameObservation> {
    let labels: Vec<&str> = raw.iter().map(|r| r.engagement_status.as_str()).collect();
    frames_from_statuses(&labels)
}

pub fn frames_from_payload(payload: &AnalysisResultPayload) -> Vec<FrameObservation> {
    frames_from_raw(&payload.engagement_results)
}

// Offline input: one row per frame, in temporal order
pub fn load_frames_csv<P: AsRef<Path>>(path: P) -> Result<Vec<FrameObservation>> {
    let rdr = Reader::from_path(path)?;
    read_frames_csv(rdr)
}

pub fn read_frames_csv<R: std::io::Read>(mut rdr: Reader<R>) -> Result<Vec<FrameObservation>> {
    let headers = rdr.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| h.trim() == STATUS_COLUMN)
        .ok_or_else(|| AppError::Validation(format!("csv is missing a {} column", STATUS_COLUMN)))?;

    let mut labels = Vec::new();
    for result in rdr.records() {
        let record = result?;
        labels.push(record.get(column).unwrap_or("").trim().to_string());
    }

    Ok(frames_from_statuses(&labels))
}

/// "144.mp4" -> "144"
pub fn roll_no_from_video_name(video_name: &str) -> &str {
    video_name.split('.').next().unwrap_or(video_name)
}
