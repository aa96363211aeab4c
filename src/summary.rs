use crate::model::{
    CategoryMap, CategorySet, EngagementStatus, EngagementSummary, FrameObservation, OverallStatus,
    SeverityCategory,
};

// Engaged share must be strictly above this to count as an engaged session
const ENGAGED_THRESHOLD: f64 = 50.0;

pub struct EngagementSummarizer;

impl EngagementSummarizer {
    pub fn new() -> Self {
        EngagementSummarizer
    }

    /// Count, percentage and classify one analysis session.
    ///
    /// Only frames whose status is in `categories` contribute; the total is the
    /// sum of those counts, so unrecognized or untracked labels shrink the
    /// denominator instead of inflating it. Empty input yields a zeroed summary.
    /// Status and band are classified on the unrounded Engaged share; only the
    /// reported percentages are rounded.
    pub fn summarize(&self, frames: &[FrameObservation], categories: &CategorySet) -> EngagementSummary {
        let mut counts: CategoryMap<usize> = CategoryMap::zeroed(categories);
        for frame in frames {
            if let Some(status) = frame.status {
                if let Some(count) = counts.get_mut(status) {
                    *count += 1;
                }
            }
        }

        let total: usize = counts.iter().map(|(_, c)| c).sum();
        let percentages = counts.map(|count| percentage(count, total));
        let engaged = counts.get(EngagementStatus::Engaged).unwrap_or(0);
        let raw_engaged = raw_percentage(engaged, total);

        EngagementSummary {
            total,
            counts,
            percentages,
            engagement_percentage: round2(raw_engaged),
            overall_status: overall_status(raw_engaged),
            severity_category: severity_category(raw_engaged),
        }
    }
}

impl Default for EngagementSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn percentage(count: usize, total: usize) -> f64 {
    round2(raw_percentage(count, total))
}

fn raw_percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// Exactly 50% is a Distracted session
pub fn overall_status(engaged_percentage: f64) -> OverallStatus {
    if engaged_percentage > ENGAGED_THRESHOLD {
        OverallStatus::Engaged
    } else {
        OverallStatus::Distracted
    }
}

pub fn severity_category(engaged_percentage: f64) -> SeverityCategory {
    if engaged_percentage <= 20.0 {
        SeverityCategory::VeryLow
    } else if engaged_percentage <= 40.0 {
        SeverityCategory::Low
    } else if engaged_percentage <= 60.0 {
        SeverityCategory::Moderate
    } else if engaged_percentage <= 80.0 {
        SeverityCategory::High
    } else {
        SeverityCategory::VeryHigh
    }
}
