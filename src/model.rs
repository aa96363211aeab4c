use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::error::AppError;

// Per-frame label produced by the external classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngagementStatus {
    Engaged,
    Distracted,
    Neutral,
}

impl EngagementStatus {
    /// Exact, case-sensitive match against the classifier's labels.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Engaged" => Some(EngagementStatus::Engaged),
            "Distracted" => Some(EngagementStatus::Distracted),
            "Neutral" => Some(EngagementStatus::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementStatus::Engaged => "Engaged",
            EngagementStatus::Distracted => "Distracted",
            EngagementStatus::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for EngagementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameObservation {
    pub index: usize,
    // None when the classifier emitted a label we don't know
    pub status: Option<EngagementStatus>,
}

impl FrameObservation {
    pub fn new(index: usize, status: Option<EngagementStatus>) -> Self {
        Self { index, status }
    }

    /// 1-based frame number used on chart axes.
    pub fn display_frame(&self) -> usize {
        self.index + 1
    }
}

/// Ordered, duplicate-free set of the categories a caller wants counted.
///
/// Order is significant: pie slices and summary rows come out in this order so
/// chart colours stay stable. `Engaged` must always be tracked because the
/// overall status and severity band are derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    categories: Vec<EngagementStatus>,
}

impl CategorySet {
    pub fn new(categories: Vec<EngagementStatus>) -> Result<Self, AppError> {
        if !categories.contains(&EngagementStatus::Engaged) {
            return Err(AppError::Config(
                "category set must include Engaged".to_string(),
            ));
        }
        for (i, category) in categories.iter().enumerate() {
            if categories[..i].contains(category) {
                return Err(AppError::Config(format!(
                    "category {} listed more than once",
                    category
                )));
            }
        }
        Ok(Self { categories })
    }

    pub fn binary() -> Self {
        Self {
            categories: vec![EngagementStatus::Engaged, EngagementStatus::Distracted],
        }
    }

    pub fn with_neutral() -> Self {
        Self {
            categories: vec![
                EngagementStatus::Engaged,
                EngagementStatus::Distracted,
                EngagementStatus::Neutral,
            ],
        }
    }

    pub fn from_flag(track_neutral: bool) -> Self {
        if track_neutral {
            Self::with_neutral()
        } else {
            Self::binary()
        }
    }

    pub fn contains(&self, status: EngagementStatus) -> bool {
        self.categories.contains(&status)
    }

    pub fn iter(&self) -> impl Iterator<Item = EngagementStatus> + '_ {
        self.categories.iter().copied()
    }

    pub fn position(&self, status: EngagementStatus) -> Option<usize> {
        self.categories.iter().position(|&c| c == status)
    }

    /// Vertical position of a status on the scatter chart.
    ///
    /// Binary set: Engaged=1, Distracted=0. With Neutral tracked:
    /// Engaged=2, Neutral=1, Distracted=0.
    pub fn level(&self, status: EngagementStatus) -> Option<u8> {
        if !self.contains(status) {
            return None;
        }
        let neutral = self.contains(EngagementStatus::Neutral);
        Some(match (status, neutral) {
            (EngagementStatus::Engaged, true) => 2,
            (EngagementStatus::Engaged, false) => 1,
            (EngagementStatus::Neutral, _) => 1,
            (EngagementStatus::Distracted, _) => 0,
        })
    }
}

/// Per-category values kept in category-set order.
///
/// Serializes as a JSON object keyed by the status name.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMap<T> {
    entries: Vec<(EngagementStatus, T)>,
}

impl<T: Copy + Default> CategoryMap<T> {
    pub fn zeroed(categories: &CategorySet) -> Self {
        Self {
            entries: categories.iter().map(|c| (c, T::default())).collect(),
        }
    }

    pub fn get(&self, status: EngagementStatus) -> Option<T> {
        self.entries
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, v)| *v)
    }

    pub fn get_mut(&mut self, status: EngagementStatus) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(s, _)| *s == status)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EngagementStatus, T)> + '_ {
        self.entries.iter().copied()
    }

    pub fn map<U, F: Fn(T) -> U>(&self, f: F) -> CategoryMap<U> {
        CategoryMap {
            entries: self.entries.iter().map(|&(s, v)| (s, f(v))).collect(),
        }
    }
}

impl<T: Serialize> Serialize for CategoryMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (status, value) in &self.entries {
            map.serialize_entry(status.as_str(), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    Engaged,
    Distracted,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Engaged => "Engaged",
            OverallStatus::Distracted => "Distracted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityCategory {
    #[serde(rename = "Very Low Engagement")]
    VeryLow,
    #[serde(rename = "Low Engagement")]
    Low,
    #[serde(rename = "Moderate Engagement")]
    Moderate,
    #[serde(rename = "High Engagement")]
    High,
    #[serde(rename = "Very High Engagement")]
    VeryHigh,
}

impl SeverityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityCategory::VeryLow => "Very Low Engagement",
            SeverityCategory::Low => "Low Engagement",
            SeverityCategory::Moderate => "Moderate Engagement",
            SeverityCategory::High => "High Engagement",
            SeverityCategory::VeryHigh => "Very High Engagement",
        }
    }
}

impl fmt::Display for SeverityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementSummary {
    pub total: usize,
    pub counts: CategoryMap<usize>,
    pub percentages: CategoryMap<f64>,
    pub engagement_percentage: f64,
    pub overall_status: OverallStatus,
    pub severity_category: SeverityCategory,
}

// Wire shape returned by the analysis backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFrame {
    pub engagement_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResultPayload {
    #[serde(default)]
    pub engagement_results: Vec<RawFrame>,
}

// Student and course metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub roll_no: String,
    pub subject: String,
    pub section: String,
    pub session: String,
    pub teacher: String,
    pub department: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentInput {
    pub name: String,
    pub roll_no: String,
    pub subject: String,
    pub section: String,
    pub session: String,
    pub teacher: String,
    pub department: String,
}

impl StudentInput {
    pub fn validate(&self) -> Result<(), AppError> {
        let fields = [
            &self.name,
            &self.roll_no,
            &self.subject,
            &self.section,
            &self.session,
            &self.teacher,
            &self.department,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(AppError::Validation("All fields are required".to_string()));
        }
        Ok(())
    }
}

// The only fields the dashboard hands on to storage after an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementResult {
    pub roll_no: String,
    pub final_engagement_status: OverallStatus,
    pub engagement_category: SeverityCategory,
    pub engagement_percentage: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl EngagementResult {
    pub fn from_summary(roll_no: &str, summary: &EngagementSummary) -> Self {
        Self {
            roll_no: roll_no.to_string(),
            final_engagement_status: summary.overall_status,
            engagement_category: summary.severity_category,
            engagement_percentage: summary.engagement_percentage,
            created_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentResults {
    #[serde(flatten)]
    pub student: Student,
    pub results: Vec<EngagementResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultFilters {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub departments: Vec<String>,
    pub sections: Vec<String>,
    pub sessions: Vec<String>,
}
