// Report domain model
use super::widget::WidgetInstance;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Time window a report looks at, persisted as the number of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "1")]
    LastDay,
    #[serde(rename = "5")]
    LastFiveDays,
    #[serde(rename = "7")]
    LastWeek,
    #[serde(rename = "30")]
    LastMonth,
}

impl TimeRange {
    pub const ALL: [TimeRange; 4] = [
        TimeRange::LastDay,
        TimeRange::LastFiveDays,
        TimeRange::LastWeek,
        TimeRange::LastMonth,
    ];

    pub fn days(&self) -> i64 {
        match self {
            TimeRange::LastDay => 1,
            TimeRange::LastFiveDays => 5,
            TimeRange::LastWeek => 7,
            TimeRange::LastMonth => 30,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::LastDay => "Last 24 hours",
            TimeRange::LastFiveDays => "Last 5 days",
            TimeRange::LastWeek => "Last 7 days",
            TimeRange::LastMonth => "Last 30 days",
        }
    }

    /// Earliest instant included in the window ending at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub time_range: TimeRange,
    #[serde(default)]
    pub components: Vec<WidgetInstance>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn widget(&self, i: &str) -> Option<&WidgetInstance> {
        self.components.iter().find(|w| w.i == i)
    }
}

/// First widget id that appears more than once in `components`.
pub fn duplicate_widget_id(components: &[WidgetInstance]) -> Option<&str> {
    components
        .iter()
        .enumerate()
        .find(|(idx, w)| components[..*idx].iter().any(|earlier| earlier.i == w.i))
        .map(|(_, w)| w.i.as_str())
}

/// Partial update merged into an existing report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub components: Option<Vec<WidgetInstance>>,
}

impl ReportPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn apply_to(self, report: &mut Report) {
        if let Some(name) = self.name {
            report.name = name;
        }
        if let Some(description) = self.description {
            report.description = description;
        }
        if let Some(time_range) = self.time_range {
            report.time_range = time_range;
        }
        if let Some(components) = self.components {
            report.components = components;
        }
    }
}
