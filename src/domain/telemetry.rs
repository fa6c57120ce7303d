// Render-ready telemetry views produced for widgets
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesData {
    pub datalogger_id: String,
    pub variable: String,
    pub name: String,
    pub points: Vec<TimeSeriesPoint>,
}

impl SeriesData {
    pub fn new(datalogger_id: String, variable: String, name: String, points: Vec<TimeSeriesPoint>) -> Self {
        Self {
            datalogger_id,
            variable,
            name,
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    pub series: Vec<SeriesData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub time_ms: i64,
    pub datalogger_id: String,
    pub values: BTreeMap<String, f64>,
}

/// Summary statistics of one variable on one datalogger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableStats {
    pub datalogger_id: String,
    pub variable: String,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableData {
    pub title: String,
    pub variables: Vec<String>,
    pub rows: Vec<TableRow>,
    pub statistics: Vec<VariableStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatData {
    pub title: String,
    pub unit: Option<String>,
    pub value: f64,
}

impl StatData {
    pub fn new(title: String, unit: Option<String>, value: f64) -> Self {
        Self { title, unit, value }
    }
}

/// Data resolved for a widget before it is handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResolvedData {
    None,
    Series { series: Vec<SeriesData> },
    Table { rows: Vec<TableRow>, statistics: Vec<VariableStats> },
    Value { value: f64 },
}

/// Visual output of a widget, consumed by the host's chart/table renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WidgetView {
    Empty,
    Text { title: String, content: String },
    Chart(ChartData),
    Table(TableData),
    Stat(StatData),
    Image { title: String, url: String },
}
