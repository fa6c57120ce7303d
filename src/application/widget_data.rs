// Widget data service - Resolves widget configs against reference readings
use crate::application::grid_layout::{layout_for, Breakpoint, Geometry};
use crate::application::reference_data::ReferenceDataProvider;
use crate::application::registry::ComponentRegistry;
use crate::domain::reference::Reading;
use crate::domain::report::{Report, TimeRange};
use crate::domain::telemetry::{ResolvedData, SeriesData, TableRow, TimeSeriesPoint, VariableStats, WidgetView};
use crate::domain::widget::{SourceConfig, WidgetConfig, WidgetInstance};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

const MAX_POINTS_PER_SERIES: usize = 150;
const TABLE_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedWidget {
    pub i: String,
    pub geometry: Geometry,
    pub view: WidgetView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedReport {
    pub id: String,
    pub name: String,
    pub breakpoint: Breakpoint,
    pub columns: u32,
    pub widgets: Vec<RenderedWidget>,
}

#[derive(Clone)]
pub struct WidgetDataService {
    reference: Arc<dyn ReferenceDataProvider>,
    registry: ComponentRegistry,
}

impl WidgetDataService {
    pub fn new(reference: Arc<dyn ReferenceDataProvider>, registry: ComponentRegistry) -> Self {
        Self { reference, registry }
    }

    /// Lay out `report` for a viewport and render every widget.
    pub fn render_report(&self, report: &Report, width_px: u32, now: DateTime<Utc>) -> RenderedReport {
        let (breakpoint, layout) = layout_for(&report.components, width_px);

        let widgets = report
            .components
            .iter()
            .zip(layout)
            .map(|(widget, geometry)| RenderedWidget {
                i: widget.i.clone(),
                geometry,
                view: self.render_widget(widget, report.time_range, now),
            })
            .collect();

        RenderedReport {
            id: report.id.clone(),
            name: report.name.clone(),
            breakpoint,
            columns: breakpoint.columns(),
            widgets,
        }
    }

    pub fn render_widget(&self, widget: &WidgetInstance, time_range: TimeRange, now: DateTime<Utc>) -> WidgetView {
        let data = self.resolve(&widget.config, time_range, now);
        self.registry.render(&widget.config, &data)
    }

    pub fn resolve(&self, config: &WidgetConfig, time_range: TimeRange, now: DateTime<Utc>) -> ResolvedData {
        let Some(source) = config.source() else {
            return ResolvedData::None;
        };

        let start = time_range.window_start(now);
        let readings: Vec<&Reading> = self
            .reference
            .readings()
            .iter()
            .filter(|r| source.datalogger_ids.contains(&r.datalogger_id))
            .filter(|r| r.timestamp >= start && r.timestamp <= now)
            .collect();

        tracing::debug!(
            "Resolving {} widget '{}' over {} readings",
            config.tag(),
            config.title(),
            readings.len()
        );

        match config {
            WidgetConfig::Chart(source) => ResolvedData::Series {
                series: self.build_series(source, &readings),
            },
            WidgetConfig::Table(source) => ResolvedData::Table {
                rows: latest_rows(source, &readings, TABLE_ROWS),
                statistics: statistics(source, &readings),
            },
            WidgetConfig::Stat(stat) => ResolvedData::Value {
                value: latest_value(&stat.source, &readings),
            },
            WidgetConfig::Text(_) | WidgetConfig::Image(_) | WidgetConfig::Unsupported(_) => ResolvedData::None,
        }
    }

    fn build_series(&self, source: &SourceConfig, readings: &[&Reading]) -> Vec<SeriesData> {
        let mut series_list = Vec::new();

        for datalogger_id in &source.datalogger_ids {
            let station = self
                .reference
                .datalogger(datalogger_id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| datalogger_id.clone());

            for variable in &source.variables {
                let mut points: Vec<TimeSeriesPoint> = readings
                    .iter()
                    .filter(|r| &r.datalogger_id == datalogger_id)
                    .filter_map(|r| {
                        r.variables
                            .get(variable)
                            .map(|v| TimeSeriesPoint::new(r.timestamp.timestamp_millis(), *v))
                    })
                    .collect();

                // Only add series that have data
                if points.is_empty() {
                    continue;
                }
                points.sort_by_key(|p| p.time_ms);

                series_list.push(SeriesData::new(
                    datalogger_id.clone(),
                    variable.clone(),
                    format!("{} - {}", station, variable),
                    downsample_points(points, MAX_POINTS_PER_SERIES),
                ));
            }
        }

        series_list
    }
}

/// Downsample time series points using bucket averaging
pub fn downsample_points(points: Vec<TimeSeriesPoint>, max_points: usize) -> Vec<TimeSeriesPoint> {
    if max_points == 0 || points.len() <= max_points {
        return points;
    }

    let bucket_size = (points.len() as f64 / max_points as f64).ceil() as usize;
    let mut downsampled = Vec::with_capacity(max_points);

    for chunk in points.chunks(bucket_size) {
        // Use middle point's timestamp and average value
        let mid_idx = chunk.len() / 2;
        let avg_value = chunk.iter().map(|p| p.value).sum::<f64>() / chunk.len() as f64;

        downsampled.push(TimeSeriesPoint::new(chunk[mid_idx].time_ms, avg_value));
    }

    downsampled
}

/// Most recent readings first, restricted to the configured variables.
fn latest_rows(source: &SourceConfig, readings: &[&Reading], limit: usize) -> Vec<TableRow> {
    let mut sorted: Vec<&Reading> = readings.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    sorted
        .into_iter()
        .take(limit)
        .map(|r| TableRow {
            time_ms: r.timestamp.timestamp_millis(),
            datalogger_id: r.datalogger_id.clone(),
            values: r
                .variables
                .iter()
                .filter(|(name, _)| source.variables.contains(name))
                .map(|(name, value)| (name.clone(), *value))
                .collect(),
        })
        .collect()
}

/// Latest value of the first variable across the selected dataloggers; 0 when absent.
fn latest_value(source: &SourceConfig, readings: &[&Reading]) -> f64 {
    let Some(variable) = source.variables.first() else {
        return 0.0;
    };

    readings
        .iter()
        .filter(|r| r.variables.contains_key(variable))
        .max_by_key(|r| r.timestamp)
        .and_then(|r| r.variables.get(variable).copied())
        .unwrap_or(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Min, max, mean and population standard deviation per (datalogger, variable).
pub fn statistics(source: &SourceConfig, readings: &[&Reading]) -> Vec<VariableStats> {
    let mut stats = Vec::new();

    for variable in &source.variables {
        for datalogger_id in &source.datalogger_ids {
            // Missing values count as zero
            let values: Vec<f64> = readings
                .iter()
                .filter(|r| &r.datalogger_id == datalogger_id)
                .map(|r| r.variables.get(variable).copied().unwrap_or(0.0))
                .collect();

            let (min, max, avg, std_dev) = if values.is_empty() {
                (0.0, 0.0, 0.0, 0.0)
            } else {
                let n = values.len() as f64;
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let avg = values.iter().sum::<f64>() / n;
                let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n;
                (min, max, avg, variance.sqrt())
            };

            stats.push(VariableStats {
                datalogger_id: datalogger_id.clone(),
                variable: variable.clone(),
                min: round2(min),
                max: round2(max),
                avg: round2(avg),
                std_dev: round2(std_dev),
            });
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reference_data::fixtures::{self, base_time};
    use crate::domain::telemetry::{StatData, WidgetView};
    use crate::domain::widget::{ConfigFields, StatConfig, TextConfig, WidgetType};

    fn service() -> WidgetDataService {
        WidgetDataService::new(Arc::new(fixtures::sample()), ComponentRegistry::with_builtin())
    }

    fn source(dataloggers: &[&str], variables: &[&str]) -> SourceConfig {
        SourceConfig {
            title: "t".to_string(),
            datalogger_ids: dataloggers.iter().map(|s| s.to_string()).collect(),
            variables: variables.iter().map(|s| s.to_string()).collect(),
            width: 4,
            height: 4,
        }
    }

    #[test]
    fn test_downsample_points() {
        let points: Vec<TimeSeriesPoint> = (0..10).map(|i| TimeSeriesPoint::new(i, i as f64)).collect();

        let result = downsample_points(points.clone(), 5);
        assert_eq!(result.len(), 5);
        assert_eq!(result[0], TimeSeriesPoint::new(1, 0.5));
        assert_eq!(result[4], TimeSeriesPoint::new(9, 8.5));

        assert_eq!(downsample_points(points.clone(), 20), points);
    }

    #[test]
    fn test_chart_series_respect_time_range() {
        let config = WidgetConfig::Chart(source(&["cdmb-air-001"], &["PM2.5"]));

        let day = service().resolve(&config, TimeRange::LastDay, base_time());
        let ResolvedData::Series { series } = day else {
            panic!("expected series");
        };
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "Station cdmb-air-001 - PM2.5");
        let values: Vec<f64> = series[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![40.0, 20.0, 30.0]);

        let week = service().resolve(&config, TimeRange::LastWeek, base_time());
        let ResolvedData::Series { series } = week else {
            panic!("expected series");
        };
        assert_eq!(series[0].points.len(), 4);
    }

    #[test]
    fn test_chart_skips_empty_series() {
        let config = WidgetConfig::Chart(source(&["cdmb-air-001", "cdmb-air-002"], &["CO2"]));
        let ResolvedData::Series { series } = service().resolve(&config, TimeRange::LastDay, base_time()) else {
            panic!("expected series");
        };
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].datalogger_id, "cdmb-air-002");
    }

    #[test]
    fn test_table_rows_newest_first() {
        let config = WidgetConfig::Table(source(&["cdmb-air-001"], &["temperatura"]));
        let ResolvedData::Table { rows, statistics } = service().resolve(&config, TimeRange::LastDay, base_time())
        else {
            panic!("expected table");
        };

        assert_eq!(rows.len(), 3);
        assert!(rows[0].time_ms > rows[1].time_ms);
        assert_eq!(rows[0].values.get("temperatura"), Some(&24.0));
        assert!(rows[0].values.get("PM2.5").is_none());

        assert_eq!(statistics.len(), 1);
        let stats = &statistics[0];
        assert_eq!((stats.min, stats.max, stats.avg), (22.0, 26.0, 24.0));
        assert_eq!(stats.std_dev, 1.63);
    }

    #[test]
    fn test_statistics_without_data() {
        let stats = statistics(&source(&["cerrejon-noise-001"], &["ruido"]), &[]);
        assert_eq!(stats[0].avg, 0.0);
        assert_eq!(stats[0].std_dev, 0.0);
    }

    #[test]
    fn test_stat_latest_value() {
        let config = WidgetConfig::Stat(StatConfig {
            source: source(&["cdmb-air-001", "cdmb-air-002"], &["PM2.5"]),
            unit: Some("µg/m³".to_string()),
        });

        let view = service().render_widget(
            &WidgetInstance {
                i: "stat-1".to_string(),
                config,
                x: 0,
                y: 0,
                w: 4,
                h: 4,
            },
            TimeRange::LastDay,
            base_time(),
        );

        // Both stations report one hour ago; the later reading in storage order wins the tie
        match view {
            WidgetView::Stat(StatData { value, unit, .. }) => {
                assert_eq!(value, 12.5);
                assert_eq!(unit.as_deref(), Some("µg/m³"));
            }
            other => panic!("expected stat view, got {:?}", other),
        }
    }

    #[test]
    fn test_stat_without_variable_is_zero() {
        let config = WidgetConfig::from_fields(WidgetType::Stat, &ConfigFields::default());
        assert_eq!(
            service().resolve(&config, TimeRange::LastDay, base_time()),
            ResolvedData::Value { value: 0.0 }
        );
    }

    #[test]
    fn test_render_report_layout_and_views() {
        let now = base_time();
        let report = Report {
            id: "report-1".to_string(),
            name: "Weekly".to_string(),
            description: String::new(),
            time_range: TimeRange::LastWeek,
            components: vec![
                WidgetInstance {
                    i: "text-1".to_string(),
                    config: WidgetConfig::Text(TextConfig {
                        title: "Intro".to_string(),
                        content: "Air quality".to_string(),
                        width: 12,
                        height: 2,
                    }),
                    x: 0,
                    y: 0,
                    w: 12,
                    h: 2,
                },
                WidgetInstance {
                    i: "chart-1".to_string(),
                    config: WidgetConfig::Chart(source(&["cdmb-air-001"], &["PM2.5"])),
                    x: 0,
                    y: 7,
                    w: 6,
                    h: 4,
                },
            ],
            created_at: now,
            updated_at: now,
        };

        let rendered = service().render_report(&report, 1024, now);

        assert_eq!(rendered.breakpoint, Breakpoint::Md);
        assert_eq!(rendered.columns, 10);
        assert_eq!(rendered.widgets[0].geometry.w, 10);
        assert_eq!(rendered.widgets[1].geometry.y, 2);
        assert_eq!(
            rendered.widgets[0].view,
            WidgetView::Text {
                title: "Intro".to_string(),
                content: "Air quality".to_string()
            }
        );
        assert!(matches!(rendered.widgets[1].view, WidgetView::Chart(_)));
    }
}
