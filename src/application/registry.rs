// Component registry - widget type tag to renderer and configuration schema
use crate::domain::telemetry::{ChartData, ResolvedData, StatData, TableData, WidgetView};
use crate::domain::widget::{WidgetConfig, WidgetType};
use serde::Serialize;
use std::collections::HashMap;

/// Pure renderer: config plus resolved data in, visual description out.
pub type RenderFn = fn(&WidgetConfig, &ResolvedData) -> WidgetView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigField {
    Title,
    Content,
    Url,
    Dataloggers,
    Variables,
    Width,
    Height,
    Unit,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PaletteEntry {
    pub id: WidgetType,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Clone)]
pub struct ComponentEntry {
    pub palette: PaletteEntry,
    pub fields: &'static [ConfigField],
    pub render: RenderFn,
}

const TEXT_FIELDS: &[ConfigField] = &[ConfigField::Title, ConfigField::Content, ConfigField::Width, ConfigField::Height];
const SOURCE_FIELDS: &[ConfigField] = &[
    ConfigField::Title,
    ConfigField::Dataloggers,
    ConfigField::Variables,
    ConfigField::Width,
    ConfigField::Height,
];
const STAT_FIELDS: &[ConfigField] = &[
    ConfigField::Title,
    ConfigField::Dataloggers,
    ConfigField::Variables,
    ConfigField::Width,
    ConfigField::Height,
    ConfigField::Unit,
];
const IMAGE_FIELDS: &[ConfigField] = &[ConfigField::Title, ConfigField::Url, ConfigField::Width, ConfigField::Height];

#[derive(Clone)]
pub struct ComponentRegistry {
    entries: HashMap<&'static str, ComponentEntry>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl ComponentRegistry {
    pub fn with_builtin() -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.register(palette(WidgetType::Text, "Text", "Add text content"), TEXT_FIELDS, render_text);
        registry.register(
            palette(WidgetType::Chart, "Chart", "Visualize data with charts"),
            SOURCE_FIELDS,
            render_chart,
        );
        registry.register(
            palette(WidgetType::Table, "Table", "Display data in a table format"),
            SOURCE_FIELDS,
            render_table,
        );
        registry.register(
            palette(WidgetType::Stat, "Statistics", "Show statistical values"),
            STAT_FIELDS,
            render_stat,
        );
        registry.register(palette(WidgetType::Image, "Image", "Display images"), IMAGE_FIELDS, render_image);
        registry
    }

    pub fn register(&mut self, palette: PaletteEntry, fields: &'static [ConfigField], render: RenderFn) {
        self.entries.insert(
            palette.id.as_str(),
            ComponentEntry {
                palette,
                fields,
                render,
            },
        );
    }

    pub fn lookup(&self, tag: &str) -> Option<&ComponentEntry> {
        self.entries.get(tag)
    }

    /// Configuration fields for `tag`; empty for unknown tags.
    pub fn fields(&self, tag: &str) -> &'static [ConfigField] {
        self.lookup(tag).map(|e| e.fields).unwrap_or(&[])
    }

    /// Render a widget, or nothing when its type has no registered renderer.
    pub fn render(&self, config: &WidgetConfig, data: &ResolvedData) -> WidgetView {
        match self.lookup(config.tag()) {
            Some(entry) => (entry.render)(config, data),
            None => WidgetView::Empty,
        }
    }

    /// Palette in display order.
    pub fn palette(&self) -> Vec<PaletteEntry> {
        WidgetType::ALL
            .iter()
            .filter_map(|t| self.lookup(t.as_str()).map(|e| e.palette))
            .collect()
    }
}

fn palette(id: WidgetType, name: &'static str, description: &'static str) -> PaletteEntry {
    PaletteEntry { id, name, description }
}

fn render_text(config: &WidgetConfig, _data: &ResolvedData) -> WidgetView {
    match config {
        WidgetConfig::Text(text) => WidgetView::Text {
            title: text.title.clone(),
            content: text.content.clone(),
        },
        _ => WidgetView::Empty,
    }
}

fn render_chart(config: &WidgetConfig, data: &ResolvedData) -> WidgetView {
    let series = match data {
        ResolvedData::Series { series } => series.clone(),
        _ => Vec::new(),
    };
    WidgetView::Chart(ChartData {
        title: config.title().to_string(),
        series,
    })
}

fn render_table(config: &WidgetConfig, data: &ResolvedData) -> WidgetView {
    let (rows, statistics) = match data {
        ResolvedData::Table { rows, statistics } => (rows.clone(), statistics.clone()),
        _ => (Vec::new(), Vec::new()),
    };
    WidgetView::Table(TableData {
        title: config.title().to_string(),
        variables: config.source().map(|s| s.variables.clone()).unwrap_or_default(),
        rows,
        statistics,
    })
}

fn render_stat(config: &WidgetConfig, data: &ResolvedData) -> WidgetView {
    let unit = match config {
        WidgetConfig::Stat(stat) => stat.unit.clone(),
        _ => None,
    };
    let value = match data {
        ResolvedData::Value { value } => *value,
        _ => 0.0,
    };
    WidgetView::Stat(StatData::new(config.title().to_string(), unit, value))
}

fn render_image(config: &WidgetConfig, _data: &ResolvedData) -> WidgetView {
    match config {
        WidgetConfig::Image(image) => WidgetView::Image {
            title: image.title.clone(),
            url: image.url.clone(),
        },
        _ => WidgetView::Empty,
    }
}
