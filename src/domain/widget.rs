// Widget domain model
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_WIDGET_SPAN: u8 = 4;
pub const MIN_WIDGET_SPAN: u8 = 1;
pub const MAX_WIDGET_SPAN: u8 = 12;

/// Clamp a user-supplied span into the grid's valid range.
pub fn clamp_span(value: Option<i64>) -> u8 {
    match value {
        // 0 behaves like "unset", same as the form input
        None | Some(0) => DEFAULT_WIDGET_SPAN,
        Some(v) => v.clamp(MIN_WIDGET_SPAN as i64, MAX_WIDGET_SPAN as i64) as u8,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    Text,
    Chart,
    Table,
    Stat,
    Image,
}

impl WidgetType {
    pub const ALL: [WidgetType; 5] = [
        WidgetType::Text,
        WidgetType::Chart,
        WidgetType::Table,
        WidgetType::Stat,
        WidgetType::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetType::Text => "text",
            WidgetType::Chart => "chart",
            WidgetType::Table => "table",
            WidgetType::Stat => "stat",
            WidgetType::Image => "image",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    /// Whether widgets of this type are bound to datalogger readings.
    pub fn is_data_bound(&self) -> bool {
        matches!(self, WidgetType::Chart | WidgetType::Table | WidgetType::Stat)
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loose configuration shape as it appears on the wire and in storage.
///
/// Every field is optional, and both the legacy singular selectors
/// (`dataloggerId`, `variable`) and the current plural ones are accepted.
/// Typed configs are always written back in the plural shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datalogger_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datalogger_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
}

impl ConfigFields {
    /// Selected dataloggers, preferring the plural field over the legacy one.
    pub fn selected_dataloggers(&self) -> Vec<String> {
        normalize_selection(&self.datalogger_ids, &self.datalogger_id)
    }

    /// Selected variables, preferring the plural field over the legacy one.
    pub fn selected_variables(&self) -> Vec<String> {
        normalize_selection(&self.variables, &self.variable)
    }
}

fn normalize_selection(plural: &Option<Vec<String>>, singular: &Option<String>) -> Vec<String> {
    match (plural, singular) {
        (Some(values), _) => {
            let mut unique: Vec<String> = Vec::with_capacity(values.len());
            for value in values {
                if !unique.contains(value) {
                    unique.push(value.clone());
                }
            }
            unique
        }
        (None, Some(value)) if !value.is_empty() => vec![value.clone()],
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextConfig {
    pub title: String,
    pub content: String,
    pub width: u8,
    pub height: u8,
}

/// Data binding shared by chart, table and stat widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub title: String,
    pub datalogger_ids: Vec<String>,
    pub variables: Vec<String>,
    pub width: u8,
    pub height: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatConfig {
    pub source: SourceConfig,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    pub title: String,
    pub url: String,
    pub width: u8,
    pub height: u8,
}

/// A widget whose type tag this build does not know.
///
/// Kept verbatim so that saving the report writes it back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedConfig {
    pub tag: String,
    pub fields: ConfigFields,
}

/// Finalized configuration of a widget, one variant per widget type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetConfig {
    Text(TextConfig),
    Chart(SourceConfig),
    Table(SourceConfig),
    Stat(StatConfig),
    Image(ImageConfig),
    Unsupported(UnsupportedConfig),
}

impl WidgetConfig {
    /// Build the typed config for `kind` out of the loose wire shape.
    pub fn from_fields(kind: WidgetType, fields: &ConfigFields) -> Self {
        let title = fields.title.clone().unwrap_or_default();
        let width = clamp_span(fields.width);
        let height = clamp_span(fields.height);
        let source = || SourceConfig {
            title: title.clone(),
            datalogger_ids: fields.selected_dataloggers(),
            variables: fields.selected_variables(),
            width,
            height,
        };

        match kind {
            WidgetType::Text => WidgetConfig::Text(TextConfig {
                title: title.clone(),
                content: fields.content.clone().unwrap_or_default(),
                width,
                height,
            }),
            WidgetType::Chart => WidgetConfig::Chart(source()),
            WidgetType::Table => WidgetConfig::Table(source()),
            WidgetType::Stat => WidgetConfig::Stat(StatConfig {
                source: source(),
                unit: fields.unit.clone(),
            }),
            WidgetType::Image => WidgetConfig::Image(ImageConfig {
                title: title.clone(),
                url: fields.url.clone().unwrap_or_default(),
                width,
                height,
            }),
        }
    }

    /// Known widget type, `None` for unsupported tags.
    pub fn widget_type(&self) -> Option<WidgetType> {
        match self {
            WidgetConfig::Text(_) => Some(WidgetType::Text),
            WidgetConfig::Chart(_) => Some(WidgetType::Chart),
            WidgetConfig::Table(_) => Some(WidgetType::Table),
            WidgetConfig::Stat(_) => Some(WidgetType::Stat),
            WidgetConfig::Image(_) => Some(WidgetType::Image),
            WidgetConfig::Unsupported(_) => None,
        }
    }

    /// Type tag as stored, including tags of unsupported widgets.
    pub fn tag(&self) -> &str {
        match self {
            WidgetConfig::Unsupported(c) => &c.tag,
            other => other.widget_type().map(|t| t.as_str()).unwrap_or_default(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            WidgetConfig::Text(c) => &c.title,
            WidgetConfig::Chart(c) | WidgetConfig::Table(c) => &c.title,
            WidgetConfig::Stat(c) => &c.source.title,
            WidgetConfig::Image(c) => &c.title,
            WidgetConfig::Unsupported(c) => c.fields.title.as_deref().unwrap_or_default(),
        }
    }

    /// Requested size as (width, height) in grid cells.
    pub fn size(&self) -> (u8, u8) {
        match self {
            WidgetConfig::Text(c) => (c.width, c.height),
            WidgetConfig::Chart(c) | WidgetConfig::Table(c) => (c.width, c.height),
            WidgetConfig::Stat(c) => (c.source.width, c.source.height),
            WidgetConfig::Image(c) => (c.width, c.height),
            WidgetConfig::Unsupported(c) => (clamp_span(c.fields.width), clamp_span(c.fields.height)),
        }
    }

    pub fn source(&self) -> Option<&SourceConfig> {
        match self {
            WidgetConfig::Chart(c) | WidgetConfig::Table(c) => Some(c),
            WidgetConfig::Stat(c) => Some(&c.source),
            WidgetConfig::Text(_) | WidgetConfig::Image(_) | WidgetConfig::Unsupported(_) => None,
        }
    }

    /// Convert back into the wire shape (plural selectors only).
    ///
    /// Unsupported widgets return their fields untouched.
    pub fn to_fields(&self) -> ConfigFields {
        if let WidgetConfig::Unsupported(c) = self {
            return c.fields.clone();
        }
        let (width, height) = self.size();
        let mut fields = ConfigFields {
            title: Some(self.title().to_string()),
            width: Some(width as i64),
            height: Some(height as i64),
            ..ConfigFields::default()
        };

        match self {
            WidgetConfig::Text(c) => fields.content = Some(c.content.clone()),
            WidgetConfig::Image(c) => fields.url = Some(c.url.clone()),
            WidgetConfig::Chart(_) | WidgetConfig::Table(_) | WidgetConfig::Stat(_) | WidgetConfig::Unsupported(_) => {}
        }
        if let Some(source) = self.source() {
            fields.datalogger_ids = Some(source.datalogger_ids.clone());
            fields.variables = Some(source.variables.clone());
        }
        if let WidgetConfig::Stat(c) = self {
            fields.unit = c.unit.clone();
        }

        fields
    }
}

/// One configured widget placed on a report's grid.
///
/// Serialized flat (`i`, `type`, `config`, `x`, `y`, `w`, `h`); the config is
/// parsed according to `type` through the lenient wire shape. An unknown
/// `type` still loads, as [`WidgetConfig::Unsupported`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RawWidget", from = "RawWidget")]
pub struct WidgetInstance {
    pub i: String,
    pub config: WidgetConfig,
    pub x: u32,
    pub y: u32,
    pub w: u8,
    pub h: u8,
}

impl WidgetInstance {
    pub fn widget_type(&self) -> Option<WidgetType> {
        self.config.widget_type()
    }
}

#[derive(Serialize, Deserialize)]
struct RawWidget {
    i: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    config: ConfigFields,
    #[serde(default)]
    x: u32,
    #[serde(default)]
    y: u32,
    #[serde(default)]
    w: Option<i64>,
    #[serde(default)]
    h: Option<i64>,
}

impl From<WidgetInstance> for RawWidget {
    fn from(widget: WidgetInstance) -> Self {
        RawWidget {
            i: widget.i,
            kind: widget.config.tag().to_string(),
            config: widget.config.to_fields(),
            x: widget.x,
            y: widget.y,
            w: Some(widget.w as i64),
            h: Some(widget.h as i64),
        }
    }
}

impl From<RawWidget> for WidgetInstance {
    fn from(raw: RawWidget) -> Self {
        let config = match WidgetType::parse(&raw.kind) {
            Some(kind) => WidgetConfig::from_fields(kind, &raw.config),
            None => WidgetConfig::Unsupported(UnsupportedConfig {
                tag: raw.kind,
                fields: raw.config,
            }),
        };
        WidgetInstance {
            i: raw.i,
            config,
            x: raw.x,
            y: raw.y,
            w: clamp_span(raw.w),
            h: clamp_span(raw.h),
        }
    }
}
