// Widget configuration drafts - seed, toggle selections, commit
use crate::application::reference_data::ReferenceDataProvider;
use crate::domain::widget::{ConfigFields, WidgetConfig, WidgetType};
use serde::Serialize;

/// In-progress configuration of one widget, held by the editor until submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDraft {
    pub kind: WidgetType,
    pub fields: ConfigFields,
    selected_dataloggers: Vec<String>,
    selected_variables: Vec<String>,
}

/// Why a committed config is not ready to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigWarning {
    NoDataloggers,
    NoVariables,
}

impl WidgetDraft {
    /// Seed a draft from an existing config (edit flow) or from defaults (create flow).
    ///
    /// Legacy singular selectors are folded into the plural selections.
    pub fn initialize(kind: WidgetType, existing: Option<&ConfigFields>) -> Self {
        match existing {
            Some(fields) => Self {
                kind,
                selected_dataloggers: fields.selected_dataloggers(),
                selected_variables: fields.selected_variables(),
                fields: fields.clone(),
            },
            None => Self {
                kind,
                fields: ConfigFields::default(),
                selected_dataloggers: Vec::new(),
                selected_variables: Vec::new(),
            },
        }
    }

    /// Seed a draft from a widget's current typed config; `None` for unsupported widgets.
    pub fn edit(config: &WidgetConfig) -> Option<Self> {
        let kind = config.widget_type()?;
        Some(Self::initialize(kind, Some(&config.to_fields())))
    }

    pub fn selected_dataloggers(&self) -> &[String] {
        &self.selected_dataloggers
    }

    pub fn selected_variables(&self) -> &[String] {
        &self.selected_variables
    }

    pub fn toggle_datalogger(&mut self, datalogger_id: &str) {
        toggle(&mut self.selected_dataloggers, datalogger_id);
    }

    pub fn toggle_variable(&mut self, variable: &str) {
        toggle(&mut self.selected_variables, variable);
    }

    /// Variables offered for selection: the union over the selected dataloggers only.
    ///
    /// Derived on every call, so deselecting a datalogger shrinks the list.
    pub fn available_variables(&self, reference: &dyn ReferenceDataProvider) -> Vec<String> {
        available_variables(&self.selected_dataloggers, reference)
    }

    /// Merge the selections into the fields and produce the typed config.
    pub fn commit(mut self) -> WidgetConfig {
        self.fields.datalogger_ids = Some(self.selected_dataloggers);
        self.fields.variables = Some(self.selected_variables);
        self.fields.datalogger_id = None;
        self.fields.variable = None;
        WidgetConfig::from_fields(self.kind, &self.fields)
    }
}

fn toggle(selection: &mut Vec<String>, value: &str) {
    if let Some(pos) = selection.iter().position(|v| v == value) {
        selection.remove(pos);
    } else {
        selection.push(value.to_string());
    }
}

/// Union of the variables recorded by `datalogger_ids`, in first-seen order.
pub fn available_variables(datalogger_ids: &[String], reference: &dyn ReferenceDataProvider) -> Vec<String> {
    let mut variables: Vec<String> = Vec::new();
    for company in reference.companies() {
        for (_, datalogger) in company.dataloggers() {
            if !datalogger_ids.contains(&datalogger.id) {
                continue;
            }
            for variable in &datalogger.variables {
                if !variables.contains(variable) {
                    variables.push(variable.clone());
                }
            }
        }
    }
    variables
}

/// Data widgets need at least one datalogger and one variable to show anything.
pub fn validate_for_save(config: &WidgetConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    if let Some(source) = config.source() {
        if source.datalogger_ids.is_empty() {
            warnings.push(ConfigWarning::NoDataloggers);
        }
        if source.variables.is_empty() {
            warnings.push(ConfigWarning::NoVariables);
        }
    }
    warnings
}
