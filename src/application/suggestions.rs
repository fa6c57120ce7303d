// Widget suggestions from a free-text prompt
use crate::application::reference_data::ReferenceDataProvider;
use crate::domain::widget::{ConfigFields, WidgetType};
use async_trait::async_trait;
use std::sync::Arc;

pub type Suggestion = (WidgetType, ConfigFields);

#[async_trait]
pub trait WidgetSuggester: Send + Sync {
    /// Proposed widgets for `prompt`, in the order they should be added.
    async fn suggest(&self, prompt: &str) -> Vec<Suggestion>;
}

/// Matches variable names from the reference data against the prompt.
pub struct KeywordSuggester {
    reference: Arc<dyn ReferenceDataProvider>,
}

impl KeywordSuggester {
    pub fn new(reference: Arc<dyn ReferenceDataProvider>) -> Self {
        Self { reference }
    }

    /// (datalogger, variable) for every distinct variable named in the prompt.
    fn matches(&self, prompt: &str) -> Vec<(String, String)> {
        let prompt = prompt.to_lowercase();
        let mut found: Vec<(String, String)> = Vec::new();

        for option in self.reference.datalogger_options() {
            for variable in option.variables {
                if found.iter().any(|(_, v)| v == &variable) {
                    continue;
                }
                if prompt.contains(&variable.to_lowercase()) {
                    found.push((option.id.clone(), variable));
                }
            }
        }

        found
    }

    fn default_pair(&self) -> Vec<Suggestion> {
        let datalogger_id = self.reference.datalogger_options().into_iter().next().map(|o| o.id);

        vec![
            (
                WidgetType::Chart,
                ConfigFields {
                    title: Some("Temperature Trends".to_string()),
                    datalogger_id: datalogger_id.clone(),
                    variable: Some("temperatura".to_string()),
                    ..ConfigFields::default()
                },
            ),
            (
                WidgetType::Stat,
                ConfigFields {
                    title: Some("Average PM2.5".to_string()),
                    datalogger_id,
                    variable: Some("PM2.5".to_string()),
                    unit: Some("µg/m³".to_string()),
                    ..ConfigFields::default()
                },
            ),
        ]
    }
}

#[async_trait]
impl WidgetSuggester for KeywordSuggester {
    async fn suggest(&self, prompt: &str) -> Vec<Suggestion> {
        let matches = self.matches(prompt);
        if matches.is_empty() {
            tracing::debug!("No variables recognised in prompt, using default suggestions");
            return self.default_pair();
        }

        let mut suggestions: Vec<Suggestion> = matches
            .iter()
            .map(|(datalogger_id, variable)| {
                (
                    WidgetType::Chart,
                    ConfigFields {
                        title: Some(format!("{} Trends", variable)),
                        datalogger_ids: Some(vec![datalogger_id.clone()]),
                        variables: Some(vec![variable.clone()]),
                        ..ConfigFields::default()
                    },
                )
            })
            .collect();

        let (datalogger_id, variable) = &matches[0];
        suggestions.push((
            WidgetType::Stat,
            ConfigFields {
                title: Some(format!("Latest {}", variable)),
                datalogger_ids: Some(vec![datalogger_id.clone()]),
                variables: Some(vec![variable.clone()]),
                unit: unit_for(variable).map(str::to_string),
                ..ConfigFields::default()
            },
        ));

        tracing::info!("Suggested {} widgets for {} matched variables", suggestions.len(), matches.len());
        suggestions
    }
}

fn unit_for(variable: &str) -> Option<&'static str> {
    match variable {
        "PM2.5" | "PM10" => Some("µg/m³"),
        "temperatura" => Some("°C"),
        "humedad" => Some("%"),
        "CO2" => Some("ppm"),
        "ruido" => Some("dB"),
        _ => None,
    }
}
