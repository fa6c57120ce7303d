// Report editor - orchestrates one draft report between palette, canvas and store
use crate::application::clock::Clock;
use crate::application::grid_layout::{reconcile, staggered_column, Geometry, Placement, GRID_COLUMNS};
use crate::application::report_store::{ReportStore, StoreError};
use crate::application::widget_config::{validate_for_save, ConfigWarning, WidgetDraft};
use crate::domain::report::{Report, ReportPatch, TimeRange};
use crate::domain::widget::{ConfigFields, WidgetConfig, WidgetInstance, WidgetType, DEFAULT_WIDGET_SPAN};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("{0}")]
    Validation(String),
    #[error("report {0} not found")]
    ReportNotFound(String),
    #[error("widget {0} not found")]
    WidgetNotFound(String),
    #[error("no widget configuration in progress")]
    NoActiveDraft,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the configuration draft will be applied to on submit.
#[derive(Debug, Clone, PartialEq)]
enum DraftTarget {
    New,
    Existing(String),
}

/// Outcome of submitting a widget draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedWidget {
    pub i: String,
    pub warnings: Vec<ConfigWarning>,
}

/// Editable copy of a report. Nothing reaches the store until [`ReportEditor::save`].
pub struct ReportEditor {
    clock: Arc<dyn Clock>,
    id: Option<String>,
    pub name: String,
    pub description: String,
    pub time_range: TimeRange,
    components: Vec<WidgetInstance>,
    active: Option<(DraftTarget, WidgetDraft)>,
}

impl ReportEditor {
    /// Start an empty draft for a new report.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            id: None,
            name: String::new(),
            description: String::new(),
            time_range: TimeRange::default(),
            components: Vec::new(),
            active: None,
        }
    }

    /// Load an existing report into a draft.
    pub fn open(store: &ReportStore, id: &str, clock: Arc<dyn Clock>) -> Result<Self, EditorError> {
        let report = store
            .get(id)
            .ok_or_else(|| EditorError::ReportNotFound(id.to_string()))?;

        Ok(Self {
            clock,
            id: Some(report.id.clone()),
            name: report.name.clone(),
            description: report.description.clone(),
            time_range: report.time_range,
            components: report.components.clone(),
            active: None,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn components(&self) -> &[WidgetInstance] {
        &self.components
    }

    /// Open a blank configuration draft for a widget of `kind`.
    pub fn begin_add(&mut self, kind: WidgetType) -> &mut WidgetDraft {
        let (_, draft) = self
            .active
            .insert((DraftTarget::New, WidgetDraft::initialize(kind, None)));
        draft
    }

    /// Open a configuration draft seeded from widget `i`.
    pub fn begin_edit(&mut self, i: &str) -> Result<&mut WidgetDraft, EditorError> {
        let widget = self
            .components
            .iter()
            .find(|w| w.i == i)
            .ok_or_else(|| EditorError::WidgetNotFound(i.to_string()))?;

        let draft = WidgetDraft::edit(&widget.config).ok_or_else(|| unsupported(widget))?;
        let (_, draft) = self.active.insert((DraftTarget::Existing(i.to_string()), draft));
        Ok(draft)
    }

    pub fn active_draft(&mut self) -> Option<&mut WidgetDraft> {
        self.active.as_mut().map(|(_, draft)| draft)
    }

    pub fn cancel_draft(&mut self) {
        self.active = None;
    }

    /// Commit the active draft: replace the edited widget's config, or add a new widget.
    pub fn submit_widget(&mut self) -> Result<SubmittedWidget, EditorError> {
        let (target, draft) = self.active.take().ok_or(EditorError::NoActiveDraft)?;
        let kind = draft.kind;
        let config = draft.commit();
        let warnings = validate_for_save(&config);

        let i = match target {
            DraftTarget::Existing(i) => {
                let widget = self
                    .components
                    .iter_mut()
                    .find(|w| w.i == i)
                    .ok_or_else(|| EditorError::WidgetNotFound(i.clone()))?;
                widget.config = config;
                i
            }
            DraftTarget::New => {
                let (w, h) = config.size();
                let i = self.fresh_widget_id(kind, None);
                self.place(i.clone(), config, w, h);
                i
            }
        };

        Ok(SubmittedWidget { i, warnings })
    }

    /// Shortcut for the add flow when the whole configuration is already known.
    pub fn add_widget(&mut self, kind: WidgetType, fields: &ConfigFields) -> Result<SubmittedWidget, EditorError> {
        let seeded = WidgetDraft::initialize(kind, Some(fields));
        self.active = Some((DraftTarget::New, seeded));
        self.submit_widget()
    }

    /// Shortcut for the edit flow with a complete replacement configuration.
    pub fn edit_widget(&mut self, i: &str, fields: &ConfigFields) -> Result<SubmittedWidget, EditorError> {
        let widget = self
            .components
            .iter()
            .find(|w| w.i == i)
            .ok_or_else(|| EditorError::WidgetNotFound(i.to_string()))?;
        let kind = widget.widget_type().ok_or_else(|| unsupported(widget))?;

        self.active = Some((
            DraftTarget::Existing(i.to_string()),
            WidgetDraft::initialize(kind, Some(fields)),
        ));
        self.submit_widget()
    }

    pub fn remove_widget(&mut self, i: &str) -> bool {
        let before = self.components.len();
        self.components.retain(|w| w.i != i);
        self.components.len() != before
    }

    /// Apply geometry reported by the grid after a drag or resize.
    pub fn apply_layout(&mut self, items: &[Geometry]) -> usize {
        reconcile(&mut self.components, items)
    }

    /// Merge a batch of suggested widgets, each with a fresh id and default geometry.
    pub fn apply_suggestions(&mut self, suggestions: Vec<(WidgetType, ConfigFields)>) -> Vec<String> {
        let mut added = Vec::with_capacity(suggestions.len());
        for (index, (kind, fields)) in suggestions.into_iter().enumerate() {
            let config = WidgetConfig::from_fields(kind, &fields);
            let i = self.fresh_widget_id(kind, Some(index));
            self.place(i.clone(), config, DEFAULT_WIDGET_SPAN, DEFAULT_WIDGET_SPAN);
            added.push(i);
        }
        added
    }

    /// Persist the draft: create when new, update when it came from the store.
    pub fn save(&mut self, store: &mut ReportStore) -> Result<Report, EditorError> {
        if self.name.trim().is_empty() {
            return Err(EditorError::Validation("Please enter a report name".to_string()));
        }

        match &self.id {
            Some(id) => {
                let patch = ReportPatch {
                    name: Some(self.name.clone()),
                    description: Some(self.description.clone()),
                    time_range: Some(self.time_range),
                    components: Some(self.components.clone()),
                };
                if !store.update(id, patch)? {
                    return Err(EditorError::ReportNotFound(id.clone()));
                }
                store
                    .get(id)
                    .cloned()
                    .ok_or_else(|| EditorError::ReportNotFound(id.clone()))
            }
            None => {
                let report = store.create(
                    self.name.clone(),
                    self.description.clone(),
                    self.time_range,
                    self.components.clone(),
                )?;
                self.id = Some(report.id.clone());
                Ok(report)
            }
        }
    }

    fn place(&mut self, i: String, config: WidgetConfig, w: u8, h: u8) {
        let x = staggered_column(self.components.len()).min(GRID_COLUMNS - w as u32);
        let y = Placement::AppendBelow.resolve(&self.components, x, w as u32);
        self.components.push(WidgetInstance { i, config, x, y, w, h });
    }

    /// `<type>-<millis>` or `<type>-<millis>-<index>`, bumped until unique in this report.
    fn fresh_widget_id(&self, kind: WidgetType, index: Option<usize>) -> String {
        let mut millis = self.clock.now().timestamp_millis();
        loop {
            let i = match index {
                Some(index) => format!("{}-{}-{}", kind, millis, index),
                None => format!("{}-{}", kind, millis),
            };
            if self.components.iter().all(|w| w.i != i) {
                return i;
            }
            millis += 1;
        }
    }
}

fn unsupported(widget: &WidgetInstance) -> EditorError {
    EditorError::Validation(format!("widget {} has unsupported type {}", widget.i, widget.config.tag()))
}
