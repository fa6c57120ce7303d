// HTTP request handlers for reports and reference data
use crate::application::grid_layout::Geometry;
use crate::application::registry::PaletteEntry;
use crate::application::report_editor::{ReportEditor, SubmittedWidget};
use crate::application::widget_config::available_variables;
use crate::application::widget_data::RenderedReport;
use crate::domain::reference::{Company, DataloggerOption};
use crate::domain::report::{Report, ReportPatch, TimeRange};
use crate::domain::widget::{ConfigFields, WidgetType};
use crate::infrastructure::http_response::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_VIEWPORT_WIDTH: u32 = 1200;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesRequest {
    #[serde(default)]
    pub datalogger_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct VariablesResponse {
    pub variables: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub time_range: TimeRange,
}

#[derive(Deserialize)]
pub struct AddWidgetRequest {
    #[serde(rename = "type")]
    pub kind: WidgetType,
    #[serde(default)]
    pub config: ConfigFields,
}

#[derive(Deserialize)]
pub struct EditWidgetRequest {
    #[serde(default)]
    pub config: ConfigFields,
}

#[derive(Serialize)]
pub struct WidgetResponse {
    #[serde(flatten)]
    pub widget: SubmittedWidget,
    pub report: Report,
}

#[derive(Serialize)]
pub struct LayoutResponse {
    pub applied: usize,
    pub report: Report,
}

#[derive(Deserialize)]
pub struct SuggestionRequest {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct SuggestionResponse {
    pub added: Vec<String>,
    pub report: Report,
}

#[derive(Deserialize)]
pub struct RenderQuery {
    pub width: Option<u32>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn palette(State(state): State<Arc<AppState>>) -> Json<Vec<PaletteEntry>> {
    Json(state.registry.palette())
}

pub async fn list_companies(State(state): State<Arc<AppState>>) -> Json<Vec<Company>> {
    Json(state.reference.companies().to_vec())
}

pub async fn list_dataloggers(State(state): State<Arc<AppState>>) -> Json<Vec<DataloggerOption>> {
    Json(state.reference.datalogger_options())
}

/// Variables offered for a datalogger selection
pub async fn variables_for_selection(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VariablesRequest>,
) -> Json<VariablesResponse> {
    Json(VariablesResponse {
        variables: available_variables(&request.datalogger_ids, state.reference.as_ref()),
    })
}

pub async fn list_reports(State(state): State<Arc<AppState>>) -> Json<Vec<Report>> {
    Json(state.reports.lock().await.list().to_vec())
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<Report>), ApiError> {
    let mut editor = ReportEditor::new(state.clock.clone());
    editor.name = request.name;
    editor.description = request.description;
    editor.time_range = request.time_range;

    let mut reports = state.reports.lock().await;
    let report = editor.save(&mut reports)?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn get_report(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Report>, ApiError> {
    let reports = state.reports.lock().await;
    reports
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::report_not_found(&id))
}

pub async fn update_report(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<ReportPatch>,
) -> Result<Json<Report>, ApiError> {
    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::Validation("Please enter a report name".to_string()));
    }

    let mut reports = state.reports.lock().await;
    if !reports.update(&id, patch)? {
        return Err(ApiError::report_not_found(&id));
    }
    reports
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::report_not_found(&id))
}

pub async fn delete_report(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    if state.reports.lock().await.delete(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::report_not_found(&id))
    }
}

pub async fn add_widget(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddWidgetRequest>,
) -> Result<(StatusCode, Json<WidgetResponse>), ApiError> {
    let mut reports = state.reports.lock().await;
    let mut editor = ReportEditor::open(&reports, &id, state.clock.clone())?;

    let submitted = editor.add_widget(request.kind, &request.config)?;
    let report = editor.save(&mut reports)?;

    Ok((
        StatusCode::CREATED,
        Json(WidgetResponse {
            widget: submitted,
            report,
        }),
    ))
}

pub async fn edit_widget(
    Path((id, i)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<EditWidgetRequest>,
) -> Result<Json<WidgetResponse>, ApiError> {
    let mut reports = state.reports.lock().await;
    let mut editor = ReportEditor::open(&reports, &id, state.clock.clone())?;

    let submitted = editor.edit_widget(&i, &request.config)?;
    let report = editor.save(&mut reports)?;

    Ok(Json(WidgetResponse {
        widget: submitted,
        report,
    }))
}

pub async fn remove_widget(
    Path((id, i)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Report>, ApiError> {
    let mut reports = state.reports.lock().await;
    let mut editor = ReportEditor::open(&reports, &id, state.clock.clone())?;

    if !editor.remove_widget(&i) {
        return Err(ApiError::NotFound(format!("widget {} not found", i)));
    }
    Ok(Json(editor.save(&mut reports)?))
}

/// Geometry reported by the grid after a drag or resize
pub async fn update_layout(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(items): Json<Vec<Geometry>>,
) -> Result<Json<LayoutResponse>, ApiError> {
    let mut reports = state.reports.lock().await;
    let mut editor = ReportEditor::open(&reports, &id, state.clock.clone())?;

    let applied = editor.apply_layout(&items);
    let report = editor.save(&mut reports)?;

    Ok(Json(LayoutResponse { applied, report }))
}

pub async fn suggest_widgets(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, ApiError> {
    // Suggestions are gathered before the store is locked
    let suggestions = state.suggester.suggest(&request.prompt).await;

    let mut reports = state.reports.lock().await;
    let mut editor = ReportEditor::open(&reports, &id, state.clock.clone())?;

    let added = editor.apply_suggestions(suggestions);
    let report = editor.save(&mut reports)?;

    Ok(Json(SuggestionResponse { added, report }))
}

/// Layout for the requested viewport plus render-ready widget views
pub async fn render_report(
    Path(id): Path<String>,
    Query(query): Query<RenderQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<RenderedReport>, ApiError> {
    let width = query.width.unwrap_or(DEFAULT_VIEWPORT_WIDTH);

    let report = state
        .reports
        .lock()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::report_not_found(&id))?;

    Ok(Json(state.widget_data.render_report(&report, width, state.clock.now())))
}
