// Presentation layer - HTTP routing and handlers
pub mod app_state;
pub mod handlers;
pub mod tickets;

use crate::presentation::app_state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/palette", get(handlers::palette))
        .route("/reference/companies", get(handlers::list_companies))
        .route("/reference/dataloggers", get(handlers::list_dataloggers))
        .route("/reference/variables", post(handlers::variables_for_selection))
        .route("/reports", get(handlers::list_reports).post(handlers::create_report))
        .route(
            "/reports/:id",
            get(handlers::get_report)
                .put(handlers::update_report)
                .delete(handlers::delete_report),
        )
        .route("/reports/:id/widgets", post(handlers::add_widget))
        .route(
            "/reports/:id/widgets/:i",
            put(handlers::edit_widget).delete(handlers::remove_widget),
        )
        .route("/reports/:id/layout", put(handlers::update_layout))
        .route("/reports/:id/suggestions", post(handlers::suggest_widgets))
        .route("/reports/:id/render", get(handlers::render_report))
        .route("/tickets", get(tickets::list_tickets).post(tickets::create_ticket))
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route(
            "/tickets/:id/messages",
            post(tickets::post_message).layer(DefaultBodyLimit::max(tickets::MAX_MESSAGE_BODY_BYTES)),
        )
        .with_state(state)
}
