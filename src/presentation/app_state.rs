// Application state for HTTP handlers
use crate::application::attachment_resolver::AttachmentResolver;
use crate::application::clock::Clock;
use crate::application::reference_data::ReferenceDataProvider;
use crate::application::registry::ComponentRegistry;
use crate::application::report_store::ReportStore;
use crate::application::suggestions::WidgetSuggester;
use crate::application::ticket_store::TicketStore;
use crate::application::widget_data::WidgetDataService;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct AppState {
    pub reports: Mutex<ReportStore>,
    pub tickets: Mutex<TicketStore>,
    pub registry: ComponentRegistry,
    pub reference: Arc<dyn ReferenceDataProvider>,
    pub widget_data: WidgetDataService,
    pub suggester: Arc<dyn WidgetSuggester>,
    pub attachments: Arc<dyn AttachmentResolver>,
    pub clock: Arc<dyn Clock>,
}
