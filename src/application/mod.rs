// Application layer - Use cases over the domain model
pub mod attachment_resolver;
pub mod clock;
pub mod grid_layout;
pub mod reference_data;
pub mod registry;
pub mod report_editor;
pub mod report_store;
pub mod suggestions;
pub mod ticket_store;
pub mod widget_config;
pub mod widget_data;
