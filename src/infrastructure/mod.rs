// Infrastructure layer - External dependencies and adapters
pub mod attachments;
pub mod config;
pub mod http_response;
pub mod reference_file;
pub mod storage;
