// Domain layer - Plain data types shared by every other layer
pub mod reference;
pub mod report;
pub mod telemetry;
pub mod ticket;
pub mod widget;
