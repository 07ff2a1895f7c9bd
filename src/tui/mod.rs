//! Two-pane terminal chat panel
//!
//! Roster on the left, the open conversation and compose box on the right.

mod app;
mod backend;
mod compose;
mod log_capture;
mod messages;
mod sidebar;
mod ui;

pub use app::run;
pub use log_capture::LogBuffer;
