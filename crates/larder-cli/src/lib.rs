//! Operator console for Larder

mod loader;
mod logging;
mod menu;
mod session;
mod ui;

#[cfg(test)]
mod tests;

pub use loader::{LoadFailure, LoadedRecords, load_records};
pub use logging::init_logging;
pub use menu::MenuChoice;
pub use session::{Session, UploadOutcome};
pub use ui::{display_banner, print_answer, print_failure, print_menu};

pub use larder_core::{Error, Result};
