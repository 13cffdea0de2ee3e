mod error;
pub mod metric_tracker;
mod settings;

pub use error::{Error, Result};
pub use settings::Settings;
