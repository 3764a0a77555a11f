#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod output;
pub mod settings;
pub mod version;

pub use config::{load, Config};
pub use error::{Error, Result};
pub use output::OutputFormat;
pub use settings::Settings;
