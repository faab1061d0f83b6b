//! Configuration, errors, logging, and common helpers

pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::{PipelineSettings, Settings};
pub use error::AppError;
pub use logging::init_logger;
