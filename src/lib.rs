pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod ini;
pub mod logging;
pub mod manifest;

// Re-export common types
pub use config::{GeneratorConfig, ImagePullPolicy};
pub use error::GenError;
pub use generator::{FailurePolicy, GenerationReport, Generator};
