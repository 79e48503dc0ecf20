// Core modules
pub mod config;
pub mod error;
pub mod path;
pub mod template;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{QuillError, Result};
pub use template::{CompileOptions, Context, Engine, Template, TemplateError};
