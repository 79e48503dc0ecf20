use std::path::PathBuf;
use thiserror::Error;

use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum QuillError {
    // Config errors
    #[error("CONFIG_PARSE_ERROR: {0}")]
    ConfigParseError(String),

    #[error("CONFIG_INVALID_VALUE: {field}: {reason}")]
    ConfigInvalidValue { field: String, reason: String },

    #[error("CONFIG_NOT_FOUND: '{path}' does not exist")]
    ConfigNotFound { path: PathBuf },

    // Template errors
    #[error("TEMPLATE_ERROR: {0}")]
    Template(#[from] TemplateError),

    // IO errors
    #[error("IO_ERROR: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<toml::de::Error> for QuillError {
    fn from(err: toml::de::Error) -> Self {
        QuillError::ConfigParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QuillError>;
