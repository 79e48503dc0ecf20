//! Constants shared across the engine

/// Rendering error marker
pub mod marker {
    /// Opens the visible marker a failed render is replaced with
    pub const ERROR_OPEN: &str = "<pre>";

    pub const ERROR_CLOSE: &str = "</pre>";
}
