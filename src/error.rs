use std::fmt::Display;

use thiserror::Error;

/// Errors that can occur while loading basemaps or rendering a map.
#[derive(Debug, Error)]
pub enum KaartError {
    /// Malformed basemap or map-definitions document.
    #[error("Parse error in {context}: {message}")]
    Parse {
        /// What was being parsed (file name or document kind).
        context: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Color that is neither hex nor a known color name.
    #[error("Unknown color: {0}")]
    Color(String),

    /// Output format outside the supported set, or not compiled in.
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Reading a basemap/config file or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raster canvas allocation or encoding failed.
    #[error("Image error: {message}")]
    Image {
        /// Description of what went wrong.
        message: String,
    },
}

impl KaartError {
    pub(crate) fn parse(context: impl Into<String>, err: impl Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn image(err: impl Display) -> Self {
        Self::Image {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KaartError>;
