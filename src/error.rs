//! Pipeline error taxonomy.
//!
//! Three failure classes cross the public boundary:
//!
//! - [`PipelineError::InvalidArgument`] — malformed or out-of-domain action
//!   parameter. User-correctable; the message carries the expected grammar
//!   (e.g. `"Resize param error, e.g: resize,m_lfit,w_100,h_100"`).
//! - [`PipelineError::NotFound`] — unknown action name, invalid style
//!   reference, or missing stored object.
//! - [`PipelineError::Engine`] / [`PipelineError::Store`] — upstream failures
//!   from the image engine or byte store, surfaced unchanged but annotated
//!   with the action that triggered them.
//!
//! Validation and lookup failures abort the whole request before any partial
//! output is produced. Nothing is retried here.

use crate::engine::EngineError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("engine failure in {action}: {source}")]
    Engine {
        action: String,
        #[source]
        source: EngineError,
    },
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Malformed or out-of-domain parameter, with a corrective hint.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Unknown action, style, or object.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Wrap an engine failure with the name of the action that issued the call.
    pub fn engine(action: impl Into<String>, source: EngineError) -> Self {
        Self::Engine {
            action: action.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
