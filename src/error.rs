use crate::geo::BackendError;
use crate::llm::LlmError;

/// Conditions that abort a routing call.
///
/// Unparseable model output and unknown tool names are not here: the router
/// absorbs both into the fallback capability.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("no known city found for \"{query}\"; name one of the configured locations")]
    LocationNotFound { query: String },

    #[error("buffer radius {buffer_km} km is outside {min_km}..={max_km} km")]
    InvalidBuffer {
        buffer_km: u32,
        min_km: u32,
        max_km: u32,
    },

    #[error("tool {tool} was selected, but the query \"{query}\" doesn't match it; likely wrong tool chosen")]
    ToolQueryMismatch { tool: &'static str, query: String },

    #[error("language model service unavailable: {0}")]
    ModelServiceUnavailable(#[from] LlmError),

    #[error("geospatial backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),
}

impl RouteError {
    /// Whether the caller should show a warning rather than a failure.
    pub fn is_user_warning(&self) -> bool {
        matches!(
            self,
            RouteError::LocationNotFound { .. }
                | RouteError::InvalidBuffer { .. }
                | RouteError::ToolQueryMismatch { .. }
        )
    }
}
