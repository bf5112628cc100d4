use std::collections::TryReserveError;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal pipeline errors.
///
/// Malformed statements are not errors: parsers skip them and record a [`crate::Diagnostic`].
/// Only resource caps and allocation failures abort a parse.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("diagram text is {size} bytes, which exceeds the limit of {limit} bytes")]
    TextTooLarge { size: usize, limit: usize },

    #[error("diagram produced more than {limit} tokens")]
    TooManyTokens { limit: usize },

    #[error("{diagram_type} diagram declares more than {limit} nodes")]
    TooManyNodes {
        diagram_type: &'static str,
        limit: usize,
    },

    #[error("{diagram_type} diagram declares more than {limit} edges")]
    TooManyEdges {
        diagram_type: &'static str,
        limit: usize,
    },

    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
}
