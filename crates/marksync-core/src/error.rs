//! Core error types.

use thiserror::Error;

/// Rejections from URL validation, before any optimistic mutation happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("url must not be empty")]
    Empty,
    #[error("please enter a valid url")]
    Parse(String),
    #[error("only http:// and https:// urls are allowed")]
    UnsupportedScheme(String),
    #[error("url must include a host")]
    MissingHost,
}
