//! Error types for the feed side

use thiserror::Error;

/// Errors from feed providers and the pagination layer
#[derive(Debug, Error)]
pub enum FeedError {
    /// Remote transport failure; the orchestrator owns retry policy
    #[error("Transport error: {0}")]
    Transport(String),

    /// The session is not authorized for the requested operation
    #[error("Not authorized: {0}")]
    Auth(String),

    /// Session token could not be loaded or persisted
    #[error("Session error: {0}")]
    Session(String),

    /// Local I/O failure (login prompts, session files)
    #[error("I/O error: {0}")]
    Io(String),

    /// The channel identity does not resolve on the remote side
    #[error("Unknown peer: {0}")]
    UnknownPeer(String),
}
