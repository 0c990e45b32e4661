//! Errors surfaced by the [`crate::sender::Sender`] and
//! [`crate::receiver::Receiver`] APIs.
//!
//! Link-level unreliability never shows up here: loss, duplicates and
//! malformed datagrams are absorbed by retransmission and cumulative ACKs.
//! What remains is setup failure and use after the engine has shut down.

use crate::config::ConfigError;
use crate::link::LinkError;

#[derive(Debug, thiserror::Error)]
pub enum SwpError {
    /// Rejected [`crate::config::SwpConfig`].
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The link could not be set up.
    #[error(transparent)]
    Link(#[from] LinkError),
    /// The engine's background task or its link is gone.
    #[error("engine closed")]
    Closed,
}
