use std::io;

use wisent_decoder::DecodeError;

/// Errors from a decode session.
///
/// ```text
///   SessionError
///   ├── InvalidUrl   ← server URL unusable as a base
///   ├── Remote       ← service answered with a non-success status
///   ├── Transport    ← service unreachable, connection dropped
///   ├── Attach       ← shared memory region could not be opened or mapped
///   └── Decode       ← the buffer itself is bad
/// ```
///
/// None of these are retried. A failed session is started over from the
/// load request.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid server url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The raw response body is kept as the service sent it.
    #[error("{operation} failed with status {status}: {body}")]
    Remote {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation} request failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    #[error("cannot attach shared memory region {name:?}: {source}")]
    Attach {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
