use thiserror::Error;

/// Fatal conditions. Every variant is terminal at the point of detection:
/// the message goes to stderr and the process exits with code 1. The only
/// retry behavior in the client is the deliberate contention poll in
/// `acquire`; nothing here is ever recovered from.
#[derive(Debug, Error)]
pub enum Error {
    /// Network or connection failure. Never retried, not even during the
    /// acquisition poll.
    #[error("The HTTP request failed with error {0}")]
    Transport(String),

    /// The mutex is held by someone else and no timeout budget was given.
    #[error("Could not lock mutex!")]
    LockUnavailable,

    /// The mutex stayed contended past the acquisition deadline.
    #[error("Timeout ellapsed. Could not lock mutex!")]
    AcquisitionTimeout,

    /// The service rejected a keep-alive refresh; the token is dead.
    #[error("Could not refresh anymore")]
    RefreshDenied,

    /// Token output was requested but the response carries no usable token.
    #[error("Could not lock mutex!")]
    MalformedResponse,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
