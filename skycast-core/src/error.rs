use std::time::Duration;

/// Failure taxonomy for the acquisition pipeline.
///
/// Callers (the CLI, or any other frontend) are expected to match on these
/// variants for presentation; the core never retries on its own.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad input from the caller, e.g. out-of-range coordinates or a
    /// too-short search query. Never retried.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Admission denied by the rate limiter.
    #[error("rate limit exceeded, retry in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// The provider answered with a non-2xx status.
    #[error("provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    /// Transport-level failure: DNS, timeout, connection reset.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider answered 2xx but the payload did not match the
    /// expected shape. Snapshots built from such payloads are never cached.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// No API key is configured; no request was issued.
    #[error("no provider API key configured")]
    NotConfigured,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short, user-facing message for this failure.
    ///
    /// Provider statuses are mapped to the categories users can act on;
    /// everything else collapses to a generic connectivity/provider fault.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) => msg.clone(),
            Error::RateLimited { retry_after } => {
                format!("Too many requests. Try again in {}s.", retry_after.as_secs().max(1))
            }
            Error::Provider { status: 401, .. } => {
                "Invalid API key. Run `skycast configure` to update it.".to_string()
            }
            Error::Provider { status: 404, .. } => "Location not found.".to_string(),
            Error::Provider { status: 429, .. } => {
                "The weather provider is receiving too many requests. Try again later.".to_string()
            }
            Error::Provider { status, .. } => {
                format!("The weather provider returned an error (status {status}).")
            }
            Error::Network(_) => "Could not reach the weather provider. Check your connection.".to_string(),
            Error::MalformedResponse(_) => "The weather provider returned unexpected data.".to_string(),
            Error::NotConfigured => {
                "No API key configured. Run `skycast configure` first.".to_string()
            }
        }
    }
}
