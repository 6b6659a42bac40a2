//! Crate-level error types for the REST client and local validation.

/// Error returned by [`ApiClient`](crate::ApiClient) operations.
///
/// Nothing in this taxonomy is fatal to the caller's process: screens
/// degrade to an empty/error state and show a notice. `Unauthorized` is
/// the one variant with a side effect — by the time the caller sees it,
/// the fallback bearer token has already been cleared from the
/// [`Session`](crate::Session).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network or transport failure.
    ///
    /// The request never produced an HTTP response (DNS, connect,
    /// timeout, TLS). Retrying is left to the caller's periodic
    /// re-fetch; nothing here retries automatically.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered 401.
    ///
    /// The session's bearer token has been cleared. Admin screens treat
    /// this as "redirect to login".
    #[error("authorization required")]
    Unauthorized,

    /// The server answered with a non-success status other than 401.
    ///
    /// `message` carries the server's `message`/`error` body field when
    /// one was present, or the status line otherwise.
    #[error("server returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Human-readable failure description from the response body.
        message: String,
    },

    /// A response body could not be decoded into the expected shape.
    #[error("response decoding failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// Client-side validation rejected the request before submission.
    ///
    /// Used by bulk menu seeding (missing name/description, price <= 0)
    /// and empty partial updates. The request is never sent.
    #[error("validation failed: {0}")]
    Validation(String),
}
