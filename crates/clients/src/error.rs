use mailivo_core::services::ServiceError;

/// Errors from the Landivo and Mailivo REST layers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream API returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Api {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match &err {
            ClientError::Request(e) if e.is_decode() => ServiceError::InvalidResponse(err.to_string()),
            ClientError::Api { status, .. } if *status < 500 => {
                ServiceError::InvalidResponse(err.to_string())
            }
            _ => ServiceError::Unavailable(err.to_string()),
        }
    }
}
