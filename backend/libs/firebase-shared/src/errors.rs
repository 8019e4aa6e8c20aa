use thiserror::Error;

/// Firebase client error types
#[derive(Error, Debug)]
pub enum FirebaseError {
    #[error("Failed to read service account file: {0}")]
    CredentialsIo(#[from] std::io::Error),

    #[error("Invalid service account JSON: {0}")]
    CredentialsParse(#[from] serde_json::Error),

    #[error("Failed to parse private key: {0}")]
    KeyParseError(String),

    #[error("Failed to encode JWT: {0}")]
    JwtEncodeError(String),

    #[error("Token request failed with status: {0}")]
    TokenRequestFailed(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Firebase API error: {0} - {1}")]
    ApiError(String, String),

    #[error("Invalid ID token: {0}")]
    InvalidIdToken(String),

    #[error("No signing key matches kid {0}")]
    UnknownSigningKey(String),
}
