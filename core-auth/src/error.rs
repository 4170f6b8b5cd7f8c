use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The server answered with a non-2xx status.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response (DNS, refused, timeout).
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl AuthError {
    /// Whether the failure happened below HTTP (no server response).
    pub fn is_network(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }

    /// Message suitable for showing next to a login or registration form.
    pub fn user_message(&self) -> &str {
        match self {
            AuthError::Rejected { message, .. } => message,
            AuthError::Network(_) => "Network error: check your connection",
            AuthError::InvalidResponse(_) => "Unexpected response from server",
            AuthError::SecureStorageUnavailable(_) => "Could not access secure storage",
            AuthError::NotAuthenticated => "Not signed in",
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
