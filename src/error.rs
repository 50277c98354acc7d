use thiserror::Error;

/// Failures surfaced by the reading core and its collaborators.
///
/// Reaching the start or end of the canon is not an error; pagination
/// reports those as boundary outcomes instead.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("scripture data unavailable: {0}")]
    DataUnavailable(String),

    #[error("sign in required")]
    AuthRequired,

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

impl ReaderError {
    /// Short text for the status line of the reader.
    pub fn user_message(&self) -> String {
        match self {
            ReaderError::DataUnavailable(_) => "Could not load the scripture text".to_string(),
            ReaderError::AuthRequired => "Sign in to use favorites and notes (luz --user NAME)".to_string(),
            ReaderError::PersistenceFailure(_) => "Could not save, please try again".to_string(),
            ReaderError::InvalidReference(reference) => format!("Unknown reference: {}", reference),
        }
    }
}

impl From<rusqlite::Error> for ReaderError {
    fn from(err: rusqlite::Error) -> Self {
        ReaderError::PersistenceFailure(err.to_string())
    }
}

impl From<reqwest::Error> for ReaderError {
    fn from(err: reqwest::Error) -> Self {
        ReaderError::DataUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for ReaderError {
    fn from(err: serde_json::Error) -> Self {
        ReaderError::DataUnavailable(format!("malformed dataset: {}", err))
    }
}
