use crate::error::ReaderError;

/// The local identity. Favorites, notes and activity belong to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
}

impl Session {
    pub fn new(user_id: Option<String>) -> Self {
        let user_id = user_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        Self { user_id }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn require_user(&self) -> Result<&str, ReaderError> {
        self.user_id().ok_or(ReaderError::AuthRequired)
    }

    pub fn logout(&mut self) -> Option<String> {
        self.user_id.take()
    }
}
