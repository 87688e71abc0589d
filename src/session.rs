//! Explicit user context handed to each task attempt.
//!
//! Replaces ambient browser storage: whoever opens a task view passes the
//! session in, and nothing in the crate reads user identity from globals.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    username: Option<String>,
}

impl Session {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_user(username: impl Into<String>) -> Self {
        let username = username.into();
        if username.trim().is_empty() { Self::anonymous() } else { Self { username: Some(username) } }
    }

    /// Session for `STEPCHECK_USER`, anonymous when unset or blank.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("STEPCHECK_USER").map_or_else(|_| Self::anonymous(), Self::for_user)
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
