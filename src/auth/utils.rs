use super::error::AuthenticationError;
use super::session::SessionData;

/// Read access to the outcome of the last login attempt
#[cfg_attr(test, mockall::automock)]
pub trait AuthenticationUtils {
    fn last_username(&self) -> Option<String>;

    fn last_authentication_error(&self) -> Option<AuthenticationError>;
}

/// Reads the last attempt out of the session.
///
/// The error is taken out of the session so a failure is reported once;
/// the username stays for later pre-fills.
#[derive(Debug, Clone, Default)]
pub struct SessionAuthenticationUtils {
    last_username: Option<String>,
    last_error: Option<AuthenticationError>,
}

impl SessionAuthenticationUtils {
    pub fn from_session(session: &mut SessionData) -> Self {
        Self {
            last_username: session.last_username.clone(),
            last_error: session.last_error.take(),
        }
    }
}

impl AuthenticationUtils for SessionAuthenticationUtils {
    fn last_username(&self) -> Option<String> {
        self.last_username.clone()
    }

    fn last_authentication_error(&self) -> Option<AuthenticationError> {
        self.last_error.clone()
    }
}
