// Authentication Module
// Login view preparation, the logout contract, and the firewall/session layer in front of them

pub mod error;
pub mod firewall;
pub mod login;
pub mod session;
pub mod users;
pub mod utils;

pub use error::AuthenticationError;
pub use firewall::{AccessDecision, Firewall};
pub use login::{LoginFormData, LoginViewModel, prepare_login_view};
pub use session::{SessionData, SessionHandle, SessionStore};
pub use users::{AuthenticatedUser, UserProvider};
pub use utils::{AuthenticationUtils, SessionAuthenticationUtils};
