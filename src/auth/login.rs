/// Login and Logout Routes
///
/// The login view is pre-filled from the last attempt. Credential checking
/// and logout are done by the firewall before these handlers run.
use axum::{
    Extension,
    extract::State,
    response::{Html, Response},
};
use serde::Serialize;
use serde_json::json;

use super::error::AuthenticationError;
use super::session::SessionHandle;
use super::utils::{AuthenticationUtils, SessionAuthenticationUtils};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::response::RequestContext;

/// Initial values of the login form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginFormData {
    pub username: Option<String>,
    pub remember_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginViewModel {
    pub form: LoginFormData,
    pub error: Option<AuthenticationError>,
}

/// Compose the login view from the last attempt.
///
/// In debug mode "remember me" starts checked so developers are not logged
/// out between restarts.
pub fn prepare_login_view(utils: &dyn AuthenticationUtils, debug: bool) -> LoginViewModel {
    LoginViewModel {
        form: LoginFormData {
            username: utils.last_username(),
            remember_me: debug,
        },
        error: utils.last_authentication_error(),
    }
}

/// `GET|POST /login`
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    ctx: RequestContext,
) -> AppResult<Html<String>> {
    let utils = SessionAuthenticationUtils::from_session(&mut *session.lock().await);
    let view = prepare_login_view(&utils, state.config.debug);

    state.renderer.render(
        "login",
        &json!({
            "form": view.form,
            "error": view.error.as_ref().map(|e| e.message_key()),
            "action": ctx.url_for(&state.config.firewall.check_path),
            "home": ctx.url_for(&state.config.home_route),
        }),
    )
}

/// Target of the logout route.
///
/// The firewall handles logout before routing, so reaching this body means
/// the firewall is not wired to the logout path.
pub fn logout_stub() -> AppResult<Response> {
    Err(AppError::configuration(
        "the logout route was reached; the firewall must intercept the configured logout path",
    ))
}

/// any method on the logout path
pub async fn logout() -> AppResult<Response> {
    logout_stub()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::utils::MockAuthenticationUtils;

    fn utils(
        username: Option<&str>,
        error: Option<AuthenticationError>,
    ) -> MockAuthenticationUtils {
        let username = username.map(str::to_string);
        let mut utils = MockAuthenticationUtils::new();
        utils
            .expect_last_username()
            .times(1)
            .returning(move || username.clone());
        utils
            .expect_last_authentication_error()
            .times(1)
            .returning(move || error.clone());
        utils
    }

    #[test]
    fn test_debug_mode_prechecks_remember_me() {
        let view = prepare_login_view(&utils(None, None), true);
        assert_eq!(
            view,
            LoginViewModel {
                form: LoginFormData {
                    username: None,
                    remember_me: true,
                },
                error: None,
            }
        );
    }

    #[test]
    fn test_production_mode_leaves_remember_me_unchecked() {
        let view = prepare_login_view(&utils(None, None), false);
        assert!(!view.form.remember_me);
        assert_eq!(view.form.username, None);
        assert_eq!(view.error, None);
    }

    #[test]
    fn test_last_attempt_is_passed_through() {
        let view = prepare_login_view(
            &utils(Some("alice"), Some(AuthenticationError::BadCredentials)),
            false,
        );
        assert_eq!(view.form.username.as_deref(), Some("alice"));
        assert!(!view.form.remember_me);
        assert_eq!(view.error, Some(AuthenticationError::BadCredentials));
    }

    #[test]
    fn test_logout_stub_signals_configuration_error() {
        let err = logout_stub().unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_logout_handler_never_returns_a_page() {
        assert!(logout().await.is_err());
    }
}
