use axum::response::Html;
use handlebars::{Handlebars, handlebars_helper};

use crate::error::{AppError, AppResult};

/// Renders named page templates
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &serde_json::Value) -> AppResult<Html<String>>;
}

/// English strings for translation keys
const CATALOGUE: &[(&str, &str)] = &[
    ("home.title", "Welcome"),
    ("home.signed_in_as", "Signed in as"),
    ("home.anonymous", "You are not signed in."),
    ("nav.login", "Sign in"),
    ("nav.logout", "Sign out"),
    ("login.title", "Sign In"),
    ("login.username", "Username"),
    ("login.password", "Password"),
    ("login.remember_me", "Remember me"),
    ("login.submit", "Sign in"),
    (
        "policy.banner",
        "This site uses cookies to keep you signed in. Please review and accept our policy to continue.",
    ),
    ("policy.accept", "Accept"),
    (
        "policy.accepted",
        "Thank you. Your acceptance of the policy has been recorded.",
    ),
    ("security.login.bad_credentials", "Invalid credentials."),
    (
        "security.login.missing_credentials",
        "Please enter your username and password.",
    ),
    ("security.login.account_disabled", "This account is disabled."),
];

/// Look up a translation; unknown keys render as themselves
pub fn translate(key: &str) -> &str {
    CATALOGUE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, text)| *text)
        .unwrap_or(key)
}

handlebars_helper!(trans: |key: str| translate(key).to_string());

/// Handlebars renderer with the templates compiled into the binary
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_helper("trans", Box::new(trans));

        registry.register_partial("flashes", include_str!("../templates/flashes.hbs"))?;
        registry.register_partial(
            "policy_banner",
            include_str!("../templates/policy_banner.hbs"),
        )?;
        registry.register_template_string("login", include_str!("../templates/login.hbs"))?;
        registry.register_template_string("home", include_str!("../templates/home.hbs"))?;

        Ok(Self { registry })
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, context: &serde_json::Value) -> AppResult<Html<String>> {
        if !self.registry.has_template(template) {
            return Err(AppError::template(format!("unknown template '{}'", template)));
        }
        Ok(Html(self.registry.render(template, context)?))
    }
}
