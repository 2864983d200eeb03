use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AppError;

/// Configuration for the sitegate server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Development mode. Pre-checks "remember me" on the login form.
    #[serde(default)]
    pub debug: bool,

    /// Path prefix the application is mounted under ("" for the host root)
    #[serde(default)]
    pub base_path: String,

    /// Route users are sent to after accepting the policy or logging out
    #[serde(default = "default_home_route")]
    pub home_route: String,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub firewall: FirewallConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
        }
    }
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_cookie_name")]
    pub cookie_name: String,

    /// Idle lifetime of a session in seconds (default: 1 hour)
    #[serde(default = "default_session_timeout")]
    pub timeout_secs: u64,

    /// Lifetime of a "remember me" session in seconds (default: 1 week)
    #[serde(default = "default_remember_me_lifetime")]
    pub remember_me_lifetime_secs: u64,

    /// Add the Secure attribute to session cookies
    #[serde(default)]
    pub secure: bool,

    /// How often expired sessions are swept from the store (default: 1 minute)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_session_cookie_name(),
            timeout_secs: default_session_timeout(),
            remember_me_lifetime_secs: default_remember_me_lifetime(),
            secure: false,
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// Paths owned by the firewall
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallConfig {
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Path the login form posts credentials to
    #[serde(default = "default_login_path")]
    pub check_path: String,

    #[serde(default = "default_logout_path")]
    pub logout_path: String,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            check_path: default_login_path(),
            logout_path: default_logout_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// A user allowed to log in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,

    /// Argon2 PHC string, see `sitegate hash-password`
    pub password_hash: String,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_home_route() -> String {
    "/".to_string()
}

fn default_session_cookie_name() -> String {
    "SITEGATE_SESSION".to_string()
}

fn default_session_timeout() -> u64 {
    3600
}

fn default_remember_me_lifetime() -> u64 {
    604_800
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_logout_path() -> String {
    "/logout".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            debug: false,
            base_path: String::new(),
            home_route: default_home_route(),
            session: SessionConfig::default(),
            firewall: FirewallConfig::default(),
            logging: LoggingConfig::default(),
            users: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the TOML file (if it exists), then
    /// `SITEGATE_*` environment variables (`__` separates nested keys).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SITEGATE_").split("__"));
        Self::extract(figment)
    }

    /// Load configuration from a TOML document on top of the defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let figment =
            Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, AppError> {
        let config: Config = figment
            .extract()
            .map_err(|e| AppError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.base_path.is_empty()
            && (!self.base_path.starts_with('/') || self.base_path.ends_with('/'))
        {
            return Err(AppError::invalid_config(
                "base_path",
                "must be empty or start with '/' and not end with '/'",
            ));
        }

        let paths = [
            ("home_route", &self.home_route),
            ("firewall.login_path", &self.firewall.login_path),
            ("firewall.check_path", &self.firewall.check_path),
            ("firewall.logout_path", &self.firewall.logout_path),
        ];
        for (key, path) in paths {
            if !path.starts_with('/') {
                return Err(AppError::invalid_config(key, "must start with '/'"));
            }
        }

        if self.firewall.logout_path == self.firewall.login_path
            || self.firewall.logout_path == self.firewall.check_path
        {
            return Err(AppError::invalid_config(
                "firewall.logout_path",
                "must differ from the login and check paths",
            ));
        }

        let reserved = [
            self.firewall.login_path.as_str(),
            self.firewall.check_path.as_str(),
            self.firewall.logout_path.as_str(),
            crate::routes::POLICY_ACCEPT_PATH,
        ];
        if reserved.contains(&self.home_route.as_str()) {
            return Err(AppError::invalid_config(
                "home_route",
                "must not be a login, logout or policy path",
            ));
        }

        if self.session.cookie_name.is_empty() {
            return Err(AppError::invalid_config(
                "session.cookie_name",
                "must not be empty",
            ));
        }

        if self.session.timeout_secs == 0 || self.session.remember_me_lifetime_secs == 0 {
            return Err(AppError::invalid_config(
                "session",
                "lifetimes must be at least one second",
            ));
        }

        if self.session.cleanup_interval_secs == 0 {
            return Err(AppError::invalid_config(
                "session.cleanup_interval_secs",
                "must be at least one second",
            ));
        }

        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Configuration for tests: loopback host and the given port
    pub fn test_config_with_port(port: u16) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port,
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.firewall.login_path, "/login");
        assert_eq!(config.firewall.logout_path, "/logout");
        assert_eq!(config.session.cookie_name, "SITEGATE_SESSION");
        assert!(!config.debug);
    }

    #[test]
    fn test_from_toml_overrides_defaults() {
        let config = Config::from_toml_str(
            r#"
            debug = true
            base_path = "/app"

            [server]
            host = "127.0.0.1"
            port = 8080

            [session]
            secure = true

            [[users]]
            username = "alice"
            password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaA"
            roles = ["ROLE_ADMIN"]
            "#,
        )
        .unwrap();

        assert!(config.debug);
        assert_eq!(config.base_path, "/app");
        assert_eq!(config.server_addr(), "127.0.0.1:8080");
        assert!(config.session.secure);
        assert_eq!(config.session.timeout_secs, 3600);
        assert_eq!(config.users.len(), 1);
        assert!(config.users[0].enabled);
    }

    #[test]
    fn test_rejects_trailing_slash_base_path() {
        let err = Config::from_toml_str(r#"base_path = "/app/""#).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("base_path"));
    }

    #[test]
    fn test_rejects_relative_logout_path() {
        let mut config = Config::default();
        config.firewall.logout_path = "logout".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_logout_equal_to_login() {
        let mut config = Config::default();
        config.firewall.logout_path = "/login".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_home_on_firewall_or_policy_path() {
        for path in ["/login", "/logout", "/policy/accept"] {
            let mut config = Config::default();
            config.home_route = path.to_string();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("home_route"), "{}", path);
        }
    }

    #[test]
    fn test_rejects_zero_cleanup_interval() {
        let err = Config::from_toml_str("[session]\ncleanup_interval_secs = 0").unwrap_err();
        assert!(err.to_string().contains("cleanup_interval_secs"));
    }

    #[test]
    fn test_test_config_uses_loopback() {
        let config = Config::test_config_with_port(0);
        assert_eq!(config.server_addr(), "127.0.0.1:0");
    }
}
