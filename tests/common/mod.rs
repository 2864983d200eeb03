#![allow(dead_code)]

use sitegate::{auth::users::hash_password, config, start_server_with_config};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "correct horse battery staple";

/// Test server with proper shutdown support
pub struct TestServer {
    port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a server on a free port with one configured user
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(|_| {}).await
    }

    /// Start with a tweak applied to the test configuration
    pub async fn start_with(tweak: impl FnOnce(&mut config::Config)) -> anyhow::Result<Self> {
        let mut test_config = config::Config::test_config_with_port(0);
        test_config.users.push(config::UserConfig {
            username: USERNAME.to_string(),
            password_hash: hash_password(PASSWORD)?,
            roles: Vec::new(),
            enabled: true,
        });
        tweak(&mut test_config);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let port = start_server_with_config(test_config, shutdown_rx).await?;

        Ok(Self {
            port,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Client that does not follow redirects, so each hop can be inspected
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client should build")
}

/// Raw `Set-Cookie` headers of a response
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// The `Set-Cookie` header for `name`, if any
pub fn find_set_cookie(response: &reqwest::Response, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{}=", name)))
}

pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Minimal cookie jar: applies `Set-Cookie` name/value pairs, honouring
/// `Max-Age=0` removals
#[derive(Debug, Default, Clone)]
pub struct Jar {
    cookies: HashMap<String, String>,
}

impl Jar {
    pub fn absorb(&mut self, response: &reqwest::Response) {
        for cookie in set_cookies(response) {
            let pair = cookie.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            if cookie.contains("Max-Age=0") {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Small browser: a client plus a jar
pub struct Browser {
    pub client: reqwest::Client,
    pub jar: Jar,
    base: String,
}

impl Browser {
    pub fn new(server: &TestServer) -> Self {
        Self {
            client: client(),
            jar: Jar::default(),
            base: server.url(""),
        }
    }

    pub async fn get(&mut self, path: &str) -> reqwest::Response {
        let response = self
            .client
            .get(format!("{}{}", self.base, path))
            .header(reqwest::header::COOKIE, self.jar.header())
            .send()
            .await
            .expect("GET should succeed");
        self.jar.absorb(&response);
        response
    }

    pub async fn post_form(&mut self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        let response = self
            .client
            .post(format!("{}{}", self.base, path))
            .header(reqwest::header::COOKIE, self.jar.header())
            .form(form)
            .send()
            .await
            .expect("POST should succeed");
        self.jar.absorb(&response);
        response
    }

    pub async fn login(&mut self, remember_me: bool) -> reqwest::Response {
        let mut form = vec![("username", USERNAME), ("password", PASSWORD)];
        if remember_me {
            form.push(("remember_me", "on"));
        }
        self.post_form("/login", &form).await
    }
}
