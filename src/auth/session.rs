// Session Management
// In-memory session store plus the middleware that binds a session to each request

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

use super::error::AuthenticationError;
use super::users::AuthenticatedUser;
use crate::AppState;
use crate::config::Config;
use crate::cookie::{CookieMutation, cookie_scope, read_cookie};
use crate::flash::{FlashMessage, FlashQueue};

/// Generate a random, URL-safe session id
pub fn generate_session_id() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Everything the server remembers about one browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub id: String,
    pub user: Option<AuthenticatedUser>,
    /// Username submitted with the last failed login
    pub last_username: Option<String>,
    pub last_error: Option<AuthenticationError>,
    pub flashes: Vec<FlashMessage>,
    /// Page to return to after logging in
    pub target_path: Option<String>,
    /// "Remember me" was checked at login
    pub persistent: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    invalidated: bool,
    #[serde(skip)]
    previous_id: Option<String>,
}

impl SessionData {
    fn new(id: String, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            id,
            user: None,
            last_username: None,
            last_error: None,
            flashes: Vec::new(),
            target_path: None,
            persistent: false,
            created_at: now,
            expires_at: now + lifetime,
            invalidated: false,
            previous_id: None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Remember a failed login for the next login view
    pub fn record_failure(&mut self, username: Option<String>, error: AuthenticationError) {
        self.last_username = username;
        self.last_error = Some(error);
    }

    /// Attach an authenticated user. The session id is rotated.
    pub fn login(&mut self, user: AuthenticatedUser, persistent: bool) {
        self.last_username = Some(user.username.clone());
        self.last_error = None;
        self.user = Some(user);
        self.persistent = persistent;
        self.migrate();
    }

    /// Move the session to a fresh id, dropping the old one on commit
    pub fn migrate(&mut self) {
        let old = std::mem::replace(&mut self.id, generate_session_id());
        // Keep the first id if migrated twice within one request
        self.previous_id.get_or_insert(old);
    }

    /// Discard the session when the request completes
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Nothing worth persisting
    pub fn is_empty(&self) -> bool {
        self.user.is_none()
            && self.last_username.is_none()
            && self.last_error.is_none()
            && self.flashes.is_empty()
            && self.target_path.is_none()
    }
}

impl FlashQueue for SessionData {
    fn push(&mut self, message: FlashMessage) {
        self.flashes.push(message);
    }

    fn drain(&mut self) -> Vec<FlashMessage> {
        std::mem::take(&mut self.flashes)
    }
}

/// In-memory session storage with expiry
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
    timeout: Duration,
    remember_me_lifetime: Duration,
}

impl SessionStore {
    pub fn new(timeout_secs: u64, remember_me_lifetime_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout: Duration::seconds(timeout_secs as i64),
            remember_me_lifetime: Duration::seconds(remember_me_lifetime_secs as i64),
        }
    }

    fn lifetime(&self, persistent: bool) -> Duration {
        if persistent {
            self.remember_me_lifetime
        } else {
            self.timeout
        }
    }

    /// A fresh, unsaved session
    pub fn start(&self) -> SessionData {
        SessionData::new(generate_session_id(), self.timeout)
    }

    /// Load a live session; expired sessions are removed
    pub async fn load(&self, id: &str) -> Option<SessionData> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                Some(data) if data.expires_at > now => return Some(data.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        debug!("Dropping expired session");
        self.sessions.write().await.remove(id);
        None
    }

    /// Store the session, extending its expiry
    pub async fn save(&self, mut data: SessionData) {
        data.expires_at = Utc::now() + self.lifetime(data.persistent);
        let previous = data.previous_id.take();
        let mut sessions = self.sessions.write().await;
        if let Some(previous) = previous {
            sessions.remove(&previous);
        }
        sessions.insert(data.id.clone(), data);
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// Drop every expired session and return how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, data| data.expires_at > now);
        let removed = before - sessions.len();
        if removed > 0 {
            info!("Cleaned up {} expired sessions", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Persist or discard the session after a request and return the cookie
    /// change the client needs, if any.
    pub async fn commit(
        &self,
        mut data: SessionData,
        incoming_id: Option<&str>,
        config: &Config,
    ) -> Option<CookieMutation> {
        let session = &config.session;
        let path = cookie_scope(&config.base_path);

        if data.is_invalidated() || data.is_empty() {
            self.remove(&data.id).await;
            if let Some(previous) = data.previous_id.take() {
                self.remove(&previous).await;
            }
            return incoming_id.map(|_| {
                debug!("Clearing session cookie");
                CookieMutation::removal(&session.cookie_name, path).secure(session.secure)
            });
        }

        let changed = incoming_id != Some(data.id.as_str());
        let mut cookie = CookieMutation::new(&session.cookie_name, &data.id)
            .path(path)
            .secure(session.secure);
        if data.persistent {
            cookie = cookie.max_age(session.remember_me_lifetime_secs as i64);
        }

        self.save(data).await;
        changed.then_some(cookie)
    }
}

/// Sweep expired sessions from `sessions` every `every` until aborted
pub fn spawn_cleanup_task(
    sessions: Arc<SessionStore>,
    every: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            sessions.cleanup_expired().await;
        }
    })
}

/// Shared access to the current request's session
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<Mutex<SessionData>>);

impl SessionHandle {
    pub fn new(data: SessionData) -> Self {
        Self(Arc::new(Mutex::new(data)))
    }

    pub async fn lock(&self) -> MutexGuard<'_, SessionData> {
        self.0.lock().await
    }
}

/// Binds a session to every request and commits it afterwards
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let incoming_id = read_cookie(req.headers(), &state.config.session.cookie_name);

    let loaded = match incoming_id.as_deref() {
        Some(id) => state.sessions.load(id).await,
        None => None,
    };
    let handle = SessionHandle::new(loaded.unwrap_or_else(|| state.sessions.start()));
    req.extensions_mut().insert(handle.clone());

    let mut response = next.run(req).await;

    let data = handle.lock().await.clone();
    if let Some(cookie) = state
        .sessions
        .commit(data, incoming_id.as_deref(), &state.config)
        .await
    {
        cookie.append_to(response.headers_mut());
    }

    response
}
