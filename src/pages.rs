use axum::{Extension, extract::State, http::HeaderMap, response::Html};
use serde_json::json;

use crate::AppState;
use crate::auth::session::SessionHandle;
use crate::error::AppResult;
use crate::flash::FlashQueue;
use crate::response::RequestContext;
use crate::routes::POLICY_ACCEPT_PATH;

/// Home page. Shows queued flash messages and, for signed-in users who have
/// not accepted the policy yet, the policy banner.
pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    headers: HeaderMap,
    ctx: RequestContext,
) -> AppResult<Html<String>> {
    let (user, flashes) = {
        let mut session = session.lock().await;
        let flashes = FlashQueue::drain(&mut *session);
        (session.username().map(str::to_string), flashes)
    };

    let show_policy_banner = user.is_some() && !state.consent.is_accepted(&headers);
    let firewall = &state.config.firewall;

    state.renderer.render(
        "home",
        &json!({
            "user": user,
            "flashes": flashes,
            "show_policy_banner": show_policy_banner,
            "accept_url": ctx.url_for(POLICY_ACCEPT_PATH),
            "login_url": ctx.url_for(&firewall.login_path),
            "logout_url": ctx.url_for(&firewall.logout_path),
        }),
    )
}
