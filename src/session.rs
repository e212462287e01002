//! Operator session management.
//!
//! The session is an explicit object owned by [`SessionState`] and handed to
//! whatever needs identity or role information, never read from an ambient global.
//! Login exchanges credentials for a bearer token, fetches the profile, and
//! persists it: the profile goes to the settings store so a restart restores
//! the signed-in operator, the token goes to the OS credential store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::access::{self, Feature, Role};
use crate::api::ApiClient;
use crate::db::{self, DbState};
use crate::storage;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const SESSION_INACTIVITY_MINUTES: i64 = 30;
const SESSION_MAX_DURATION_HOURS: i64 = 12;

const SETTINGS_CATEGORY: &str = "session";
const PROFILE_KEY: &str = "current_user";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The signed-in operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
    /// Display name (the account's full name, or the username).
    pub name: String,
    pub role: Role,
}

/// An active operator session.
#[derive(Clone)]
struct Session {
    session_id: String,
    user: CurrentUser,
    login_time: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl Session {
    fn new(user: CurrentUser) -> Self {
        let now = Utc::now();
        Session {
            session_id: Uuid::new_v4().to_string(),
            user,
            login_time: now,
            last_activity: now,
        }
    }

    /// Check whether this session has expired (inactivity or max duration).
    fn is_expired(&self) -> bool {
        let now = Utc::now();
        if now - self.login_time > Duration::hours(SESSION_MAX_DURATION_HOURS) {
            return true;
        }
        if now - self.last_activity > Duration::minutes(SESSION_INACTIVITY_MINUTES) {
            return true;
        }
        false
    }
}

/// Owner of the current session. Login sets it, logout clears it.
pub struct SessionState {
    current: Mutex<Option<Session>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Profile persistence
// ---------------------------------------------------------------------------

fn persist_profile(db: &DbState, user: &CurrentUser) -> Result<(), String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let json = serde_json::to_string(user).map_err(|e| format!("encode profile: {e}"))?;
    db::set_setting(&conn, SETTINGS_CATEGORY, PROFILE_KEY, &json)
}

fn load_profile(db: &DbState) -> Option<CurrentUser> {
    let conn = db.conn.lock().ok()?;
    let raw = db::get_setting(&conn, SETTINGS_CATEGORY, PROFILE_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, "stored profile is unreadable, ignoring");
            None
        }
    }
}

fn clear_profile(db: &DbState) {
    if let Ok(conn) = db.conn.lock() {
        let _ = db::delete_setting(&conn, SETTINGS_CATEGORY, PROFILE_KEY);
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

impl SessionState {
    pub fn new() -> Self {
        SessionState {
            current: Mutex::new(None),
        }
    }

    /// Restore the persisted operator profile, if any. The expiry clock
    /// restarts from now; the bearer token (if still stored) is picked up
    /// separately via [`storage::get_auth_token`].
    pub fn restore(db: &DbState) -> Self {
        let state = SessionState::new();
        if let Some(user) = load_profile(db) {
            info!(username = %user.username, role = %user.role, "restored operator session");
            let mut current = state.current.lock().expect("session mutex poisoned");
            *current = Some(Session::new(user));
        }
        state
    }

    /// Sign in against the backend.
    ///
    /// Exchanges the credentials for a bearer token, fetches the operator
    /// profile, arms `api` with the token, and persists both profile and
    /// token.
    pub async fn login(
        &self,
        api: &mut ApiClient,
        db: &DbState,
        username: &str,
        password: &str,
    ) -> Result<CurrentUser, String> {
        if username.trim().is_empty() || password.is_empty() {
            return Err("Username and password are required".to_string());
        }

        let token_response = api.login(username.trim(), password).await?;
        let mut access_token = token_response.access_token;
        api.set_token(Some(access_token.clone()));

        let account = match api.me().await {
            Ok(account) => account,
            Err(e) => {
                // The token is useless without a profile; drop it again.
                api.set_token(None);
                access_token.zeroize();
                return Err(format!("Failed to load operator profile: {e}"));
            }
        };

        if let Err(e) = storage::set_auth_token(&access_token) {
            warn!(error = %e, "could not persist bearer token");
        }
        access_token.zeroize();

        let user = CurrentUser {
            username: username.trim().to_string(),
            name: account.display_name().to_string(),
            role: account.role,
        };

        if let Err(e) = persist_profile(db, &user) {
            warn!(error = %e, "could not persist operator profile");
        }

        {
            let mut current = self.current.lock().expect("session mutex poisoned");
            *current = Some(Session::new(user.clone()));
        }

        info!(username = %user.username, role = %user.role, "operator signed in");
        Ok(user)
    }

    /// Sign out: drop the session, the persisted profile, and the token.
    pub fn logout(&self, api: &mut ApiClient, db: &DbState) {
        let previous = {
            let mut current = self.current.lock().expect("session mutex poisoned");
            current.take()
        };

        api.set_token(None);
        if let Err(e) = storage::clear_auth_token() {
            warn!(error = %e, "could not clear bearer token");
        }
        clear_profile(db);

        if let Some(session) = previous {
            info!(
                session_id = %session.session_id,
                username = %session.user.username,
                "operator signed out"
            );
        }
    }

    /// The signed-in operator, or `None` when signed out or expired.
    pub fn current_user(&self) -> Option<CurrentUser> {
        let mut current = self.current.lock().expect("session mutex poisoned");
        match current.as_ref() {
            Some(session) if session.is_expired() => {
                *current = None;
                None
            }
            Some(session) => Some(session.user.clone()),
            None => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.current_user().map(|u| u.role)
    }

    /// Capability check for the signed-in operator; `false` when signed out.
    pub fn can_access(&self, feature: Feature) -> bool {
        match self.role() {
            Some(role) => access::can_access(role, feature),
            None => false,
        }
    }

    /// Refresh the inactivity timer.
    pub fn track_activity(&self) {
        let mut current = self.current.lock().expect("session mutex poisoned");
        if let Some(session) = current.as_mut() {
            session.last_activity = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn manager() -> CurrentUser {
        CurrentUser {
            username: "amara".to_string(),
            name: "Amara O.".to_string(),
            role: Role::Manager,
        }
    }

    fn install(state: &SessionState, user: CurrentUser) {
        let mut current = state.current.lock().expect("session mutex");
        *current = Some(Session::new(user));
    }

    #[test]
    fn signed_out_state_has_no_user_and_no_access() {
        let state = SessionState::new();
        assert_eq!(state.current_user(), None);
        assert!(!state.can_access(Feature::PointOfSale));
    }

    #[test]
    fn capability_checks_follow_the_role() {
        let state = SessionState::new();
        install(&state, manager());

        assert!(state.can_access(Feature::Reports));
        assert!(state.can_access(Feature::EditProduct));
        assert!(!state.can_access(Feature::Users));
    }

    #[test]
    fn profile_persists_and_restores() {
        let db = DbState::in_memory().expect("open db");
        persist_profile(&db, &manager()).expect("persist");

        let restored = SessionState::restore(&db);
        assert_eq!(restored.current_user(), Some(manager()));
    }

    #[test]
    fn restore_ignores_unreadable_profile() {
        let db = DbState::in_memory().expect("open db");
        {
            let conn = db.conn.lock().expect("db lock");
            db::set_setting(&conn, SETTINGS_CATEGORY, PROFILE_KEY, "{not json").expect("set");
        }

        let restored = SessionState::restore(&db);
        assert_eq!(restored.current_user(), None);
    }

    #[test]
    fn inactivity_expires_the_session() {
        let state = SessionState::new();
        install(&state, manager());
        {
            let mut current = state.current.lock().expect("session mutex");
            let session = current.as_mut().expect("session present");
            session.last_activity =
                Utc::now() - Duration::minutes(SESSION_INACTIVITY_MINUTES + 1);
        }

        assert_eq!(state.current_user(), None, "expired session must clear");
        // The expired session is dropped for good.
        assert!(!state.can_access(Feature::PointOfSale));
    }

    #[test]
    fn activity_keeps_the_session_alive() {
        let state = SessionState::new();
        install(&state, manager());
        {
            let mut current = state.current.lock().expect("session mutex");
            let session = current.as_mut().expect("session present");
            session.last_activity =
                Utc::now() - Duration::minutes(SESSION_INACTIVITY_MINUTES - 1);
        }

        state.track_activity();
        assert!(state.current_user().is_some());
    }

    #[test]
    fn max_duration_expires_even_with_activity() {
        let state = SessionState::new();
        install(&state, manager());
        {
            let mut current = state.current.lock().expect("session mutex");
            let session = current.as_mut().expect("session present");
            session.login_time = Utc::now() - Duration::hours(SESSION_MAX_DURATION_HOURS + 1);
        }

        state.track_activity();
        assert_eq!(state.current_user(), None);
    }

    #[test]
    #[serial]
    fn logout_clears_session_and_profile() {
        let db = DbState::in_memory().expect("open db");
        let state = SessionState::new();
        install(&state, manager());
        persist_profile(&db, &manager()).expect("persist");

        let mut api = ApiClient::new("shop.example.com").expect("client");
        api.set_token(Some("token".to_string()));

        state.logout(&mut api, &db);

        assert_eq!(state.current_user(), None);
        assert!(!api.has_token());
        assert_eq!(load_profile(&db), None);
    }
}
