//! Secure terminal config storage using the OS credential store.
//!
//! On Windows this uses DPAPI (via the `keyring` crate), on macOS Keychain,
//! and on Linux the Secret Service API / keyutils. Holds the backend URL,
//! the operator's bearer token, and the terminal id: the secrets the
//! browser build kept in local storage.

use keyring::Entry;
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::api;

const SERVICE_NAME: &str = "cellar-pos";

// Credential keys
const KEY_SERVER_URL: &str = "server_url";
const KEY_AUTH_TOKEN: &str = "auth_token";
const KEY_TERMINAL_ID: &str = "terminal_id";

/// All credential keys managed by this module.
const ALL_KEYS: &[&str] = &[KEY_SERVER_URL, KEY_AUTH_TOKEN, KEY_TERMINAL_ID];

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

/// Store a credential in the OS keyring.
pub fn set_credential(key: &str, value: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    entry.set_password(value).map_err(|e| e.to_string())?;
    Ok(())
}

/// Delete a credential from the OS keyring. Silently succeeds if the entry
/// does not exist.
pub fn delete_credential(key: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

pub fn has_credential(key: &str) -> bool {
    get_credential(key).is_some()
}

// ---------------------------------------------------------------------------
// High-level API
// ---------------------------------------------------------------------------

/// The terminal is considered configured when the backend URL and terminal id
/// are both present in the credential store.
pub fn is_configured() -> bool {
    has_credential(KEY_SERVER_URL) && has_credential(KEY_TERMINAL_ID)
}

pub fn get_server_url() -> Option<String> {
    get_credential(KEY_SERVER_URL)
}

pub fn get_terminal_id() -> Option<String> {
    get_credential(KEY_TERMINAL_ID)
}

/// Store the operator's bearer token (set on login, cleared on logout).
pub fn set_auth_token(token: &str) -> Result<(), String> {
    set_credential(KEY_AUTH_TOKEN, token)
}

pub fn get_auth_token() -> Option<String> {
    get_credential(KEY_AUTH_TOKEN)
}

/// Remove the stored bearer token and wipe the in-memory copy.
pub fn clear_auth_token() -> Result<(), String> {
    if let Some(mut token) = get_credential(KEY_AUTH_TOKEN) {
        token.zeroize();
    }
    delete_credential(KEY_AUTH_TOKEN)
}

/// Provision the terminal from setup input.
///
/// `raw` is either a plain backend URL or a pairing code (base64url JSON with
/// `url` and `tid`) produced by the admin side. Stores the normalised URL and,
/// when present, the terminal id.
pub fn configure_terminal(raw: &str) -> Result<(), String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Missing backend URL or pairing code".to_string());
    }

    let server_url = api::extract_server_url_from_connection_string(trimmed)
        .unwrap_or_else(|| api::normalize_server_url(trimmed));
    if server_url.is_empty() {
        return Err("Pairing code carries no backend URL".to_string());
    }
    set_credential(KEY_SERVER_URL, &server_url)?;

    if let Some(terminal_id) = api::extract_terminal_id_from_connection_string(trimmed) {
        set_credential(KEY_TERMINAL_ID, &terminal_id)?;
    }

    info!(server_url = %server_url, "terminal configured");
    Ok(())
}

/// Delete every stored credential (factory reset).
pub fn factory_reset() -> Result<(), String> {
    info!("performing factory reset - deleting all credentials");
    for key in ALL_KEYS {
        delete_credential(key)?;
    }
    Ok(())
}
