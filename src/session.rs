// Persistent login state.
//
// Holds the long-lived Last.fm session credential and the transient request
// token produced by a login in progress. State lives in a small JSON file in
// the user config directory; every mutation is written through immediately.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Long-lived credential identifying an authorized user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session key passed as the `sk` parameter on authenticated calls.
    pub key: String,
    /// Last.fm account name the session belongs to.
    pub account: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredState {
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_token: Option<String>,
}

/// File-backed store for the session and the pending login token.
///
/// Absence of a session means "logged out". At most one pending token exists;
/// storing a new one overwrites the old.
pub struct SessionStore {
    path: Option<PathBuf>,
    state: StoredState,
}

impl SessionStore {
    /// Default location of the state file.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("poolsuite_scrobbler_session.json"))
    }

    /// Opens the store at `path`, loading existing state if the file exists.
    pub fn open(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session file {path:?}"))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse session file {path:?}"))?
        } else {
            StoredState::default()
        };

        Ok(Self {
            path: Some(path),
            state,
        })
    }

    /// An ephemeral store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: StoredState::default(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session.as_ref()
    }

    pub fn set_session(&mut self, session: Session) -> Result<()> {
        self.state.session = Some(session);
        self.persist()
    }

    pub fn clear_session(&mut self) -> Result<()> {
        self.state.session = None;
        self.persist()
    }

    pub fn pending_token(&self) -> Option<&str> {
        self.state.pending_token.as_deref()
    }

    pub fn set_pending_token(&mut self, token: String) -> Result<()> {
        self.state.pending_token = Some(token);
        self.persist()
    }

    pub fn clear_pending_token(&mut self) -> Result<()> {
        self.state.pending_token = None;
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(&self.state).context("Failed to serialize session state")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write session file {path:?}"))?;

        log::debug!("Session state saved to {path:?}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_logged_out() {
        let store = SessionStore::in_memory();
        assert!(store.session().is_none());
        assert!(store.pending_token().is_none());
    }

    #[test]
    fn session_and_token_are_independent() {
        let mut store = SessionStore::in_memory();
        store
            .set_pending_token("tok-1".to_string())
            .expect("in-memory store never fails");
        store
            .set_session(Session {
                key: "sk-1".to_string(),
                account: "listener".to_string(),
            })
            .expect("in-memory store never fails");

        store.clear_pending_token().expect("in-memory store never fails");
        assert!(store.pending_token().is_none());
        assert_eq!(store.session().map(|s| s.account.as_str()), Some("listener"));

        store.clear_session().expect("in-memory store never fails");
        assert!(store.session().is_none());
    }

    #[test]
    fn newer_pending_token_overwrites_older() {
        let mut store = SessionStore::in_memory();
        store.set_pending_token("old".to_string()).unwrap();
        store.set_pending_token("new".to_string()).unwrap();
        assert_eq!(store.pending_token(), Some("new"));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");

        let mut store = SessionStore::open(path.clone()).expect("open fresh store");
        store
            .set_session(Session {
                key: "sk-abc".to_string(),
                account: "listener".to_string(),
            })
            .expect("persist session");
        store
            .set_pending_token("tok-xyz".to_string())
            .expect("persist token");
        drop(store);

        let reopened = SessionStore::open(path).expect("reopen store");
        assert_eq!(reopened.session().map(|s| s.key.as_str()), Some("sk-abc"));
        assert_eq!(reopened.pending_token(), Some("tok-xyz"));
    }

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::open(dir.path().join("absent.json")).expect("open");
        assert!(store.session().is_none());
    }
}
