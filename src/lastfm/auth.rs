// Delegated authorization flow.
//
// Three steps against the API: fetch a request token, have the user authorize
// it on the Last.fm site, then exchange it for a long-lived session key. The
// token lives in the session store between start and complete.

use anyhow::Result;
use serde_json::Value;

use super::client::LastfmClient;
use super::error::LastfmError;
use crate::session::Session;

/// Result of starting a login: the request token and the page the user must
/// visit to authorize it.
#[derive(Debug)]
pub struct LoginStart {
    pub token: String,
    pub auth_url: String,
}

#[derive(Debug)]
pub struct LoginStatus {
    pub is_logged_in: bool,
    pub account: Option<String>,
}

impl LastfmClient {
    /// Obtains a request token and records it as the pending login.
    ///
    /// A previous pending token, if any, is overwritten; only one login flow
    /// exists at a time.
    pub fn start_login(&mut self) -> Result<LoginStart> {
        let response = self.call("auth.gettoken", &[], false)?;
        let token = string_field(&response, &["token"])?;

        let auth_url = self.authorization_url(&token);
        self.store_mut().set_pending_token(token.clone())?;

        log::info!("Login started, waiting for authorization");
        Ok(LoginStart { token, auth_url })
    }

    pub(crate) fn authorization_url(&self, token: &str) -> String {
        format!(
            "{}?api_key={}&token={}",
            self.auth_url(),
            self.api_key(),
            token
        )
    }

    /// Exchanges the pending token for a session and persists it.
    ///
    /// The token is single-use on the remote side; it is cleared only after a
    /// successful exchange so a failed complete can be retried without
    /// restarting the flow.
    pub fn complete_login(&mut self) -> Result<Session> {
        let token = self
            .store()
            .pending_token()
            .ok_or(LastfmError::NoPendingLogin)?
            .to_string();

        let response = self.call("auth.getsession", &[("token", token)], false)?;
        let key = string_field(&response, &["session", "key"])?;
        let account = string_field(&response, &["session", "name"])?;

        let session = Session { key, account };
        self.store_mut().set_session(session.clone())?;
        self.store_mut().clear_pending_token()?;

        log::info!("Logged in as {}", session.account);
        Ok(session)
    }

    /// Clears the stored session. Safe to call in any state.
    pub fn logout(&mut self) -> Result<()> {
        self.store_mut().clear_session()?;
        log::info!("Logged out");
        Ok(())
    }

    pub fn login_status(&self) -> LoginStatus {
        match self.store().session() {
            Some(session) => LoginStatus {
                is_logged_in: true,
                account: Some(session.account.clone()),
            },
            None => LoginStatus {
                is_logged_in: false,
                account: None,
            },
        }
    }
}

fn string_field(value: &Value, path: &[&str]) -> Result<String, LastfmError> {
    let mut current = value;
    for key in path {
        current = current.get(key).ok_or_else(|| missing_field(path))?;
    }
    current
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| missing_field(path))
}

fn missing_field(path: &[&str]) -> LastfmError {
    LastfmError::Protocol {
        code: None,
        message: format!("missing field `{}` in response", path.join(".")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LastFmConfig;
    use crate::session::SessionStore;

    fn offline_client() -> LastfmClient {
        let config = LastFmConfig {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            api_url: "http://127.0.0.1:1/2.0/".to_string(),
            auth_url: "https://www.last.fm/api/auth/".to_string(),
        };
        LastfmClient::new(&config, SessionStore::in_memory())
    }

    #[test]
    fn complete_without_start_reports_no_pending_login() {
        let mut client = offline_client();
        let error = client.complete_login().expect_err("no pending token");
        assert!(matches!(
            error.downcast_ref::<LastfmError>(),
            Some(LastfmError::NoPendingLogin)
        ));
    }

    #[test]
    fn failed_start_leaves_flow_idle() {
        let mut client = offline_client();
        client.start_login().expect_err("endpoint is unroutable");
        assert!(client.store().pending_token().is_none());
    }

    #[test]
    fn status_follows_session_lifecycle() {
        let mut client = offline_client();
        assert!(!client.login_status().is_logged_in);

        client
            .store_mut()
            .set_session(Session {
                key: "sk-abc".to_string(),
                account: "listener".to_string(),
            })
            .expect("in-memory store never fails");

        let status = client.login_status();
        assert!(status.is_logged_in);
        assert_eq!(status.account.as_deref(), Some("listener"));

        client.logout().expect("logout");
        let status = client.login_status();
        assert!(!status.is_logged_in);
        assert_eq!(status.account, None);
    }

    #[test]
    fn authorization_url_embeds_key_and_token() {
        let client = offline_client();
        assert_eq!(
            client.authorization_url("tok123"),
            "https://www.last.fm/api/auth/?api_key=key&token=tok123"
        );
    }

    #[test]
    fn missing_session_fields_are_protocol_errors() {
        let value: Value = serde_json::from_str(r#"{"session": {"name": "listener"}}"#).unwrap();
        let error = string_field(&value, &["session", "key"]).expect_err("key is absent");
        assert!(matches!(error, LastfmError::Protocol { code: None, .. }));
    }
}
