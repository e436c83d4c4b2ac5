// Last.fm service client.
//
// Builds the final parameter set for each call, signs it, posts it as a
// form-encoded body, and interprets the response. The session store is owned
// here so authenticated calls and the auth flow share one source of truth.

use chrono::Utc;
use regex::Regex;
use serde_json::Value;

use super::error::LastfmError;
use super::signature::api_signature;
use crate::config::LastFmConfig;
use crate::observer::Track;
use crate::session::SessionStore;

pub struct LastfmClient {
    api_key: String,
    api_secret: String,
    api_url: String,
    auth_url: String,
    store: SessionStore,
}

impl LastfmClient {
    pub fn new(config: &LastFmConfig, store: SessionStore) -> Self {
        Self {
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            api_url: config.api_url.clone(),
            auth_url: config.auth_url.clone(),
            store,
        }
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub(crate) fn store(&self) -> &SessionStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    /// Issues a signed API call and returns the parsed JSON payload.
    ///
    /// Authenticated calls fail with [`LastfmError::Unauthenticated`] before
    /// any network I/O when no session is stored.
    pub fn call(
        &self,
        method: &str,
        extra: &[(&str, String)],
        requires_auth: bool,
    ) -> Result<Value, LastfmError> {
        let session_key = if requires_auth {
            match self.store.session() {
                Some(session) => Some(session.key.clone()),
                None => return Err(LastfmError::Unauthenticated),
            }
        } else {
            None
        };

        let mut params: Vec<(String, String)> = Vec::with_capacity(extra.len() + 5);
        params.push(("method".to_string(), method.to_string()));
        for (name, value) in extra {
            params.push((name.to_string(), value.clone()));
        }
        params.push(("api_key".to_string(), self.api_key.clone()));
        params.push(("format".to_string(), "json".to_string()));
        if let Some(key) = session_key {
            params.push(("sk".to_string(), key));
        }

        // The signature covers the exact set being sent, never itself.
        let signature = api_signature(&params, &self.api_secret);
        params.push(("api_sig".to_string(), signature));

        log::debug!(
            "Calling {} ({})",
            method,
            if requires_auth { "authenticated" } else { "public" }
        );

        let body = attohttpc::post(&self.api_url)
            .form(&params)?
            .send()?
            .text()?;

        parse_response(&body)
    }

    /// Sends a transient "now playing" status update.
    pub fn update_now_playing(&self, track: &Track) -> Result<(), LastfmError> {
        let mut extra = vec![
            ("track", track.title.clone()),
            ("artist", track.artist.clone()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        if let Some(album) = &track.album {
            extra.push(("album", album.clone()));
        }

        self.call("track.updateNowPlaying", &extra, true)?;
        log::info!("Last.fm: Now playing updated");
        Ok(())
    }

    /// Submits a scrobble with the given play-start timestamp.
    pub fn submit_scrobble(&self, track: &Track, timestamp: i64) -> Result<(), LastfmError> {
        let mut extra = vec![
            ("track", track.title.clone()),
            ("artist", track.artist.clone()),
            ("timestamp", timestamp.to_string()),
        ];
        if let Some(album) = &track.album {
            extra.push(("album", album.clone()));
        }
        if let Some(duration) = track.duration {
            extra.push(("duration", duration.to_string()));
        }

        self.call("track.scrobble", &extra, true)?;
        log::info!("Last.fm: Scrobbled successfully");
        Ok(())
    }
}

/// Interprets a raw response body from the API endpoint.
pub(crate) fn parse_response(body: &str) -> Result<Value, LastfmError> {
    let trimmed = body.trim();

    // The API answers with XML markup in one known failure mode.
    if trimmed.starts_with('<') {
        return Err(markup_error(trimmed));
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|_| LastfmError::Protocol {
        code: None,
        message: format!("response is not valid JSON: {}", snippet(trimmed)),
    })?;

    if let Some(code) = value.get("error").and_then(Value::as_u64) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(LastfmError::Api {
            code: code as u32,
            message,
        });
    }

    Ok(value)
}

fn markup_error(body: &str) -> LastfmError {
    let fragment = Regex::new(r#"<error code="(\d+)"[^>]*>([^<]*)</error>"#)
        .ok()
        .and_then(|pattern| {
            pattern.captures(body).map(|caps| {
                let code = caps[1].parse().ok();
                let message = caps[2].trim().to_string();
                (code, message)
            })
        });

    match fragment {
        Some((code, message)) => LastfmError::Protocol { code, message },
        None => LastfmError::Protocol {
            code: None,
            message: format!("received markup instead of JSON: {}", snippet(body)),
        },
    }
}

fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(120)
        .map(|(index, _)| index)
        .unwrap_or(body.len());
    &body[..end]
}
