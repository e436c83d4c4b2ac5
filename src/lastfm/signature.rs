// Request signing for the Last.fm API.
//
// Every call carries an `api_sig` parameter: the MD5 hex digest of the
// sorted parameter names and values concatenated back to back, with the
// shared secret appended. `format` and `callback` are transport parameters
// and are never part of the signed payload.

use super::md5;

/// Names excluded from the canonical string by protocol rule.
const UNSIGNED_PARAMS: [&str; 2] = ["format", "callback"];

/// Computes the `api_sig` value for a parameter set.
///
/// Input order does not matter; pairs are sorted by name before hashing.
pub fn api_signature(params: &[(String, String)], secret: &str) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|left, right| left.0.cmp(&right.0));

    let mut canonical = String::new();
    for (name, value) in sorted {
        if UNSIGNED_PARAMS.contains(&name.as_str()) {
            continue;
        }
        canonical.push_str(name);
        canonical.push_str(value);
    }
    canonical.push_str(secret);

    log::trace!("signing canonical string: {canonical}");
    md5::hex_digest(canonical.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn matches_canonical_concatenation() {
        let params = pairs(&[("method", "auth.gettoken"), ("api_key", "abc123")]);
        let expected = md5::hex_digest(b"api_keyabc123methodauth.gettokensecret");
        assert_eq!(api_signature(&params, "secret"), expected);
    }

    #[test]
    fn input_order_is_irrelevant() {
        let forward = pairs(&[
            ("artist", "Nebraska"),
            ("method", "track.scrobble"),
            ("sk", "sessionkey"),
            ("timestamp", "1700000000"),
            ("track", "Cop Show"),
        ]);
        let mut shuffled = forward.clone();
        shuffled.reverse();
        shuffled.swap(1, 3);

        assert_eq!(
            api_signature(&forward, "secret"),
            api_signature(&shuffled, "secret")
        );
    }

    #[test]
    fn format_and_callback_are_not_signed() {
        let bare = pairs(&[("method", "auth.gettoken"), ("api_key", "abc123")]);
        let mut with_transport = bare.clone();
        with_transport.push(("format".to_string(), "json".to_string()));
        with_transport.push(("callback".to_string(), "handle".to_string()));

        assert_eq!(
            api_signature(&bare, "secret"),
            api_signature(&with_transport, "secret")
        );
    }

    #[test]
    fn empty_values_still_contribute_their_name() {
        let with_empty = pairs(&[("album", ""), ("artist", "Nebraska")]);
        let expected = md5::hex_digest(b"albumartistNebraskasecret");
        assert_eq!(api_signature(&with_empty, "secret"), expected);
    }

    #[test]
    fn always_32_lowercase_hex_chars() {
        let sig = api_signature(&pairs(&[("a", "b")]), "");
        assert_eq!(sig.len(), 32);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
