use thiserror::Error;

/// Error kinds for Last.fm API operations.
///
/// Nothing here is retried automatically; every failure surfaces to the
/// immediate caller as one of these variants.
#[derive(Debug, Error)]
pub enum LastfmError {
    /// An authenticated call was attempted with no stored session.
    #[error("not logged in to Last.fm")]
    Unauthenticated,

    /// `complete_login` was called with no outstanding request token.
    #[error("no login in progress; start a new login first")]
    NoPendingLogin,

    /// The API returned a structured response with an explicit error code.
    #[error("Last.fm error {code}: {message}")]
    Api { code: u32, message: String },

    /// The response was not in the expected JSON format.
    ///
    /// Last.fm occasionally answers with XML markup; when it carries an
    /// `<error code="..">` fragment the code and message are extracted here.
    #[error("unexpected Last.fm response: {message}")]
    Protocol { code: Option<u32>, message: String },

    /// Network-level failure.
    #[error("request to Last.fm failed: {0}")]
    Transport(#[from] attohttpc::Error),
}
