// Last.fm API core
// Request signing, the service client, and the delegated auth flow

pub mod auth;
pub mod client;
pub mod error;
pub mod md5;
pub mod signature;

pub use auth::{LoginStart, LoginStatus};
pub use client::LastfmClient;
pub use error::LastfmError;
