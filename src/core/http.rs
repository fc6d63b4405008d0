use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

use crate::core::error::SyncResult;

pub const APP_USER_AGENT: &str = concat!("Packsync/", env!("CARGO_PKG_VERSION"));

/// Mod hosts can be slow to answer but should at least accept the connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared client for the manifest, mod downloads and update checks.
///
/// Bodies are requested uncompressed so hashes are computed over the exact
/// bytes the host serves.
pub fn build_http_client() -> SyncResult<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Ok(Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?)
}
