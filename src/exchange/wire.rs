//! Wire format of the secondary service's token endpoint

use serde::{Deserialize, Serialize};

/// Request body: `{"plexToken":"<secret>"}`.
#[derive(Serialize)]
pub struct TokenExchangeBody<'a> {
    #[serde(rename = "plexToken")]
    pub plex_token: &'a str,
}

/// Response body. Only `access_token` is read; everything else, including the
/// service's own `expiration`, is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct TokenExchangeResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}
