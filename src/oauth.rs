use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{credential::IssuerIdentity, error::Result, jwt::encode_compact};

/// OAuth scope required to manage wallet classes and objects.
pub const WALLET_OBJECT_ISSUER_SCOPE: &str = "https://www.googleapis.com/auth/wallet_object.issuer";
/// Grant type of the service-account token exchange.
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Claims of the self-signed assertion exchanged for an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Access token returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Signs the assertion used to request an access token for `scope`.
///
/// # Arguments
/// * `issuer` - Service identity signing the assertion
/// * `scope` - Space separated OAuth scopes
/// * `audience` - Token endpoint URL
/// * `now` - Issue time; the assertion is valid for one hour
pub fn build_token_assertion(
    issuer: &IssuerIdentity,
    scope: &str,
    audience: &str,
    now: DateTime<Utc>,
) -> Result<String> {
    let claims = TokenAssertionClaims {
        iss: issuer.subject.clone(),
        scope: scope.to_owned(),
        aud: audience.to_owned(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
    };

    log::trace!("Token assertion claims {claims:?}");

    encode_compact(&claims, &issuer.signer())
}

/// URL-encoded form body exchanging `assertion` for an access token.
pub fn token_request_form(assertion: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", JWT_BEARER_GRANT_TYPE)
        .append_pair("assertion", assertion)
        .finish()
}
