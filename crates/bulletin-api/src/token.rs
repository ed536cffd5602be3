use std::fmt;
use std::time::Duration;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use bulletin_types::api::SessionClaims;

/// Wire claims. `exp` is only present when the issuer has a TTL.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    username: String,
    iat: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
}

/// Issues and verifies HS256 bearer tokens signed with a server-held secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Option<Duration>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenIssuer {
    /// `ttl = None` issues tokens that never expire.
    pub fn new(secret: &str, ttl: Option<Duration>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        if ttl.is_some() {
            validation.required_spec_claims.insert("exp".to_string());
        }
        validation.validate_exp = true;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, claims: &SessionClaims) -> jsonwebtoken::errors::Result<String> {
        self.issue_at(claims, get_current_timestamp())
    }

    fn issue_at(&self, claims: &SessionClaims, now: u64) -> jsonwebtoken::errors::Result<String> {
        let claims = TokenClaims {
            username: claims.username.clone(),
            iat: now,
            exp: self.ttl.map(|ttl| now.saturating_add(ttl.as_secs())),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// `None` for any malformed, forged or expired token; which check failed
    /// is deliberately not reported.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .ok()
            .map(|data| SessionClaims {
                username: data.claims.username,
            })
    }
}
