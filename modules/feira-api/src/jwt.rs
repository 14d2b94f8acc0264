use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use feira_common::Identity;

const TOKEN_DURATION_SECS: i64 = 7 * 24 * 3600; // 7 days

/// JWT Claims stored in the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub,
            organization_id: self.organization_id,
            is_admin: self.is_admin,
        }
    }
}

/// JWT service for creating and verifying HS256 bearer tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
        }
    }

    pub fn create_token(&self, identity: &Identity) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(TOKEN_DURATION_SECS);

        let claims = Claims {
            sub: identity.user_id,
            organization_id: identity.organization_id,
            is_admin: identity.is_admin,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify and decode a token. Fails on bad signature, wrong issuer or expiry.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}
