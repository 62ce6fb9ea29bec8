//! Bearer-token authentication.
//!
//! Access tokens are HS256 JWTs signed with the server's `SPE_JWT_SECRET`. The server only *verifies* identity;
//! issuing tokens to end users (login, sessions, password handling) belongs to the external identity provider,
//! which must share the signing secret. [`TokenIssuer::issue_token`] exists for that provider role, for operational
//! tooling, and for tests.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use split_engine::db_types::UserId;

use crate::{config::AuthConfig, errors::{AuthError, ServerError}};

type HmacSha256 = Hmac<Sha256>;

const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// The verified identity attached to a request. Extracted from the `Authorization: Bearer` header; handlers that
/// take a `JwtClaims` argument are therefore authenticated by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The authenticated user.
    pub sub: UserId,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> &UserId {
        &self.sub
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    config: AuthConfig,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Issue a new access token for the given user.
    pub fn issue_token(&self, user_id: &UserId, ttl: Option<Duration>) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = ttl.unwrap_or(self.config.token_ttl);
        let claims = JwtClaims { sub: user_id.clone(), exp: (now + ttl).timestamp(), iat: now.timestamp() };
        let header = base64::encode_config(JWT_HEADER, base64::URL_SAFE_NO_PAD);
        let payload = serde_json::to_vec(&claims).map_err(|e| AuthError::ValidationError(e.to_string()))?;
        let message = format!("{header}.{}", base64::encode_config(payload, base64::URL_SAFE_NO_PAD));
        let signature = base64::encode_config(self.sign(&message)?, base64::URL_SAFE_NO_PAD);
        Ok(format!("{message}.{signature}"))
    }

    /// Verify a token's signature and expiry and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let mut parts = token.split('.');
        let (header, payload, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(AuthError::PoorlyFormattedToken("expected three dot-separated segments".into())),
        };
        let provided = base64::decode_config(signature, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(format!("{header}.{payload}").as_bytes());
        mac.verify_slice(&provided).map_err(|_| AuthError::ValidationError("signature mismatch".into()))?;
        let payload = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let claims: JwtClaims =
            serde_json::from_slice(&payload).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        if claims.exp < Utc::now().timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.config.jwt_secret.reveal().as_bytes())
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }

    fn sign(&self, message: &str) -> Result<Vec<u8>, AuthError> {
        let mut mac = self.mac()?;
        mac.update(message.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn extract_claims(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::InitializeError("TokenIssuer is not registered on the app".into()))?;
    let header = req.headers().get(header::AUTHORIZATION).ok_or(ServerError::CouldNotDeserializeAuthToken)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ServerError::CouldNotDeserializeAuthToken)?;
    Ok(issuer.validate_token(token.trim())?)
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_claims(req))
    }
}
