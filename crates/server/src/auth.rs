//! Credential service: password hashing, access tokens, and the request
//! extractor that turns a bearer token into a [`User`].

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::AppState;
use crate::config::MAX_TOKEN_TTL_MINUTES;
use crate::error::ApiError;
use crate::store::{User, UserId};

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Issues and validates HS256 access tokens bound to a user id.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    /// `ttl_minutes` is clamped to `1..=MAX_TOKEN_TTL_MINUTES`.
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes.clamp(1, MAX_TOKEN_TTL_MINUTES)),
        }
    }

    pub fn issue(&self, user_id: UserId) -> Result<String, ApiError> {
        let expires = OffsetDateTime::now_utc()
            .checked_add(self.ttl)
            .ok_or_else(|| ApiError::Internal("token expiry out of range".to_string()))?;
        let claims = Claims { sub: user_id.to_string(), exp: expires.unix_timestamp() };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// The user id in `token`, or `None` if it is malformed, forged or expired.
    pub fn validate(&self, token: &str) -> Option<UserId> {
        match decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256)) {
            Ok(data) => data.claims.sub.parse().ok(),
            Err(err) => {
                debug!(error = %err, "rejected access token");
                None
            }
        }
    }
}

/// PBKDF2-HMAC-SHA256 password hashing with a random per-password salt.
///
/// Hashes are stored as `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`, so
/// the iteration count can change without invalidating existing hashes.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self { iterations: iterations.max(1) }
    }

    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let mut key = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, self.iterations, &mut key);

        format!("{HASH_SCHEME}${}${}${}", self.iterations, hex::encode(salt), hex::encode(key))
    }

    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let mut parts = encoded.split('$');
        let (Some(HASH_SCHEME), Some(iterations), Some(salt), Some(expected), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };

        let (Ok(iterations), Ok(salt), Ok(expected)) =
            (iterations.parse::<u32>(), hex::decode(salt), hex::decode(expected))
        else {
            return false;
        };
        if iterations == 0 || expected.is_empty() {
            return false;
        }

        let mut key = vec![0u8; expected.len()];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut key);

        constant_time_eq(&key, &expected)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(100_000)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// The authenticated caller.
///
/// A missing or non-bearer `Authorization` header is rejected with 403; a
/// token that fails validation, or names a deleted user, with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Forbidden("Not authenticated".to_string()))?;

        let token = bearer_token(header)
            .ok_or_else(|| ApiError::Forbidden("Invalid authentication credentials".to_string()))?;

        let invalid = || ApiError::Unauthorized("Could not validate credentials".to_string());
        let user_id = state.tokens.validate(token).ok_or_else(invalid)?;
        let user = state.store.user_by_id(user_id).await?.ok_or_else(invalid)?;

        Ok(AuthUser(user))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() { Some(token) } else { None }
}
