use std::fmt;
use std::str::FromStr;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::Timestamp;

/// Lifetime of an issued token, in seconds.
pub const TOKEN_LIFETIME: u64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    Malformed,
    Expired,
    Invalid,
}

impl AuthError {
    pub fn message(self) -> &'static str {
        match self {
            Self::Missing => "Auth failed, No token provided",
            Self::Malformed => "Auth failed, Invalid token format",
            Self::Expired => "Auth failed, Token expired",
            Self::Invalid => "Auth failed, Invalid token",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.message())
    }
}

/// The token half of an `Authorization: Bearer <token>` header.
#[derive(Debug)]
pub struct Bearer(String);

impl FromStr for Bearer {
    type Err = AuthError;

    fn from_str(header: &str) -> Result<Self, Self::Err> {
        let parts = header.split(' ').collect::<Vec<_>>();

        let [_scheme, token] = parts[..] else {
            debug!("auth header has {} parts", parts.len());
            return Err(AuthError::Malformed);
        };

        Ok(Self(token.into()))
    }
}

impl Bearer {
    /// An empty header counts as no header at all.
    pub fn from_header(header: Option<&str>) -> Result<Self, AuthError> {
        match header {
            Some(header) if !header.trim().is_empty() => header.parse(),
            _ => Err(AuthError::Missing),
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub login: String,
    pub name: String,
    pub iat: Timestamp,
    pub exp: Timestamp,
}

pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionIssuer {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, login: &str, name: &str) -> Result<String, ()> {
        self.issue_at(login, name, Timestamp::now()?)
    }

    pub fn issue_at(&self, login: &str, name: &str, now: Timestamp) -> Result<String, ()> {
        let claims = Claims {
            login: login.into(),
            name: name.into(),
            iat: now,
            exp: now.plus_secs(TOKEN_LIFETIME),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(
            |e| {
                error!("couldn't sign token for {login}: {e:?}");
            },
        )
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => {
                    debug!("token rejected: {e:?}");
                    AuthError::Invalid
                }
            })
    }
}

/// An argon2 password digest in PHC string form, salt included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwHash(String);

impl PwHash {
    pub fn new(pwd: &str) -> Result<Self, ()> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(|e| {
            error!("couldn't encode password salt: {e}");
        })?;

        Argon2::default()
            .hash_password(pwd.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
            .map_err(|e| {
                error!("couldn't hash password: {e}");
            })
    }

    pub fn verify(&self, pwd: &str) -> bool {
        let hash = match PasswordHash::new(&self.0) {
            Ok(hash) => hash,
            Err(e) => {
                error!("stored password digest is unreadable: {e}");
                return false;
            }
        };

        Argon2::default()
            .verify_password(pwd.as_bytes(), &hash)
            .is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PwHash {
    fn from(stored: String) -> Self {
        Self(stored)
    }
}
