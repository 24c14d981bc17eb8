//! Signed, time-bounded access and refresh tokens (HS256 JWT).
//!
//! Access and refresh tokens are signed with separate secrets and carry a `typ`
//! claim, so neither can stand in for the other. Expiry is checked here, at
//! verification time, against an explicit clock reading.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::Role;
use super::errors::AuthError;

pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Payload of both token kinds; `role` is present on access tokens only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub typ: TokenKind,
}

/// Verified access-token identity handed to the transport guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: i64,
}

#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPair { .. }")
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Both secrets are required and must be distinct signing domains.
    pub fn new(access_secret: &str, refresh_secret: &str) -> Result<Self, AuthError> {
        if access_secret.is_empty() || refresh_secret.is_empty() {
            return Err(AuthError::TokenError("signing secrets must not be empty".into()));
        }
        if access_secret == refresh_secret {
            return Err(AuthError::TokenError("access and refresh secrets must differ".into()));
        }
        Ok(Self {
            access: SigningKeys::from_secret(access_secret),
            refresh: SigningKeys::from_secret(refresh_secret),
            access_ttl: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            refresh_ttl: Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<TokenPair, AuthError> {
        self.issue_at(user_id, role, Utc::now())
    }

    pub fn issue_at(&self, user_id: Uuid, role: Role, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let iat = now.timestamp();
        let access = Claims {
            sub: user_id,
            role: Some(role),
            iat,
            exp: (now + self.access_ttl).timestamp(),
            jti: Uuid::new_v4(),
            typ: TokenKind::Access,
        };
        let refresh = Claims {
            sub: user_id,
            role: None,
            iat,
            exp: (now + self.refresh_ttl).timestamp(),
            jti: Uuid::new_v4(),
            typ: TokenKind::Refresh,
        };
        Ok(TokenPair {
            access_token: self.sign(&access, &self.access)?,
            refresh_token: self.sign(&refresh, &self.refresh)?,
        })
    }

    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        self.verify_at(token, kind, Utc::now())
    }

    pub fn verify_at(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let keys = match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        };
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared below against `now`, with zero leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &keys.decoding, &validation)
            .map_err(|e| classify(e.kind()))?
            .claims;
        if claims.typ != kind {
            return Err(AuthError::InvalidToken);
        }
        if claims.exp <= now.timestamp() {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let claims = self.verify(token, TokenKind::Access)?;
        let role = claims.role.ok_or(AuthError::MalformedToken)?;
        Ok(AccessClaims { user_id: claims.sub, role, expires_at: claims.exp })
    }

    fn sign(&self, claims: &Claims, keys: &SigningKeys) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }
}

/// Signature, algorithm and time failures are `InvalidToken`; anything that
/// does not even decode is `MalformedToken`.
fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::ExpiredSignature
        | ErrorKind::ImmatureSignature
        | ErrorKind::InvalidAlgorithm => AuthError::InvalidToken,
        _ => AuthError::MalformedToken,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("access-secret-for-tests", "refresh-secret-for-tests").unwrap()
    }

    #[test]
    fn access_token_recovers_subject_and_role() {
        let iss = issuer();
        let uid = Uuid::new_v4();
        let now = Utc::now();
        let pair = iss.issue_at(uid, Role::Admin, now).unwrap();
        let claims = iss.verify_at(&pair.access_token, TokenKind::Access, now).unwrap();
        assert_eq!(claims.sub, uid);
        assert_eq!(claims.role, Some(Role::Admin));
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL_SECS);
    }

    #[test]
    fn access_token_expires_after_fifteen_minutes() {
        let iss = issuer();
        let now = Utc::now();
        let pair = iss.issue_at(Uuid::new_v4(), Role::InventoryManager, now).unwrap();
        let just_before = now + Duration::minutes(15) - Duration::seconds(1);
        assert!(iss.verify_at(&pair.access_token, TokenKind::Access, just_before).is_ok());
        let after = now + Duration::minutes(16);
        assert_eq!(
            iss.verify_at(&pair.access_token, TokenKind::Access, after),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn refresh_token_lives_seven_days_and_has_no_role() {
        let iss = issuer();
        let now = Utc::now();
        let pair = iss.issue_at(Uuid::new_v4(), Role::Admin, now).unwrap();
        let claims = iss
            .verify_at(&pair.refresh_token, TokenKind::Refresh, now + Duration::days(6))
            .unwrap();
        assert!(claims.role.is_none());
        assert_eq!(
            iss.verify_at(&pair.refresh_token, TokenKind::Refresh, now + Duration::days(7)),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let iss = issuer();
        let pair = iss.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert_eq!(iss.verify(&pair.access_token, TokenKind::Refresh), Err(AuthError::InvalidToken));
        assert_eq!(iss.verify(&pair.refresh_token, TokenKind::Access), Err(AuthError::InvalidToken));
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let other = TokenIssuer::new("someone-else-a", "someone-else-r").unwrap();
        let pair = other.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert_eq!(issuer().verify(&pair.access_token, TokenKind::Access), Err(AuthError::InvalidToken));
    }

    #[test]
    fn garbage_is_malformed() {
        let iss = issuer();
        assert_eq!(iss.verify("definitely-not-a-jwt", TokenKind::Access), Err(AuthError::MalformedToken));
        assert_eq!(iss.verify("a.b.c", TokenKind::Access), Err(AuthError::MalformedToken));
    }

    #[test]
    fn pairs_minted_in_the_same_second_differ() {
        let iss = issuer();
        let uid = Uuid::new_v4();
        let now = Utc::now();
        let a = iss.issue_at(uid, Role::Admin, now).unwrap();
        let b = iss.issue_at(uid, Role::Admin, now).unwrap();
        assert_ne!(a.access_token, b.access_token);
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[test]
    fn shared_secret_is_rejected() {
        assert!(TokenIssuer::new("same", "same").is_err());
        assert!(TokenIssuer::new("", "x").is_err());
    }

    #[test]
    fn verify_access_extracts_role() {
        let iss = issuer();
        let uid = Uuid::new_v4();
        let pair = iss.issue(uid, Role::InventoryManager).unwrap();
        let ctx = iss.verify_access(&pair.access_token).unwrap();
        assert_eq!(ctx.user_id, uid);
        assert_eq!(ctx.role, Role::InventoryManager);
    }
}
