//! JWT token issuance, verification and revocation.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AuthError;
use super::revocation::RevocationSet;
use crate::models::auth::{Claims, Role, TokenKind, TokenPair};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 30 days.
pub const REFRESH_TOKEN_EXPIRY_SECS: i64 = 30 * 24 * 60 * 60;

/// Token lifetimes and validation knobs.
#[derive(Clone, Debug)]
pub struct TokenSettings {
    /// Value of the `iss` claim, checked on verification.
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Clock skew tolerated on expiry, in seconds.
    pub leeway_secs: u64,
    /// Revoke the presented refresh token when a new pair is issued.
    pub rotate_refresh_tokens: bool,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: "portal".to_string(),
            access_ttl: Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS),
            refresh_ttl: Duration::seconds(REFRESH_TOKEN_EXPIRY_SECS),
            leeway_secs: 0,
            rotate_refresh_tokens: true,
        }
    }
}

/// Issues, verifies and revokes HS256 identity tokens.
///
/// Owns the revocation set; construct one per process and share it by
/// reference (typically behind an `Arc`).
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    settings: TokenSettings,
    revoked: RevocationSet,
}

impl TokenService {
    pub fn new(secret: &[u8], settings: TokenSettings) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            settings,
            revoked: RevocationSet::new(),
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issue a fresh access + refresh pair for `subject`.
    pub fn issue(&self, subject: &str, role: Role, email: &str) -> Result<TokenPair, AuthError> {
        let (access_token, access_expires_at) =
            self.sign(subject, role, email, TokenKind::Access, self.settings.access_ttl)?;
        let (refresh_token, refresh_expires_at) =
            self.sign(subject, role, email, TokenKind::Refresh, self.settings.refresh_ttl)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Verify any token issued by this service.
    ///
    /// Checks run in a fixed order: signature, then expiry, then revocation.
    /// A token that fails the signature check never reaches the revocation set.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation(true))
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => {
                    debug!(error = %e, "token rejected");
                    AuthError::InvalidToken
                }
            })?
            .claims;

        if self.revoked.is_revoked(&claims.jti) {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    /// Verify a token and require it to be an access token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.verify(token)?;
        if claims.typ != TokenKind::Access {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    /// Revoke a token. Expired tokens may still be revoked; revoking twice is a no-op.
    pub fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation(false))
            .map_err(|_| AuthError::InvalidToken)?
            .claims;
        self.revoke_claims(&claims);
        Ok(())
    }

    /// Revoke an already verified token by its claims.
    pub fn revoke_claims(&self, claims: &Claims) {
        if self.revoked.revoke(&claims.jti, claims.exp) {
            info!(sub = %claims.sub, jti = %claims.jti, typ = ?claims.typ, "token revoked");
        }
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// With rotation enabled the presented token is revoked atomically, so
    /// concurrent refreshes of one token cannot both succeed.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.verify(refresh_token)?;
        if claims.typ != TokenKind::Refresh {
            return Err(AuthError::InvalidToken);
        }
        if self.settings.rotate_refresh_tokens && !self.revoked.revoke(&claims.jti, claims.exp) {
            return Err(AuthError::Revoked);
        }
        self.issue(&claims.sub, claims.role, &claims.email)
    }

    /// Forget revocations of tokens that can no longer pass the expiry check.
    pub fn purge_expired(&self) -> usize {
        let horizon = Utc::now().timestamp() - self.settings.leeway_secs as i64;
        self.revoked.purge_expired(horizon)
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }

    fn sign(
        &self,
        subject: &str,
        role: Role,
        email: &str,
        typ: TokenKind,
        ttl: Duration,
    ) -> Result<(String, i64), AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            iss: self.settings.issuer.clone(),
            typ,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))?;
        Ok((token, claims.exp))
    }

    fn validation(&self, validate_exp: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = validate_exp;
        validation.leeway = self.settings.leeway_secs;
        validation.set_issuer(&[self.settings.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation
    }
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    for var in ["JWT_SECRET", "AUTH_SECRET"] {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    load_or_create_secret(&jwt_secret_path())
}

/// Read the secret stored at `path`, generating and persisting one if absent.
///
/// A secret that cannot be persisted is still returned, but it will differ on
/// the next start and invalidate every outstanding token.
pub fn load_or_create_secret(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(existing) if !existing.trim().is_empty() => return existing.trim().to_string(),
        Ok(_) => debug!(path = %path.display(), "JWT secret file is empty"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "cannot read JWT secret file"),
    }

    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();

    let persisted = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| std::fs::write(path, &secret));
    match persisted {
        Ok(()) => info!(path = %path.display(), "generated new JWT secret"),
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "generated JWT secret could not be persisted; tokens will not survive a restart"
        ),
    }
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("portal")
        .join("jwt-secret")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const SECRET: &[u8] = b"unit-test-secret";

    fn service() -> TokenService {
        TokenService::new(SECRET, TokenSettings::default())
    }

    #[test]
    fn issued_access_token_round_trips() {
        let tokens = service();
        for role in Role::ALL {
            let pair = tokens.issue("user-1", role, "a@example.com").unwrap();
            let claims = tokens.verify(&pair.access_token).unwrap();
            assert_eq!(claims.sub, "user-1");
            assert_eq!(claims.role, role);
            assert_eq!(claims.email, "a@example.com");
            assert_eq!(claims.typ, TokenKind::Access);
            assert_eq!(claims.exp, pair.access_expires_at);
        }
    }

    #[test]
    fn pair_has_distinct_identifiers_and_expiries() {
        let tokens = service();
        let pair = tokens.issue("u", Role::User, "u@example.com").unwrap();
        let access = tokens.verify(&pair.access_token).unwrap();
        let refresh = tokens.verify(&pair.refresh_token).unwrap();
        assert_ne!(access.jti, refresh.jti);
        assert!(refresh.exp > access.exp);
        assert_eq!(refresh.typ, TokenKind::Refresh);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let pair = service().issue("u", Role::User, "u@example.com").unwrap();
        let other = TokenService::new(b"another-secret", TokenSettings::default());
        assert_eq!(other.verify(&pair.access_token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(service().verify("not-a-jwt"), Err(AuthError::InvalidToken));
        assert_eq!(service().verify(""), Err(AuthError::InvalidToken));
    }

    #[test]
    fn expired_token_reports_expired() {
        let tokens = TokenService::new(
            SECRET,
            TokenSettings {
                access_ttl: Duration::seconds(-120),
                ..TokenSettings::default()
            },
        );
        let pair = tokens.issue("u", Role::User, "u@example.com").unwrap();
        assert_eq!(tokens.verify(&pair.access_token), Err(AuthError::Expired));
    }

    #[test]
    fn signature_is_checked_before_expiry() {
        let tokens = TokenService::new(
            SECRET,
            TokenSettings {
                access_ttl: Duration::seconds(-120),
                ..TokenSettings::default()
            },
        );
        let pair = tokens.issue("u", Role::User, "u@example.com").unwrap();
        let other = TokenService::new(b"another-secret", TokenSettings::default());
        assert_eq!(other.verify(&pair.access_token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn foreign_issuer_is_invalid() {
        let foreign = TokenService::new(
            SECRET,
            TokenSettings {
                issuer: "someone-else".into(),
                ..TokenSettings::default()
            },
        );
        let pair = foreign.issue("u", Role::User, "u@example.com").unwrap();
        assert_eq!(service().verify(&pair.access_token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn revoked_token_stays_revoked() {
        let tokens = service();
        let pair = tokens.issue("u", Role::Admin, "u@example.com").unwrap();
        tokens.revoke(&pair.access_token).unwrap();
        tokens.revoke(&pair.access_token).unwrap();
        for _ in 0..3 {
            assert_eq!(tokens.verify(&pair.access_token), Err(AuthError::Revoked));
        }
        assert_eq!(tokens.purge_expired(), 0);
        assert_eq!(tokens.verify(&pair.access_token), Err(AuthError::Revoked));
        // The sibling refresh token is untouched.
        assert!(tokens.verify(&pair.refresh_token).is_ok());
    }

    #[test]
    fn purged_revocation_still_fails_as_expired() {
        let tokens = TokenService::new(
            SECRET,
            TokenSettings {
                access_ttl: Duration::seconds(-120),
                ..TokenSettings::default()
            },
        );
        let pair = tokens.issue("u", Role::User, "u@example.com").unwrap();
        tokens.revoke(&pair.access_token).unwrap();
        assert_eq!(tokens.revoked_count(), 1);

        assert_eq!(tokens.purge_expired(), 1);
        assert_eq!(tokens.revoked_count(), 0);
        assert_eq!(tokens.verify(&pair.access_token), Err(AuthError::Expired));
    }

    #[test]
    fn unwritable_secret_path_still_yields_a_secret() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let secret = load_or_create_secret(&blocker.join("jwt-secret"));
        assert_eq!(secret.len(), 64);
    }

    #[test]
    fn revoking_garbage_fails() {
        assert_eq!(service().revoke("nope"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn access_only_rejects_refresh_tokens() {
        let tokens = service();
        let pair = tokens.issue("u", Role::User, "u@example.com").unwrap();
        assert_eq!(tokens.verify_access(&pair.refresh_token), Err(AuthError::InvalidToken));
        assert!(tokens.verify_access(&pair.access_token).is_ok());
    }

    #[test]
    fn refresh_rotates_the_presented_token() {
        let tokens = service();
        let pair = tokens.issue("u", Role::Berater, "u@example.com").unwrap();
        let next = tokens.refresh(&pair.refresh_token).unwrap();

        let claims = tokens.verify_access(&next.access_token).unwrap();
        assert_eq!(claims.sub, "u");
        assert_eq!(claims.role, Role::Berater);

        assert_eq!(tokens.refresh(&pair.refresh_token), Err(AuthError::Revoked));
        assert!(tokens.refresh(&next.refresh_token).is_ok());
    }

    #[test]
    fn refresh_without_rotation_allows_reuse() {
        let tokens = TokenService::new(
            SECRET,
            TokenSettings {
                rotate_refresh_tokens: false,
                ..TokenSettings::default()
            },
        );
        let pair = tokens.issue("u", Role::User, "u@example.com").unwrap();
        assert!(tokens.refresh(&pair.refresh_token).is_ok());
        assert!(tokens.refresh(&pair.refresh_token).is_ok());
    }

    #[test]
    fn refresh_rejects_access_tokens() {
        let tokens = service();
        let pair = tokens.issue("u", Role::User, "u@example.com").unwrap();
        assert_eq!(tokens.refresh(&pair.access_token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn concurrent_refresh_of_one_token_succeeds_once() {
        let tokens = Arc::new(service());
        let pair = tokens.issue("u", Role::User, "u@example.com").unwrap();

        let successes = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let tokens = Arc::clone(&tokens);
                    let token = pair.refresh_token.clone();
                    scope.spawn(move || tokens.refresh(&token).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(successes, 1);
    }

    #[test]
    fn secret_is_generated_once_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jwt-secret");
        let first = load_or_create_secret(&path);
        assert_eq!(first.len(), 64);
        assert_eq!(load_or_create_secret(&path), first);
    }
}
