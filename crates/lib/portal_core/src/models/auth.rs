//! Identity domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! models in `portal_api` (which use camelCase on the wire).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Portal role.
///
/// Roles are independent grants, not a privilege ladder: callers are checked
/// against explicit allow-sets and never compared by rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular client of the portal.
    User,
    /// Agent handling client leads and bookings.
    Berater,
    /// Portal administrator.
    Admin,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 3] = [Role::User, Role::Berater, Role::Admin];

    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Berater => "berater",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known role.
#[derive(Debug, Clone, Error)]
#[error("unknown role '{0}' (expected user, berater or admin)")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "berater" => Ok(Role::Berater),
            "admin" => Ok(Role::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Whether a token grants API access or only the right to mint a new pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Verified identity claims embedded in every token.
///
/// Produced only by `TokenService` after signature, expiry and revocation
/// checks have passed. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user ID (standard JWT `sub` claim).
    pub sub: String,
    /// User email.
    pub email: String,
    /// Granted role.
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Unique token identifier, the revocation key.
    pub jti: String,
    /// Issuer.
    pub iss: String,
    /// Token kind.
    pub typ: TokenKind,
}

/// Freshly issued access + refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry (unix timestamp).
    pub access_expires_at: i64,
    /// Refresh token expiry (unix timestamp).
    pub refresh_expires_at: i64,
}
