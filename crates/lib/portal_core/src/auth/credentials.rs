//! Credential extraction from request metadata.

use http::HeaderMap;
use http::header::{AUTHORIZATION, HeaderName};

use super::AuthError;

const BEARER_SCHEME: &str = "Bearer";

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }
    parse_bearer(value)
}

/// Parse `Bearer <token>`: case-sensitive scheme, exactly one space, one
/// non-empty token.
pub fn parse_bearer(value: &str) -> Result<&str, AuthError> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Extract an API key from `header`, falling back to the `query_param`
/// query-string parameter.
pub fn api_key(
    headers: &HeaderMap,
    query: Option<&str>,
    header: &HeaderName,
    query_param: &str,
) -> Result<String, AuthError> {
    if let Some(value) = headers.get(header)
        && let Ok(key) = value.to_str()
        && !key.is_empty()
    {
        return Ok(key.to_string());
    }

    query
        .into_iter()
        .flat_map(|q| url::form_urlencoded::parse(q.as_bytes()))
        .find(|(name, value)| name == query_param && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .ok_or(AuthError::MissingApiKey)
}
