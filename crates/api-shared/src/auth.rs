/// API key failures.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing x-api-key header")]
    Missing,
    #[error("Invalid API key")]
    Invalid,
}

/// Validates the provided API key against the configured one.
///
/// With no key configured every request passes, which is how the local demo server runs.
pub fn validate_api_key(provided: Option<&str>, expected: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected.filter(|k| !k.is_empty()) else {
        return Ok(());
    };
    match provided {
        None => Err(AuthError::Missing),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AuthError::Invalid),
    }
}
