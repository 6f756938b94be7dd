use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Audience the identity provider stamps on tokens issued to signed-in users.
const AUTHENTICATED_AUDIENCE: &str = "authenticated";

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[error("token decoding is disabled: no jwt secret configured")]
    MissingSecret,
    #[error("jwt decoding failed: {0}")]
    JwtDecoding(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct UserMetadata {
    #[serde(default)]
    pub(crate) full_name: Option<String>,
}

/// Claims of a provider-issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AccessClaims {
    pub(crate) sub: Uuid,
    pub(crate) exp: i64,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) user_metadata: UserMetadata,
}

pub(crate) fn decode_access_token(token: &str, secret: &str) -> Result<AccessClaims, SecurityError> {
    if secret.is_empty() {
        return Err(SecurityError::MissingSecret);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_audience(&[AUTHENTICATED_AUDIENCE]);
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data =
        decode::<AccessClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}
