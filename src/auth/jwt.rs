use crate::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Verify signature and expiry; token type is checked by the caller.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

/// Tokens are issued by the identity service; this mirrors its access tokens.
#[cfg(test)]
pub fn generate_access_token(
    user_id: u64,
    username: String,
    role: crate::model::role::Role,
    secret: &str,
    ttl: usize,
) -> String {
    use crate::models::TokenType;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        user_id,
        sub: username,
        role,
        exp: now + ttl,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type: TokenType::Access,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
