use jsonwebtoken::{encode, EncodingKey, Header};

/// Test JWT secret (must match the test config).
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

/// Sign a token for `user_id` valid for an hour.
pub fn token_for(user_id: i64) -> String {
    let claims = serde_json::json!({
        "sub": user_id.to_string(),
        "username": format!("user{}", user_id),
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// `Authorization` header value for `user_id`.
pub fn bearer(user_id: i64) -> String {
    format!("Bearer {}", token_for(user_id))
}
