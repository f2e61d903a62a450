#![allow(dead_code)]

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

pub const KID: &str = "integration";
pub const SECRET: &[u8] = b"integration-test-secret";

pub fn temp_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().unwrap()
}

pub fn token_config() -> configd::core::token::Config {
    let mut keys = HashMap::new();
    keys.insert(
        KID.to_owned(),
        configd::core::token::KeyConfig::Secret(STANDARD.encode(SECRET)),
    );
    configd::core::token::Config { keys }
}

#[derive(Serialize)]
struct Claims<'a> {
    aud: &'a str,
    role: &'a str,
    exp: i64,
}

/// Token of `role` in organization `org`, valid for an hour.
pub fn issue(org: &str, role: &str) -> String {
    let header = Header {
        kid: Some(KID.to_owned()),
        ..Header::new(Algorithm::HS256)
    };
    let claims = Claims {
        aud: org,
        role,
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

pub fn config() -> configd::config::Config {
    let mut config = configd::config::Config::default();
    config.token = token_config();
    config
}
