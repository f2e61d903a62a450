use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::common::{debug, ErrorKind, Result};
use crate::core::{Principal, Role};
use crate::protocol;

/// Keystore section of the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// key id to verification key.
    #[serde(default)]
    pub keys: HashMap<String, KeyConfig>,
}

/// A verification key. A bare string is a base64 encoded HS256 secret.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum KeyConfig {
    Secret(String),
    Key {
        algorithm: Algorithm,
        /// base64 encoded secret of the HMAC algorithms.
        #[serde(default)]
        secret: Option<String>,
        /// PEM encoded public key of the RSA, ECDSA and EdDSA algorithms.
        #[serde(default)]
        public_key: Option<String>,
    },
}

pub(crate) trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal>;
}

#[derive(Deserialize)]
struct Claims {
    aud: String,
    role: String,
}

struct VerificationKey {
    key: DecodingKey,
    validation: Validation,
}

/// Verifies tokens against a keystore selected by the `kid` header.
pub(crate) struct JwtVerifier {
    keys: HashMap<String, VerificationKey>,
}

impl JwtVerifier {
    pub(crate) fn from_config(config: &Config) -> Result<Self> {
        let mut keys = HashMap::with_capacity(config.keys.len());
        for (kid, key) in &config.keys {
            let (key, algorithm) = decoding_key(kid, key)
                .map_err(|cause| ErrorKind::Config(format!("token key '{}': {}", kid, cause)))?;

            let mut validation = Validation::new(algorithm);
            // Organization comes from aud, it is not matched against a fixed audience.
            validation.validate_aud = false;

            keys.insert(kid.clone(), VerificationKey { key, validation });
        }

        Ok(Self { keys })
    }

    fn try_verify(&self, token: &str) -> std::result::Result<Principal, String> {
        let header = jsonwebtoken::decode_header(token).map_err(|err| err.to_string())?;
        let kid = header.kid.ok_or("missing kid header")?;
        let VerificationKey { key, validation } = self
            .keys
            .get(&kid)
            .ok_or_else(|| format!("unknown key id '{}'", kid))?;

        let claims = jsonwebtoken::decode::<Claims>(token, key, validation)
            .map_err(|err| err.to_string())?
            .claims;

        if !protocol::is_path_segment(&claims.aud) {
            return Err(format!("invalid organization '{}'", claims.aud));
        }
        let role = claims.role.parse::<Role>()?;

        Ok(Principal {
            organization_id: claims.aud,
            role,
        })
    }
}

fn decoding_key(kid: &str, config: &KeyConfig) -> std::result::Result<(DecodingKey, Algorithm), String> {
    let (algorithm, secret, public_key) = match config {
        KeyConfig::Secret(secret) => (Algorithm::HS256, Some(secret), None),
        KeyConfig::Key {
            algorithm,
            secret,
            public_key,
        } => (*algorithm, secret.as_ref(), public_key.as_ref()),
    };
    debug!(kid, ?algorithm, "Load token key");

    let pem = || {
        public_key
            .map(String::as_bytes)
            .ok_or_else(|| format!("{:?} requires a public_key", algorithm))
    };
    let key = match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            let secret = secret.ok_or_else(|| format!("{:?} requires a secret", algorithm))?;
            let secret = STANDARD
                .decode(secret)
                .map_err(|err| format!("secret is not base64. {}", err))?;
            Ok(DecodingKey::from_secret(&secret))
        }
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem()?),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem()?),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(pem()?),
        #[allow(unreachable_patterns)]
        _ => return Err(format!("unsupported algorithm {:?}", algorithm)),
    }
    .map_err(|err| err.to_string())?;

    Ok((key, algorithm))
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Principal> {
        self.try_verify(token).map_err(|cause| {
            debug!(%cause, "Token verification failed");
            ErrorKind::InvalidToken { cause }.into()
        })
    }
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}
