use std::env;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("Secret '{0}' is not set in the environment")]
    Missing(String),
}

/// Look up a named secret from the environment. `.env` files are folded into
/// the environment at process startup, so this is the single lookup path.
///
/// Secrets are resolved at agent construction time, before any tool that
/// needs one can run.
pub fn get_secret(key: &str) -> Result<String, SecretsError> {
    env::var(key).map_err(|_| SecretsError::Missing(key.to_string()))
}
