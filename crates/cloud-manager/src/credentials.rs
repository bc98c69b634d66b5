use std::fmt;
use std::path::Path;

use crate::error::CloudError;

pub const CREDENTIALS_FILE: &str = "aws.properties";

/// Static keys read from `<env_dir>/aws.properties`.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Load static credentials when the environment directory carries them,
/// otherwise return `None` so the SDK default chain (env vars, profile,
/// instance role) applies.
pub fn load(env_dir: &Path) -> Result<Option<StaticCredentials>, CloudError> {
    let path = env_dir.join(CREDENTIALS_FILE);
    if !path.is_file() {
        tracing::info!("not found aws.properties, use default credentials (env or instance profile)");
        return Ok(None);
    }

    tracing::info!(file = %path.display(), "found aws.properties, use it as aws credentials");
    let contents = std::fs::read_to_string(&path)?;
    parse(&contents).map(Some)
}

/// Java-style properties: `key=value` or `key: value`, `#`/`!` comments.
fn parse(contents: &str) -> Result<StaticCredentials, CloudError> {
    let mut access_key = None;
    let mut secret_key = None;

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once(['=', ':']) else {
            continue;
        };
        match key.trim() {
            "accessKey" => access_key = Some(value.trim().to_string()),
            "secretKey" => secret_key = Some(value.trim().to_string()),
            _ => {}
        }
    }

    match (access_key, secret_key) {
        (Some(access_key), Some(secret_key)) if !access_key.is_empty() && !secret_key.is_empty() => {
            Ok(StaticCredentials {
                access_key,
                secret_key,
            })
        }
        _ => Err(CloudError::Config(format!(
            "{CREDENTIALS_FILE} must define accessKey and secretKey"
        ))),
    }
}
