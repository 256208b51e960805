// ── Inbound Basic credentials ──

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::SecretString;

use crate::error::CoreError;

/// Username/password pair forwarded to the device login form.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Decode an `Authorization: Basic <base64(user:pass)>` header value.
    ///
    /// The password may itself contain `:`; only the first colon splits.
    pub fn from_basic_header(value: &str) -> Result<Self, CoreError> {
        let encoded = value
            .strip_prefix("Basic ")
            .ok_or_else(|| CoreError::missing("Basic authorization required"))?
            .trim();

        let decoded = STANDARD
            .decode(encoded)
            .map_err(|_| CoreError::missing("malformed Basic credentials"))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| CoreError::missing("Basic credentials are not UTF-8"))?;

        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| CoreError::missing("Basic credentials lack a ':' separator"))?;

        Ok(Self::new(username, password))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn decodes_user_and_password() {
        // "admin:s3cret"
        let creds = Credentials::from_basic_header("Basic YWRtaW46czNjcmV0").unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password.expose_secret(), "s3cret");
    }

    #[test]
    fn password_keeps_extra_colons() {
        let header = format!("Basic {}", STANDARD.encode("admin:a:b:c"));
        let creds = Credentials::from_basic_header(&header).unwrap();
        assert_eq!(creds.password.expose_secret(), "a:b:c");
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(matches!(
            Credentials::from_basic_header("Bearer abc"),
            Err(CoreError::MissingInput { .. })
        ));
        assert!(matches!(
            Credentials::from_basic_header("Basic !!!"),
            Err(CoreError::MissingInput { .. })
        ));
        let no_colon = format!("Basic {}", STANDARD.encode("admin"));
        assert!(matches!(
            Credentials::from_basic_header(&no_colon),
            Err(CoreError::MissingInput { .. })
        ));
    }
}
