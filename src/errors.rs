use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Failed to read encrypted client secret from {source_name}: {err}")]
    InputRead {
        source_name: String,
        #[source]
        err: io::Error,
    },

    #[error("Failed to decode base64 client secret: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("Failed to load private key {}: {reason}", path.display())]
    KeyLoad { path: PathBuf, reason: String },

    /// Wrong key, corrupted ciphertext and bad length all land here,
    /// with no detail attached.
    #[error("Failed to decrypt client secret")]
    Decryption,

    #[error("Decrypted client secret is not valid UTF-8")]
    InvalidUtf8,

    #[error("Failed to write client secret: {0}")]
    Output(#[source] io::Error),
}

impl SecretError {
    pub fn key_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::KeyLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn input_read(source_name: impl Into<String>, err: io::Error) -> Self {
        Self::InputRead {
            source_name: source_name.into(),
            err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decryption_message_is_constant() {
        assert_eq!(
            SecretError::Decryption.to_string(),
            "Failed to decrypt client secret"
        );
    }

    #[test]
    fn test_key_load_message_names_path() {
        let err = SecretError::key_load("/keys/client.pem", "no PEM block found");
        assert_eq!(
            err.to_string(),
            "Failed to load private key /keys/client.pem: no PEM block found"
        );
    }

    #[test]
    fn test_input_read_message_names_source() {
        let err = SecretError::input_read(
            "stdin",
            io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8"),
        );
        assert!(err.to_string().starts_with("Failed to read encrypted client secret from stdin"));
    }
}
