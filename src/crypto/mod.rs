mod decryption;
pub mod keys;

use crate::errors::SecretError;
use crate::memory::SecureBuffer;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use keys::PrivateKeyFile;

pub use decryption::{client_secret_padding, decrypt_with_key};

/// Recovers client secrets encrypted to an RSA key with OAEP/SHA-256.
///
/// Holds only where the key lives and how to unlock it. Each call to
/// [`Decryptor::decrypt`] parses the key afresh and drops it before
/// returning, so a `Decryptor` can be shared across threads freely.
#[derive(Debug, Clone)]
pub struct Decryptor {
    key_file: PrivateKeyFile,
}

impl Decryptor {
    pub fn new(key_file: PrivateKeyFile) -> Self {
        Self { key_file }
    }
}

/// Decode standard-alphabet base64, ignoring surrounding whitespace and line
/// breaks inside the text
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, SecretError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_tolerates_whitespace() {
        assert_eq!(decode_base64("c2VjcmV0\n").unwrap(), b"secret");
        assert_eq!(decode_base64("  c2Vj\r\ncmV0  ").unwrap(), b"secret");
    }

    #[test]
    fn test_decode_base64_rejects_garbage() {
        assert!(matches!(
            decode_base64("not-base64!!"),
            Err(SecretError::Base64Decode(_))
        ));
        // Missing padding
        assert!(matches!(
            decode_base64("c2VjcmV0c"),
            Err(SecretError::Base64Decode(_))
        ));
        // URL-safe alphabet
        assert!(matches!(
            decode_base64("-_-_"),
            Err(SecretError::Base64Decode(_))
        ));
    }

    #[test]
    fn test_decryptor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Decryptor>();
    }
}
