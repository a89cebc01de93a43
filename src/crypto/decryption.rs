use super::*;

use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey};
use sha2::Sha256;

/// OAEP parameters agreed with the issuer: SHA-256 digest, MGF1 over
/// SHA-256, no label.
pub fn client_secret_padding() -> Oaep {
    Oaep::new::<Sha256>()
}

/// RSA-OAEP decryption with an already parsed key.
///
/// A ciphertext whose length differs from the modulus is refused before any
/// big-number work. Every failure collapses into [`SecretError::Decryption`].
pub fn decrypt_with_key(
    key: &RsaPrivateKey,
    ciphertext: &[u8],
) -> Result<SecureBuffer, SecretError> {
    if ciphertext.len() != key.size() {
        return Err(SecretError::Decryption);
    }

    key.decrypt_blinded(&mut OsRng, client_secret_padding(), ciphertext)
        .map(SecureBuffer::new)
        .map_err(|_| SecretError::Decryption)
}

impl Decryptor {
    /// Load the key, decrypt, drop the key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<SecureBuffer, SecretError> {
        let key = self.key_file.load()?;
        let result = decrypt_with_key(&key, ciphertext);
        drop(key);

        match &result {
            Ok(plaintext) => tracing::debug!(bytes = plaintext.len(), "client secret decrypted"),
            Err(e) => tracing::debug!("{}", e),
        }
        result
    }

    /// Base64-decode `encoded` and decrypt the result
    pub fn decrypt_base64(&self, encoded: &str) -> Result<SecureBuffer, SecretError> {
        let ciphertext = decode_base64(encoded)?;
        self.decrypt(&ciphertext)
    }
}
