// src/crypto/keys.rs
use crate::errors::SecretError;
use crate::filesystem::FileManager;

use rsa::RsaPrivateKey;
use rsa::pkcs1::{self, DecodeRsaPrivateKey};
use rsa::pkcs8::{EncryptedPrivateKeyInfo, PrivateKeyInfo, SecretDocument};
use rsa::traits::PublicKeyParts;
use std::fmt;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

const PEM_BEGIN: &str = "-----BEGIN ";
const PEM_END: &str = "-----END ";
const LEGACY_ENCRYPTION_HEADER: &str = "Proc-Type: 4,ENCRYPTED";

/// PEM encodings of an RSA private key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFormat {
    /// `PRIVATE KEY`
    Pkcs8,
    /// `ENCRYPTED PRIVATE KEY`
    EncryptedPkcs8,
    /// `RSA PRIVATE KEY`
    Pkcs1,
    /// `RSA PRIVATE KEY` with OpenSSL `Proc-Type`/`DEK-Info` headers
    LegacyEncryptedPkcs1,
}

/// Why PEM text did not yield an RSA private key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// A readable private key for some other algorithm (EC, DSA, Ed25519)
    NotRsa,
    /// Anything else, with a human readable reason
    Invalid(String),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::NotRsa => write!(f, "not an RSA private key"),
            KeyError::Invalid(reason) => write!(f, "{}", reason),
        }
    }
}

impl From<String> for KeyError {
    fn from(reason: String) -> Self {
        KeyError::Invalid(reason)
    }
}

impl From<&str> for KeyError {
    fn from(reason: &str) -> Self {
        KeyError::Invalid(reason.to_string())
    }
}

/// Location of a PEM private key plus the passphrase that unlocks it.
///
/// Nothing is read until [`PrivateKeyFile::load`] is called, and the parsed
/// key is handed back to the caller instead of being kept here.
#[derive(Clone)]
pub struct PrivateKeyFile {
    path: PathBuf,
    passphrase: Option<Zeroizing<String>>,
}

impl PrivateKeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            passphrase: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(Zeroizing::new(passphrase.into()));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the key. Every buffer holding PEM text is wiped before
    /// this returns, on success and on error alike.
    ///
    /// A key of another algorithm cannot decrypt the secret at all, so it
    /// fails as [`SecretError::Decryption`] rather than as a load error.
    pub fn load(&self) -> Result<RsaPrivateKey, SecretError> {
        let pem = FileManager.read_key_pem(&self.path)?;
        let passphrase = self.passphrase.as_ref().map(|p| p.as_str());

        let key = parse_private_key(&pem, passphrase).map_err(|e| match e {
            KeyError::NotRsa => {
                tracing::debug!(path = %self.path.display(), "private key is not RSA");
                SecretError::Decryption
            }
            KeyError::Invalid(reason) => SecretError::key_load(&self.path, reason),
        })?;

        tracing::debug!(
            path = %self.path.display(),
            modulus_bytes = key.size(),
            "private key loaded"
        );
        Ok(key)
    }
}

impl fmt::Debug for PrivateKeyFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyFile")
            .field("path", &self.path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Parse PEM text into an RSA private key.
pub fn parse_private_key(pem: &str, passphrase: Option<&str>) -> Result<RsaPrivateKey, KeyError> {
    let (format, block) = find_pem_block(pem)?;
    tracing::debug!(?format, "detected private key encoding");

    let key = match (format, passphrase) {
        (KeyFormat::LegacyEncryptedPkcs1, _) => Err(KeyError::from(
            "OpenSSL legacy encrypted PKCS#1 keys are not supported; \
             convert with `openssl pkcs8 -topk8 -v2 aes-256-cbc`",
        )),
        (KeyFormat::EncryptedPkcs8, None) => Err(KeyError::from(
            "key is encrypted but no passphrase was supplied",
        )),
        (KeyFormat::EncryptedPkcs8, Some(passphrase)) => {
            let document = pem_document(block, "encrypted PKCS#8")?;
            let decrypted = EncryptedPrivateKeyInfo::try_from(document.as_bytes())
                .and_then(|info| info.decrypt(passphrase.as_bytes()))
                .map_err(|_| "wrong passphrase or malformed encrypted PKCS#8 key")?;
            rsa_key_from_pkcs8(decrypted.as_bytes())
        }
        (KeyFormat::Pkcs8 | KeyFormat::Pkcs1, Some(_)) => Err(KeyError::from(
            "passphrase supplied but key is not encrypted",
        )),
        (KeyFormat::Pkcs8, None) => rsa_key_from_pkcs8(pem_document(block, "PKCS#8")?.as_bytes()),
        (KeyFormat::Pkcs1, None) => RsaPrivateKey::from_pkcs1_pem(block)
            .map_err(|e| KeyError::from(format!("malformed PKCS#1 RSA key: {}", e))),
    }?;

    key.validate()
        .map_err(|e| format!("inconsistent RSA key parameters: {}", e))?;
    Ok(key)
}

fn pem_document(block: &str, kind: &str) -> Result<SecretDocument, KeyError> {
    SecretDocument::from_pem(block)
        .map(|(_, document)| document)
        .map_err(|e| KeyError::from(format!("malformed {} key: {}", kind, e)))
}

/// Decode a PKCS#8 `PrivateKeyInfo`, checking its algorithm before
/// interpreting the key material as RSA.
fn rsa_key_from_pkcs8(der: &[u8]) -> Result<RsaPrivateKey, KeyError> {
    let info = PrivateKeyInfo::try_from(der)
        .map_err(|e| format!("malformed PKCS#8 key: {}", e))?;

    if info.algorithm.oid != pkcs1::ALGORITHM_OID {
        tracing::debug!(oid = %info.algorithm.oid, "PKCS#8 key uses another algorithm");
        return Err(KeyError::NotRsa);
    }

    RsaPrivateKey::try_from(info)
        .map_err(|e| KeyError::from(format!("malformed PKCS#8 RSA key: {}", e)))
}

/// Locate the first PEM block, skipping any leading text such as
/// `Bag Attributes` emitted by `openssl pkcs12`.
fn find_pem_block(pem: &str) -> Result<(KeyFormat, &str), KeyError> {
    let start = pem.find(PEM_BEGIN).ok_or("no PEM block found")?;
    let rest = &pem[start..];

    let label_end = rest[PEM_BEGIN.len()..]
        .find("-----")
        .ok_or("truncated PEM header")?;
    let label = &rest[PEM_BEGIN.len()..PEM_BEGIN.len() + label_end];

    let end_marker = format!("{}{}-----", PEM_END, label);
    let end = rest
        .find(&end_marker)
        .ok_or_else(|| format!("missing `{}` line", end_marker))?;
    let mut block_end = end + end_marker.len();
    if rest[block_end..].starts_with("\r\n") {
        block_end += 2;
    } else if rest[block_end..].starts_with('\n') {
        block_end += 1;
    }
    let block = &rest[..block_end];

    let format = match label {
        "PRIVATE KEY" => KeyFormat::Pkcs8,
        "ENCRYPTED PRIVATE KEY" => KeyFormat::EncryptedPkcs8,
        "RSA PRIVATE KEY" if block.contains(LEGACY_ENCRYPTION_HEADER) => {
            KeyFormat::LegacyEncryptedPkcs1
        }
        "RSA PRIVATE KEY" => KeyFormat::Pkcs1,
        // Traditional OpenSSL encodings of non-RSA keys
        "EC PRIVATE KEY" | "DSA PRIVATE KEY" => return Err(KeyError::NotRsa),
        other => return Err(format!("expected an RSA private key, found `{}`", other).into()),
    };

    Ok((format, block))
}
