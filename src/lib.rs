//! Recover client secrets that an identity provider encrypted to our RSA key.
//!
//! The issuer encrypts with RSA-OAEP (SHA-256, MGF1-SHA-256, empty label)
//! and ships the result as base64 text. [`crypto::Decryptor`] turns that back
//! into the plaintext secret; the `decrypt-client-secret` binary wraps it in
//! a small CLI. [`relay`] renders the OAuth callback page used during the
//! login flow that issues those secrets.

pub mod cli;
pub mod crypto;
pub mod errors;
pub mod filesystem;
pub mod logging;
pub mod memory;
pub mod relay;

pub use crypto::Decryptor;
pub use crypto::keys::PrivateKeyFile;
pub use errors::SecretError;
pub use memory::SecureBuffer;

use cli::Cli;
use filesystem::{FileManager, InputSource};
use std::io::Write;
use zeroize::Zeroizing;

/// Read, decode and decrypt the secret described by `cli`, then write it to
/// `out`. Nothing is written unless every step succeeded.
pub fn decrypt_client_secret(cli: &Cli, out: &mut impl Write) -> Result<(), SecretError> {
    let decryptor = Decryptor::new(key_file_from_cli(cli)?);

    let source = InputSource::from_arg(cli.encrypted_secret.as_deref());
    let encoded = FileManager.read_input(&source)?;
    tracing::debug!(%source, chars = encoded.len(), "read encrypted client secret");

    let plaintext = decryptor.decrypt_base64(&encoded)?;
    let secret = plaintext.as_str().ok_or(SecretError::InvalidUtf8)?;

    let mut line = Zeroizing::new(String::with_capacity(secret.len() + 1));
    line.push_str(secret);
    if !cli.no_newline {
        line.push('\n');
    }

    out.write_all(line.as_bytes())
        .and_then(|()| out.flush())
        .map_err(SecretError::Output)
}

/// `--passphrase-file` takes precedence over `--passphrase` and its
/// environment variable
fn key_file_from_cli(cli: &Cli) -> Result<PrivateKeyFile, SecretError> {
    let key_file = PrivateKeyFile::new(&cli.private_key);

    let passphrase = match (&cli.passphrase_file, &cli.passphrase) {
        (Some(path), _) => Some(FileManager.read_passphrase_file(path)?),
        (None, Some(passphrase)) => Some(Zeroizing::new(passphrase.clone())),
        (None, None) => None,
    };

    Ok(match passphrase {
        Some(passphrase) => key_file.with_passphrase(passphrase.as_str()),
        None => key_file,
    })
}
