use clap::Parser;
use std::path::PathBuf;

pub const PASSPHRASE_ENV: &str = "CLIENT_SECRET_KEY_PASSPHRASE";

/// Decrypt an RSA-OAEP (SHA-256) encrypted client secret
#[derive(Parser, Debug)]
#[command(name = "decrypt-client-secret", version)]
pub struct Cli {
    /// PEM private key file (PKCS#1, PKCS#8 or encrypted PKCS#8)
    pub private_key: PathBuf,

    /// File holding the base64 encrypted client secret (omit or use - for stdin)
    pub encrypted_secret: Option<PathBuf>,

    /// Passphrase for an encrypted private key (prefer the environment variable)
    #[arg(long, env = PASSPHRASE_ENV, hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Read the private key passphrase from a file (wins over --passphrase)
    #[arg(long, value_name = "PATH")]
    pub passphrase_file: Option<PathBuf>,

    /// Do not print a trailing newline after the secret
    #[arg(short, long)]
    pub no_newline: bool,

    /// Log filter, e.g. debug (defaults to RUST_LOG, then warn)
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}
