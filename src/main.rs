use clap::Parser;
use client_secret_decrypt::cli::Cli;
use client_secret_decrypt::{decrypt_client_secret, logging};
use std::io;
use std::process;

/// Decrypts a client secret issued by the identity provider
///
/// Usage: decrypt-client-secret <private_key_file> [<encrypted_client_secret_file>]
///
/// The encrypted secret is read from stdin when no file is given:
///   cat encrypted_client_secret.txt | decrypt-client-secret private_key.pem
fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    let stdout = io::stdout();
    if let Err(e) = decrypt_client_secret(&cli, &mut stdout.lock()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
