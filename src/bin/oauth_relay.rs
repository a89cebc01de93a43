// src/bin/oauth_relay.rs
//! CGI entry point for the OAuth callback relay page.
//!
//! Reads the query from `QUERY_STRING` and writes the full CGI response to
//! stdout. Logging goes to stderr, which web servers route to their error log.

use client_secret_decrypt::logging;
use client_secret_decrypt::relay::{INVALID_PARAM, RelayParams, relay_response};
use std::env;
use std::io::{self, Write};
use std::process;

fn main() {
    logging::init(None);

    let query = env::var("QUERY_STRING").unwrap_or_default();
    let params = RelayParams::from_query(&query);

    if params.is_complete() {
        tracing::info!("relaying oauth callback");
    } else {
        tracing::warn!(
            code_valid = params.code() != INVALID_PARAM,
            nonce_valid = params.nonce() != INVALID_PARAM,
            "oauth callback with missing or malformed parameters"
        );
    }

    let response = relay_response(&params);
    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout
        .write_all(response.to_cgi().as_bytes())
        .and_then(|()| stdout.flush())
    {
        eprintln!("Error: failed to write relay response: {}", e);
        process::exit(1);
    }
}
