//! OAuth callback relay page.
//!
//! The identity provider redirects the login popup here with `code` and
//! `nonce` query parameters. The page hands `"{code},{nonce}"` to the window
//! that opened it and closes itself. Values that fail validation are replaced
//! by [`INVALID_PARAM`] so nothing unchecked is ever written into the page.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Placeholder rendered for a missing or malformed parameter
pub const INVALID_PARAM: &str = "error";

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{32}$").expect("code pattern compiles"));

static NONCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F-]{32,36}$").expect("nonce pattern compiles"));

/// Authorization code: exactly 32 hex characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCode(String);

impl ValidatedCode {
    pub fn new(raw: &str) -> Option<Self> {
        CODE_PATTERN.is_match(raw).then(|| Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Nonce: 32 to 36 hex characters or hyphens (a UUID with or without dashes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedNonce(String);

impl ValidatedNonce {
    pub fn new(raw: &str) -> Option<Self> {
        NONCE_PATTERN.is_match(raw).then(|| Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parameters the page is allowed to render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayParams {
    code: Option<ValidatedCode>,
    nonce: Option<ValidatedNonce>,
}

impl RelayParams {
    pub fn new(code: Option<&str>, nonce: Option<&str>) -> Self {
        Self {
            code: code.and_then(ValidatedCode::new),
            nonce: nonce.and_then(ValidatedNonce::new),
        }
    }

    /// Build from a raw query string such as `code=...&nonce=...`.
    ///
    /// Keys and values are form-decoded before validation, and the first
    /// occurrence of a key wins.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let lookup = |name: &str| {
            query
                .split('&')
                .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
                .find(|(key, _)| form_decode(key) == name)
                .map(|(_, value)| form_decode(value))
        };
        Self::new(lookup("code").as_deref(), lookup("nonce").as_deref())
    }

    pub fn code(&self) -> &str {
        self.code.as_ref().map_or(INVALID_PARAM, ValidatedCode::as_str)
    }

    pub fn nonce(&self) -> &str {
        self.nonce.as_ref().map_or(INVALID_PARAM, ValidatedNonce::as_str)
    }

    pub fn is_complete(&self) -> bool {
        self.code.is_some() && self.nonce.is_some()
    }
}

/// Decode one `application/x-www-form-urlencoded` component: `+` is a
/// space and `%XX` an escaped byte. A malformed escape stays as written and
/// invalid UTF-8 becomes U+FFFD.
fn form_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' => match bytes.get(i + 1..i + 3).and_then(hex_byte) {
                Some(byte) => {
                    decoded.push(byte);
                    i += 2;
                }
                None => decoded.push(b'%'),
            },
            other => decoded.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_byte(digits: &[u8]) -> Option<u8> {
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u8::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()
}

/// A rendered HTTP answer, independent of the transport serving it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl RelayResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Serialize as a CGI response: `Status:` line, headers, blank line, body
    pub fn to_cgi(&self) -> String {
        let mut out = format!("Status: {} {}\r\n", self.status, reason_phrase(self.status));
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.push_str(&self.body);
        out
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        _ => "",
    }
}

fn render_script(params: &RelayParams) -> String {
    format!(
        r#"
        if (window.opener) {{
            window.opener.postMessage("{code},{nonce}", "*");
        }}

        try {{
            window.close();
        }} catch (e) {{ console.log(e); }}

        try {{
            self.close();
        }} catch (e) {{ console.log(e); }}
    "#,
        code = params.code(),
        nonce = params.nonce(),
    )
}

/// CSP source expression admitting exactly `script`
fn script_hash_source(script: &str) -> String {
    format!("'sha256-{}'", STANDARD.encode(Sha256::digest(script.as_bytes())))
}

/// Render the relay document
pub fn render_page(params: &RelayParams) -> String {
    render_with_script(params, &render_script(params))
}

fn render_with_script(params: &RelayParams, script: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en-us">
<head>
    <meta charset="utf-8">
    <title>Signing in</title>
    <script>{script}</script>
</head>
<body>
    <p>code: {code}</p>
    <p>nonce: {nonce}</p>
</body>
</html>
"#,
        script = script,
        code = params.code(),
        nonce = params.nonce(),
    )
}

/// Render the page together with its security headers. Always status 200,
/// invalid input included.
pub fn relay_response(params: &RelayParams) -> RelayResponse {
    let script = render_script(params);
    let csp = format!(
        "default-src 'none'; script-src {}; base-uri 'none'; form-action 'none'; frame-ancestors 'none'",
        script_hash_source(&script)
    );

    RelayResponse {
        status: 200,
        headers: vec![
            ("Content-Type", "text/html; charset=utf-8".to_string()),
            ("Content-Security-Policy", csp),
            (
                "Cache-Control",
                "no-store, no-cache, must-revalidate, max-age=0".to_string(),
            ),
            ("Pragma", "no-cache".to_string()),
            ("Expires", "0".to_string()),
            ("X-Content-Type-Options", "nosniff".to_string()),
            ("X-Frame-Options", "DENY".to_string()),
            ("Referrer-Policy", "no-referrer".to_string()),
        ],
        body: render_with_script(params, &script),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: &str = "0123456789abcdef0123456789ABCDEF";
    const NONCE: &str = "123e4567-e89b-12d3-a456-426614174000";

    #[test]
    fn test_code_validation() {
        assert!(ValidatedCode::new(CODE).is_some());
        assert!(ValidatedCode::new(&CODE[1..]).is_none());
        assert!(ValidatedCode::new(&format!("{}0", CODE)).is_none());
        assert!(ValidatedCode::new("0123456789abcdef0123456789abcdeg").is_none());
        assert!(ValidatedCode::new("").is_none());
    }

    #[test]
    fn test_nonce_validation() {
        assert!(ValidatedNonce::new(NONCE).is_some());
        assert!(ValidatedNonce::new(&NONCE.replace('-', "")).is_some());
        assert!(ValidatedNonce::new(&"a".repeat(31)).is_none());
        assert!(ValidatedNonce::new(&"a".repeat(37)).is_none());
        assert!(ValidatedNonce::new("123e4567_e89b_12d3_a456_426614174000").is_none());
    }

    #[test]
    fn test_invalid_values_become_error() {
        let params = RelayParams::new(Some("nope"), None);
        assert_eq!(params.code(), INVALID_PARAM);
        assert_eq!(params.nonce(), INVALID_PARAM);
        assert!(!params.is_complete());
    }

    #[test]
    fn test_from_query() {
        let params = RelayParams::from_query(&format!("?code={}&state=x&nonce={}", CODE, NONCE));
        assert_eq!(params.code(), CODE);
        assert_eq!(params.nonce(), NONCE);
        assert!(params.is_complete());

        let first_wins =
            RelayParams::from_query(&format!("code={}&code=ffffffffffffffffffffffffffffffff", CODE));
        assert_eq!(first_wins.code(), CODE);

        assert_eq!(RelayParams::from_query(""), RelayParams::default());
        assert_eq!(RelayParams::from_query("code&nonce=").code(), INVALID_PARAM);
    }

    #[test]
    fn test_from_query_decodes_escapes() {
        let encoded_nonce = NONCE.replace('-', "%2D");
        let params = RelayParams::from_query(&format!("c%6Fde={}&nonce={}", CODE, encoded_nonce));
        assert_eq!(params.code(), CODE);
        assert_eq!(params.nonce(), NONCE);

        // Decoded markup is still rejected
        let hostile = RelayParams::from_query("code=%3Cscript%3E&nonce=a+b");
        assert_eq!(hostile.code(), INVALID_PARAM);
        assert_eq!(hostile.nonce(), INVALID_PARAM);
    }

    #[test]
    fn test_form_decode() {
        assert_eq!(form_decode("a%2Db+c"), "a-b c");
        assert_eq!(form_decode("%41%4a%4A"), "AJJ");
        assert_eq!(form_decode("100%"), "100%");
        assert_eq!(form_decode("%zz%+1"), "%zz% 1");
        assert_eq!(form_decode("%FF"), "\u{FFFD}");
    }

    #[test]
    fn test_markup_never_reaches_page() {
        let hostile = "\"</script><script>alert(1)</script>";
        let params = RelayParams::new(Some(hostile), Some(hostile));
        let page = render_page(&params);

        assert!(!page.contains("alert"));
        assert!(page.contains(r#"postMessage("error,error", "*")"#));
    }

    #[test]
    fn test_page_posts_message_and_closes() {
        let page = render_page(&RelayParams::new(Some(CODE), Some(NONCE)));

        assert!(page.contains(&format!(r#"postMessage("{},{}", "*")"#, CODE, NONCE)));
        assert!(page.contains("window.close()"));
        assert!(page.contains("self.close()"));
        assert!(page.contains(&format!("<p>code: {}</p>", CODE)));
        assert!(page.contains(&format!("<p>nonce: {}</p>", NONCE)));
    }

    #[test]
    fn test_response_headers() {
        let response = relay_response(&RelayParams::default());

        assert_eq!(response.status, 200);
        assert_eq!(response.header("x-frame-options"), Some("DENY"));
        assert_eq!(response.header("X-Content-Type-Options"), Some("nosniff"));
        assert_eq!(response.header("Pragma"), Some("no-cache"));
        assert!(response.header("Cache-Control").unwrap().contains("no-store"));

        let csp = response.header("Content-Security-Policy").unwrap();
        assert!(csp.starts_with("default-src 'none';"));
        assert!(csp.contains("frame-ancestors 'none'"));
    }

    #[test]
    fn test_csp_hash_matches_inline_script() {
        let params = RelayParams::new(Some(CODE), Some(NONCE));
        let response = relay_response(&params);

        let start = response.body.find("<script>").unwrap() + "<script>".len();
        let end = response.body.find("</script>").unwrap();
        let inline = &response.body[start..end];

        let csp = response.header("Content-Security-Policy").unwrap();
        assert!(csp.contains(&script_hash_source(inline)));
        assert_eq!(response.body, render_page(&params));
    }

    #[test]
    fn test_to_cgi() {
        let response = relay_response(&RelayParams::default());
        let cgi = response.to_cgi();

        assert!(cgi.starts_with("Status: 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n"));
        let (head, body) = cgi.split_once("\r\n\r\n").unwrap();
        assert!(head.contains("X-Frame-Options: DENY"));
        assert_eq!(body, response.body);
    }
}
