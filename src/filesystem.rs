// src/filesystem.rs
use crate::errors::SecretError;

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Where the base64 ciphertext comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// `None` and `-` both mean standard input
    pub fn from_arg(arg: Option<&Path>) -> Self {
        match arg {
            None => Self::Stdin,
            Some(path) if path.as_os_str() == "-" => Self::Stdin,
            Some(path) => Self::File(path.to_path_buf()),
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "stdin"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// File system reads for ciphertext input and key material
pub struct FileManager;

impl FileManager {
    pub fn new() -> Self {
        Self
    }

    /// Read base64 ciphertext text from stdin or a file
    pub fn read_input(&self, source: &InputSource) -> Result<String, SecretError> {
        match source {
            InputSource::Stdin => self.read_from(io::stdin().lock(), source),
            InputSource::File(path) => {
                let file =
                    fs::File::open(path).map_err(|e| SecretError::input_read(source.to_string(), e))?;
                self.read_from(file, source)
            }
        }
    }

    /// Read PEM text into a buffer that is wiped on drop
    pub fn read_key_pem(&self, path: &Path) -> Result<Zeroizing<String>, SecretError> {
        let bytes = Zeroizing::new(
            fs::read(path).map_err(|e| SecretError::key_load(path, format!("cannot read file: {}", e)))?,
        );

        match std::str::from_utf8(&bytes) {
            Ok(text) => Ok(Zeroizing::new(text.to_owned())),
            Err(_) => Err(SecretError::key_load(path, "file is not PEM text")),
        }
    }

    /// Read a key passphrase from a file, dropping one trailing line ending
    pub fn read_passphrase_file(&self, path: &Path) -> Result<Zeroizing<String>, SecretError> {
        let mut content = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
            SecretError::key_load(path, format!("cannot read passphrase file: {}", e))
        })?);

        if content.ends_with('\n') {
            content.pop();
            if content.ends_with('\r') {
                content.pop();
            }
        }
        Ok(content)
    }

    // Private helper methods
    fn read_from(&self, mut reader: impl Read, source: &InputSource) -> Result<String, SecretError> {
        let mut buffer = String::new();
        reader
            .read_to_string(&mut buffer)
            .map_err(|e| SecretError::input_read(source.to_string(), e))?;
        Ok(buffer)
    }
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}
