use zeroize::Zeroize;

/// Memory-safe container for sensitive data that zeros on drop
pub struct SecureBuffer {
    data: Vec<u8>,
}

impl SecureBuffer {
    pub fn new(mut data: Vec<u8>) -> Self {
        // Ensure capacity equals length to prevent leftover data in unused capacity
        data.shrink_to_fit();
        Self { data }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the contents as text, for secrets the issuer sends as UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

// Never print the contents, even in debug output
impl std::fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureBuffer({} bytes)", self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_contents() {
        let buffer = SecureBuffer::new(b"hunter2".to_vec());
        assert_eq!(format!("{:?}", buffer), "SecureBuffer(7 bytes)");
    }

    #[test]
    fn test_as_str_rejects_invalid_utf8() {
        assert_eq!(SecureBuffer::new(b"abc".to_vec()).as_str(), Some("abc"));
        assert!(SecureBuffer::new(vec![0xff, 0xfe]).as_str().is_none());
    }

    #[test]
    fn test_len_and_empty() {
        let buffer = SecureBuffer::new(Vec::new());
        assert!(buffer.is_empty());
        assert_eq!(SecureBuffer::new(vec![1, 2, 3]).len(), 3);
    }
}
