//! Cache key derivation
//!
//! Every remote URL maps to a short, filesystem-safe token that names its
//! cache file. Two schemes are supported:
//! - `Legacy`: 32-bit multiplicative/xor rolling hash rendered in base 36,
//!   byte-for-byte compatible with caches written by the mobile client
//! - `Sha256`: first 64 bits of the SHA-256 digest, rendered as hex
//!
//! For `n` distinct URLs the chance of any collision is roughly
//! `n^2 / 2^(bits + 1)`: about 1.2e-4 for a thousand URLs under `Legacy`,
//! about 2.7e-14 under `Sha256`. A collision serves the bytes of the other
//! URL; nothing else breaks.

use serde::{Deserialize, Serialize};

/// Seed for the legacy rolling hash
const LEGACY_SEED: u32 = 5381;

/// Hex digits kept from the SHA-256 digest (64 bits)
const SHA_KEY_LEN: usize = 16;

/// How URLs are turned into cache keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    /// 32-bit rolling hash, base 36
    #[default]
    Legacy,
    /// 64-bit prefix of SHA-256, hex
    Sha256,
}

impl KeyScheme {
    /// Derive the cache key for a URL
    pub fn derive(self, url: &str) -> String {
        match self {
            KeyScheme::Legacy => to_base36(legacy_hash(url)),
            KeyScheme::Sha256 => sha256_hex(url.as_bytes())[..SHA_KEY_LEN].to_string(),
        }
    }

    /// Number of bits of the key space
    pub fn bits(self) -> u32 {
        match self {
            KeyScheme::Legacy => 32,
            KeyScheme::Sha256 => (SHA_KEY_LEN * 4) as u32,
        }
    }
}

/// Rolling hash over the UTF-16 code units of `input`
///
/// `acc = (acc * 33) ^ unit`, wrapping at 32 bits.
pub fn legacy_hash(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(LEGACY_SEED, |acc, unit| acc.wrapping_mul(33) ^ u32::from(unit))
}

/// Render an unsigned value in lowercase base 36
pub fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::with_capacity(7);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    // Only ASCII digits were pushed
    String::from_utf8_lossy(&out).into_owned()
}

/// Compute SHA256 hash of data and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_token(key: &str) -> bool {
        !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
    }

    #[test]
    fn test_legacy_known_values() {
        // Empty input keeps the seed
        assert_eq!(legacy_hash(""), 5381);
        assert_eq!(KeyScheme::Legacy.derive(""), "45h");

        // 5381 * 33 ^ 'a'
        assert_eq!(legacy_hash("a"), 177_604);
        assert_eq!(KeyScheme::Legacy.derive("a"), "3t1g");
    }

    #[test]
    fn test_legacy_wraps_on_long_input() {
        let url = format!("https://cdn.example.com/{}", "x".repeat(4096));
        let key = KeyScheme::Legacy.derive(&url);
        assert!(is_token(&key));
        assert!(key.len() <= 7);
    }

    #[test]
    fn test_derive_is_deterministic() {
        let inputs = [
            "https://example.com/a.jpg",
            "http://example.com/tours/42/cover.png?w=640",
            "file:///tmp/photo.jpg",
            "   ",
            "ünïcödé/パス",
            "",
        ];
        for scheme in [KeyScheme::Legacy, KeyScheme::Sha256] {
            for input in inputs {
                let first = scheme.derive(input);
                assert_eq!(first, scheme.derive(input));
                assert!(is_token(&first), "{:?} produced {:?}", scheme, first);
            }
        }
    }

    #[test]
    fn test_distinct_urls_get_distinct_keys() {
        let a = KeyScheme::Legacy.derive("https://example.com/a.jpg");
        let b = KeyScheme::Legacy.derive("https://example.com/b.jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn test_sha256_key_shape() {
        let key = KeyScheme::Sha256.derive("https://example.com/a.jpg");
        assert_eq!(key.len(), 16);
        assert_eq!(KeyScheme::Sha256.bits(), 64);
        assert!(sha256_hex(b"https://example.com/a.jpg").starts_with(&key));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u32::MAX), "1z141z3");
    }

    #[test]
    fn test_sha256() {
        let hash = sha256_hex(b"hello world");
        assert_eq!(hash, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }
}
