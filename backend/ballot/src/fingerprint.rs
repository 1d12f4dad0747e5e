//! # Fingerprints
//!
//! Client-derived ids used to suppress duplicate votes. Not a security
//! mechanism: anyone can send any fingerprint.
//!
//! The web client hashes `userAgent-language-timezone-platform` with a
//! 32-bit string hash and sends it base 36 encoded. [`derive`] reproduces
//! that so scripted clients land on the same value a browser would.
use std::sync::LazyLock;

use regex::Regex;

pub const MAX_FINGERPRINT_LEN: usize = 128;

static FINGERPRINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_-]+$").expect("fingerprint pattern is valid"));

pub fn is_well_formed(fingerprint: &str) -> bool {
    !fingerprint.is_empty()
        && fingerprint.len() <= MAX_FINGERPRINT_LEN
        && FINGERPRINT_RE.is_match(fingerprint)
}

pub fn derive(user_agent: &str, language: &str, timezone: &str, platform: &str) -> String {
    let source = format!("{user_agent}-{language}-{timezone}-{platform}");

    // hash * 31 + unit over UTF-16 units, wrapping like a JS int32
    let hash = source
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32));

    to_base36((hash as i64).unsigned_abs())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();

    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_matches_browser_hash() {
        assert_eq!(derive("a", "", "", ""), "1qw7g");
        assert_eq!(
            derive(
                "Mozilla/5.0 (X11; Linux x86_64)",
                "en-US",
                "Europe/Berlin",
                "Linux x86_64"
            ),
            "x8h05s"
        );
    }

    #[test]
    fn test_derive_is_stable() {
        let first = derive("agent", "fr", "UTC", "MacIntel");
        let second = derive("agent", "fr", "UTC", "MacIntel");

        assert_eq!(first, second);
        assert!(is_well_formed(&first));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(2_147_483_648), "zik0zk");
    }

    #[test]
    fn test_well_formed() {
        assert!(is_well_formed("abc123"));
        assert!(is_well_formed("test-fingerprint"));
        assert!(is_well_formed("A_b-9"));
    }

    #[test]
    fn test_malformed() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("has space"));
        assert!(!is_well_formed("semi;colon"));
        assert!(!is_well_formed(&"a".repeat(MAX_FINGERPRINT_LEN + 1)));
    }
}
