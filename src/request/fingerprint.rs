//! Content fingerprints for request descriptors
//!
//! Same request configuration (and send timestamp) = same fingerprint.
//! Disabled headers never contribute.

use crate::request::RequestDescriptor;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const FIELD_SEPARATOR: &str = "\n";
const HEADER_SEPARATOR: &str = "|";

/// Hex-encoded SHA256 digest of a canonical request description
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already computed digest (e.g. read back from the store or CLI)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Parse user input; accepts 64 hex digits in either case
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.len() == 64 && input.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(input.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// The hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, for display
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical serialization that the fingerprint is computed over
fn canonical_form(req: &RequestDescriptor) -> String {
    let mut headers: Vec<_> = req.headers.iter().filter(|h| h.enabled).collect();
    // Stable: rows with equal keys keep their relative order
    headers.sort_by(|a, b| a.key.as_bytes().cmp(b.key.as_bytes()));

    let joined_headers = headers
        .iter()
        .map(|h| format!("{}:{}", h.key, h.value))
        .collect::<Vec<_>>()
        .join(HEADER_SEPARATOR);

    let timestamp = req.timestamp.to_string();
    [
        req.method.as_str(),
        req.url.as_str(),
        joined_headers.as_str(),
        req.body.as_str(),
        timestamp.as_str(),
    ]
    .join(FIELD_SEPARATOR)
}

/// Compute the fingerprint of a request description
pub fn fingerprint(req: &RequestDescriptor) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(canonical_form(req).as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Header;

    fn fixture() -> RequestDescriptor {
        RequestDescriptor::new("GET", "https://x/y")
            .with_header(Header::new("A", "1"))
            .with_timestamp(1000)
    }

    #[test]
    fn fingerprint_deterministic() {
        let fp1 = fingerprint(&fixture());
        let fp2 = fingerprint(&fixture());

        assert_eq!(fp1, fp2);
        assert_eq!(fp1.as_str().len(), 64);
        assert!(fp1.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_fixture_is_stable() {
        // sha256("GET\nhttps://x/y\nA:1\n\n1000")
        let mut hasher = Sha256::new();
        hasher.update(b"GET\nhttps://x/y\nA:1\n\n1000");
        let expected = hex::encode(hasher.finalize());

        assert_eq!(fingerprint(&fixture()).as_str(), expected);
    }

    #[test]
    fn disabled_header_value_ignored() {
        let r1 = fixture().with_header(Header::disabled("B", "one"));
        let r2 = fixture().with_header(Header::disabled("B", "two"));
        let r3 = fixture();

        assert_eq!(fingerprint(&r1), fingerprint(&r2));
        assert_eq!(fingerprint(&r1), fingerprint(&r3));
    }

    #[test]
    fn timestamp_changes_fingerprint() {
        let r1 = fixture();
        let r2 = fixture().with_timestamp(1001);
        assert_ne!(fingerprint(&r1), fingerprint(&r2));
    }

    #[test]
    fn every_field_contributes() {
        let base = fingerprint(&fixture());

        let mut method = fixture();
        method.method = "POST".to_string();
        let mut url = fixture();
        url.url = "https://x/z".to_string();
        let mut value = fixture();
        value.headers[0].value = "2".to_string();
        let body = fixture().with_body("{}");
        let extra = fixture().with_header(Header::new("B", "2"));

        for changed in [method, url, value, body, extra] {
            assert_ne!(fingerprint(&changed), base);
        }
    }

    #[test]
    fn header_order_does_not_matter() {
        let r1 = RequestDescriptor::new("GET", "https://x/y")
            .with_header(Header::new("b", "2"))
            .with_header(Header::new("a", "1"))
            .with_timestamp(5);
        let r2 = RequestDescriptor::new("GET", "https://x/y")
            .with_header(Header::new("a", "1"))
            .with_header(Header::new("b", "2"))
            .with_timestamp(5);

        assert_eq!(fingerprint(&r1), fingerprint(&r2));
    }

    #[test]
    fn header_sort_is_byte_order() {
        let req = RequestDescriptor::new("GET", "u")
            .with_header(Header::new("b", "1"))
            .with_header(Header::new("B", "2"))
            .with_timestamp(0);

        assert_eq!(canonical_form(&req), "GET\nu\nB:2|b:1\n\n0");
    }

    #[test]
    fn short_form() {
        let fp = Fingerprint::from_hex("a1b2c3d4e5f6a7b8");
        assert_eq!(fp.short(), "a1b2c3d4e5f6");
        assert_eq!(Fingerprint::from_hex("abc").short(), "abc");
    }

    #[test]
    fn parse_user_input() {
        let hex = fingerprint(&fixture()).to_string();
        assert_eq!(Fingerprint::parse(&hex.to_uppercase()), Some(Fingerprint::from_hex(hex)));
        assert!(Fingerprint::parse("abc").is_none());
        assert!(Fingerprint::parse(&"g".repeat(64)).is_none());
    }
}
