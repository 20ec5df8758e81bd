//! User-issued request descriptions
//!
//! A [`RequestDescriptor`] is everything the user configured for one send.
//! Its `timestamp` advances on every send so that repeating an identical
//! request still yields a fresh [`Fingerprint`].

pub mod fingerprint;

pub use fingerprint::{fingerprint, Fingerprint};

use crate::error::IhppError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A single request header row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
    /// Disabled rows are kept for editing but never sent or fingerprinted
    pub enabled: bool,
}

impl Header {
    /// Create an enabled header
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Create a disabled header
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(key, value)
        }
    }

    /// Parse a `Key: Value` header line
    pub fn parse(line: &str) -> Option<Self> {
        let (key, value) = line.split_once(':')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key, value.trim()))
    }
}

impl FromStr for Header {
    type Err = IhppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            IhppError::InvalidHeader(format!("'{}' (expected 'Key: Value')", s))
        })
    }
}

/// Everything that identifies one send of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: String,
    pub url: String,
    pub headers: Vec<Header>,
    /// Raw body, possibly an encoded binary payload
    pub body: String,
    /// Milliseconds since the epoch at send time
    pub timestamp: i64,
}

impl RequestDescriptor {
    /// Create a descriptor with no headers, an empty body and the current time
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: String::new(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Append a header row
    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    /// Replace the body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Pin the timestamp (fixtures and replays)
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Advance the timestamp for a new send
    ///
    /// Never moves backwards and always moves forward by at least one
    /// millisecond, even when called twice within the same clock tick.
    pub fn touch(&mut self) {
        let now = Utc::now().timestamp_millis();
        self.timestamp = now.max(self.timestamp.saturating_add(1));
    }

    /// Enabled headers with a non-blank key, in row order
    pub fn enabled_headers(&self) -> impl Iterator<Item = &Header> {
        self.headers
            .iter()
            .filter(|h| h.enabled && !h.key.trim().is_empty())
    }
}
