//! Response state tracked per fingerprint
//!
//! A state starts empty, becomes `loading` when a send begins, and ends in
//! either an error or a response. Partial updates are merged field by field.

use crate::request::RequestDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A completed HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, Vec<String>>,
    /// Opaque body, possibly encoded
    pub body: String,
    /// Round trip in milliseconds
    pub duration: u64,
}

/// State of one request/response pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseState {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<ResponseData>,
    /// Snapshot of the request that produced this state
    pub request: Option<RequestDescriptor>,
}

/// Borrowed view of which phase a state is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePhase<'a> {
    /// Nothing sent yet (or not cached anywhere)
    Idle,
    Loading,
    Failed(&'a str),
    Complete(&'a ResponseData),
}

impl ResponseState {
    /// Current phase; a pending send wins over stale results
    pub fn phase(&self) -> ResponsePhase<'_> {
        if self.loading {
            return ResponsePhase::Loading;
        }
        if let Some(ref error) = self.error {
            return ResponsePhase::Failed(error);
        }
        match self.data {
            Some(ref data) => ResponsePhase::Complete(data),
            None => ResponsePhase::Idle,
        }
    }

    /// Whether this is the default empty state
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge a partial update onto this state
    pub fn apply(&mut self, update: ResponseUpdate) {
        if let Some(loading) = update.loading {
            self.loading = loading;
        }
        if let Some(error) = update.error {
            self.error = error;
        }
        if let Some(data) = update.data {
            self.data = data;
        }
        if let Some(request) = update.request {
            self.request = request;
        }
    }

    /// Return a copy with `update` merged in
    pub fn merged(mut self, update: ResponseUpdate) -> Self {
        self.apply(update);
        self
    }
}

/// Partial update of a [`ResponseState`]
///
/// `None` leaves a field untouched; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseUpdate {
    pub loading: Option<bool>,
    pub error: Option<Option<String>>,
    pub data: Option<Option<ResponseData>>,
    pub request: Option<Option<RequestDescriptor>>,
}

impl ResponseUpdate {
    /// A send has started: loading, error cleared, request snapshotted
    pub fn loading(request: RequestDescriptor) -> Self {
        Self {
            loading: Some(true),
            error: Some(None),
            request: Some(Some(request)),
            ..Self::default()
        }
    }

    /// A send finished with a response
    pub fn completed(data: ResponseData) -> Self {
        Self {
            loading: Some(false),
            data: Some(Some(data)),
            ..Self::default()
        }
    }

    /// A send failed
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            loading: Some(false),
            error: Some(Some(error.into())),
            ..Self::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn data(status: u16) -> ResponseData {
        ResponseData {
            status,
            status_text: "OK".to_string(),
            headers: BTreeMap::from([(
                "content-type".to_string(),
                vec!["application/json".to_string()],
            )]),
            body: r#"{"ok":true}"#.to_string(),
            duration: 42,
        }
    }
}
