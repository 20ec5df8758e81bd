//! ihpp - HTTP inspector client
//!
//! Content-addressed response caching for relayed HTTP requests, plus a
//! multiplexed live-update connection to the inspector server.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod live;
pub mod request;
pub mod response;
pub mod runner;
pub mod ui;

pub use error::{IhppError, IhppResult};
