//! # Azure Form Recognizer Core
//!
//! Core types shared by the Azure Form Recognizer Rust crates:
//!
//! - [`client`] - [`FormRecognizerClient`](client::FormRecognizerClient), HTTP transport with retries
//! - [`auth`] - subscription key and Entra ID credentials
//! - [`error`] - [`FormRecognizerError`] and the [`FormRecognizerResult`](error::FormRecognizerResult) alias
//! - [`polling`] - [`LongRunningOperationPoller`](polling::LongRunningOperationPoller) for server-side operations

pub mod auth;
pub mod client;
pub mod error;
pub mod polling;

#[cfg(feature = "test-support")]
pub mod test_support;

pub use error::FormRecognizerError;
