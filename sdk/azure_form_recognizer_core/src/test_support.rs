//! Helpers for testing crates built on this one against a `wiremock` server.

use crate::auth::FormRecognizerCredential;
use crate::client::{FormRecognizerClient, RetryPolicy};
use std::time::Duration;
use wiremock::MockServer;

/// Test subscription key (not a real key).
pub const TEST_SUBSCRIPTION_KEY: &str = "test-subscription-key";

/// Create a client connected to a mock server, with fast retries.
///
/// # Panics
///
/// Panics if the mock server URI is not a valid endpoint.
pub fn setup_mock_client(server: &MockServer) -> FormRecognizerClient {
    FormRecognizerClient::builder()
        .endpoint(server.uri())
        .credential(FormRecognizerCredential::subscription_key(
            TEST_SUBSCRIPTION_KEY,
        ))
        .retry_policy(RetryPolicy {
            max_retries: 1,
            initial_backoff: Duration::from_millis(1),
        })
        .build()
        .expect("should build client")
}
