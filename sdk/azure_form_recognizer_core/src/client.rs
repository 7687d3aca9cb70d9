//! HTTP client for Azure Form Recognizer.
//!
//! This module provides [`FormRecognizerClient`], the main entry point for
//! interacting with the Form Recognizer REST API. The client handles
//! authentication, HTTP transport, retries of transient failures, and
//! endpoint management.
//!
//! # Examples
//!
//! ## Using a subscription key
//! ```rust,no_run
//! use azure_form_recognizer_core::client::FormRecognizerClient;
//! use azure_form_recognizer_core::auth::FormRecognizerCredential;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FormRecognizerClient::builder()
//!     .endpoint("https://your-resource.cognitiveservices.azure.com")
//!     .credential(FormRecognizerCredential::subscription_key("your-key"))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using the Azure CLI credential
//! ```rust,no_run
//! use azure_form_recognizer_core::client::FormRecognizerClient;
//! use azure_form_recognizer_core::auth::FormRecognizerCredential;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FormRecognizerClient::builder()
//!     .endpoint("https://your-resource.cognitiveservices.azure.com")
//!     .credential(FormRecognizerCredential::azure_cli()?)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::auth::FormRecognizerCredential;
use crate::error::{FormRecognizerError, FormRecognizerResult};
use reqwest::Client as HttpClient;
use reqwest::RequestBuilder;
use url::Url;

use std::time::Duration;

/// Default Form Recognizer REST API version.
pub const DEFAULT_API_VERSION: &str = "v2.1";

/// Environment variable consulted when no endpoint is given to the builder.
pub const ENDPOINT_ENV_VAR: &str = "AZURE_FORM_RECOGNIZER_ENDPOINT";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Determines if an HTTP status code represents a retriable error.
///
/// Retriable errors are transient server-side issues that may succeed on retry:
/// - 429 Too Many Requests (rate limiting)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff).
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based), with ±25% jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff * 2_u32.pow(attempt);
        let jitter = 0.75 + fastrand::f64() * 0.5;
        base.mul_f64(jitter)
    }
}

/// The base client for interacting with the Azure Form Recognizer API.
///
/// The client is cheaply cloneable and can be shared across threads.
#[derive(Debug, Clone)]
pub struct FormRecognizerClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) credential: FormRecognizerCredential,
    pub(crate) api_version: String,
    pub(crate) retry_policy: RetryPolicy,
}

/// Builder for constructing a [`FormRecognizerClient`].
///
/// Use [`FormRecognizerClient::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct FormRecognizerClientBuilder {
    endpoint: Option<String>,
    credential: Option<FormRecognizerCredential>,
    api_version: Option<String>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl FormRecognizerClient {
    /// Create a new builder for configuring a `FormRecognizerClient`.
    pub fn builder() -> FormRecognizerClientBuilder {
        FormRecognizerClientBuilder::default()
    }

    /// Get the base endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the API version being used.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Build the versioned service path for a Form Recognizer resource,
    /// e.g. `layout/analyze` becomes `/formrecognizer/v2.1/layout/analyze`.
    pub fn service_path(&self, resource: &str) -> String {
        format!(
            "/formrecognizer/{}/{}",
            self.api_version,
            resource.trim_start_matches('/')
        )
    }

    /// Build a full URL for an API path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined to the endpoint URL.
    pub fn url(&self, path: &str) -> FormRecognizerResult<Url> {
        self.endpoint.join(path).map_err(|e| {
            FormRecognizerError::invalid_endpoint_with_source("failed to construct URL", e)
        })
    }

    /// Send a GET request with automatic retry on transient errors.
    pub async fn get(&self, path: &str) -> FormRecognizerResult<reqwest::Response> {
        let url = self.url(path)?;
        self.send_with_retry(|http| http.get(url.clone())).await
    }

    /// Send a POST request with a JSON body with automatic retry on transient errors.
    pub async fn post<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> FormRecognizerResult<reqwest::Response> {
        let url = self.url(path)?;
        let payload = serde_json::to_vec(body)?;
        self.send_with_retry(|http| {
            http.post(url.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload.clone())
        })
        .await
    }

    /// Send a POST request with a raw binary body and explicit content type.
    ///
    /// Used to upload documents directly instead of by URL.
    pub async fn post_bytes(
        &self,
        path: &str,
        body: bytes::Bytes,
        content_type: &str,
    ) -> FormRecognizerResult<reqwest::Response> {
        let url = self.url(path)?;
        self.send_with_retry(|http| {
            http.post(url.clone())
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body.clone())
        })
        .await
    }

    /// Run a request, retrying retriable statuses (429, 500, 502, 503, 504)
    /// with exponential backoff.
    async fn send_with_retry<F>(&self, build: F) -> FormRecognizerResult<reqwest::Response>
    where
        F: Fn(&HttpClient) -> RequestBuilder,
    {
        let auth = self.credential.resolve().await?;

        for attempt in 0..=self.retry_policy.max_retries {
            let response = build(&self.http)
                .header(auth.name, &auth.value)
                .send()
                .await?;

            if response.status().is_success() {
                return Ok(response);
            }

            let status = response.status().as_u16();
            if !is_retriable_status(status) || attempt == self.retry_policy.max_retries {
                return Self::check_response(response).await;
            }

            let backoff = self.retry_policy.backoff(attempt);
            tracing::debug!(status, attempt, ?backoff, "retrying transient failure");
            tokio::time::sleep(backoff).await;
        }

        unreachable!("retry loop should return before reaching here")
    }

    /// Maximum length for error messages to prevent sensitive data leaks.
    const MAX_ERROR_MESSAGE_LEN: usize = 1000;

    /// Markers after which a credential value may appear in an error body.
    const SECRET_MARKERS: [&'static str; 3] = [
        "Bearer ",
        "Ocp-Apim-Subscription-Key: ",
        "subscription-key=",
    ];

    /// Sanitize error messages by redacting bearer tokens and subscription keys.
    pub(crate) fn sanitize_error_message(msg: &str) -> String {
        let mut result = msg.to_string();

        for marker in Self::SECRET_MARKERS {
            let mut search_start = 0;
            while let Some(relative_pos) = result[search_start..].find(marker) {
                let value_start = search_start + relative_pos + marker.len();
                if result[value_start..].starts_with("[REDACTED]") {
                    search_start = value_start + 10;
                    continue;
                }

                let value_end = result[value_start..]
                    .find(|c: char| {
                        c.is_whitespace() || c == '"' || c == '\'' || c == ',' || c == '&'
                    })
                    .map(|pos| value_start + pos)
                    .unwrap_or(result.len());

                if value_end > value_start {
                    result.replace_range(value_start..value_end, "[REDACTED]");
                    search_start = value_start + 10;
                } else {
                    search_start = value_start;
                }

                if search_start >= result.len() {
                    break;
                }
            }
        }

        result
    }

    /// Sanitize, then truncate a message if it exceeds the maximum length.
    pub(crate) fn truncate_message(msg: &str) -> String {
        let sanitized = Self::sanitize_error_message(msg);

        if sanitized.len() > Self::MAX_ERROR_MESSAGE_LEN {
            let mut cut = Self::MAX_ERROR_MESSAGE_LEN;
            while !sanitized.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated)", &sanitized[..cut])
        } else {
            sanitized
        }
    }

    /// Check the response status and return an error if not successful.
    async fn check_response(
        response: reqwest::Response,
    ) -> FormRecognizerResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if let Ok(error) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(err_obj) = error.get("error") {
                return Err(FormRecognizerError::Api {
                    code: err_obj
                        .get("code")
                        .and_then(|c| c.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                    message: Self::truncate_message(
                        err_obj
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or(&body),
                    ),
                });
            }
        }

        Err(FormRecognizerError::http(status, Self::truncate_message(&body)))
    }
}

impl FormRecognizerClientBuilder {
    /// Set the Form Recognizer endpoint URL.
    ///
    /// This should be in the format:
    /// `https://<resource-name>.cognitiveservices.azure.com`
    ///
    /// If not set, the builder will check the `AZURE_FORM_RECOGNIZER_ENDPOINT`
    /// environment variable.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the credential to use for authentication.
    ///
    /// If not set, the builder will use [`FormRecognizerCredential::from_env()`].
    pub fn credential(mut self, credential: FormRecognizerCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the API version path segment.
    ///
    /// Defaults to [`DEFAULT_API_VERSION`] (`v2.1`).
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set a custom HTTP client.
    ///
    /// **Note:** If you provide a custom HTTP client, any timeout configuration
    /// on this builder will be ignored.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout, covering the entire request/response cycle.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient errors.
    ///
    /// Defaults to 3 retries with 500ms initial backoff.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the `FormRecognizerClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No endpoint is provided and `AZURE_FORM_RECOGNIZER_ENDPOINT` is not set
    /// - The endpoint URL is invalid
    /// - The HTTP client cannot be constructed
    /// - Credential creation fails (when using environment-based credentials)
    pub fn build(self) -> FormRecognizerResult<FormRecognizerClient> {
        let http = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
                .timeout(self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT))
                .build()?,
        };

        let endpoint_str = self
            .endpoint
            .or_else(|| std::env::var(ENDPOINT_ENV_VAR).ok())
            .ok_or_else(|| {
                FormRecognizerError::MissingConfig(format!(
                    "endpoint is required. Set it via builder or {ENDPOINT_ENV_VAR} env var."
                ))
            })?;

        let endpoint = Url::parse(&endpoint_str).map_err(|e| {
            FormRecognizerError::invalid_endpoint_with_source("invalid endpoint URL", e)
        })?;

        let credential = self
            .credential
            .map(Ok)
            .unwrap_or_else(FormRecognizerCredential::from_env)?;

        Ok(FormRecognizerClient {
            http,
            endpoint,
            credential,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SUBSCRIPTION_KEY_HEADER;
    use serial_test::serial;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client() -> FormRecognizerClient {
        FormRecognizerClient::builder()
            .endpoint("https://test.cognitiveservices.azure.com")
            .credential(FormRecognizerCredential::subscription_key("test"))
            .build()
            .expect("should build")
    }

    #[test]
    #[serial]
    fn builder_requires_endpoint() {
        let original = std::env::var(ENDPOINT_ENV_VAR).ok();
        std::env::remove_var(ENDPOINT_ENV_VAR);

        let result = FormRecognizerClient::builder()
            .credential(FormRecognizerCredential::subscription_key("test"))
            .build();

        let err = result.expect_err("should require endpoint");
        assert!(matches!(err, FormRecognizerError::MissingConfig(_)));

        if let Some(val) = original {
            std::env::set_var(ENDPOINT_ENV_VAR, val);
        }
    }

    #[test]
    fn builder_accepts_endpoint() {
        let client = test_client();
        assert_eq!(
            client.endpoint().as_str(),
            "https://test.cognitiveservices.azure.com/"
        );
    }

    #[test]
    fn builder_uses_default_api_version() {
        assert_eq!(test_client().api_version(), DEFAULT_API_VERSION);
    }

    #[test]
    fn builder_accepts_custom_api_version() {
        let client = FormRecognizerClient::builder()
            .endpoint("https://test.cognitiveservices.azure.com")
            .credential(FormRecognizerCredential::subscription_key("test"))
            .api_version("v2.0")
            .build()
            .expect("should build");

        assert_eq!(client.api_version(), "v2.0");
        assert_eq!(
            client.service_path("layout/analyze"),
            "/formrecognizer/v2.0/layout/analyze"
        );
    }

    #[test]
    #[serial]
    fn builder_endpoint_overrides_env() {
        let original = std::env::var(ENDPOINT_ENV_VAR).ok();
        std::env::set_var(ENDPOINT_ENV_VAR, "https://env.cognitiveservices.azure.com");

        let from_env = FormRecognizerClient::builder()
            .credential(FormRecognizerCredential::subscription_key("test"))
            .build()
            .expect("should build");
        assert_eq!(
            from_env.endpoint().as_str(),
            "https://env.cognitiveservices.azure.com/"
        );

        let explicit = FormRecognizerClient::builder()
            .endpoint("https://explicit.cognitiveservices.azure.com")
            .credential(FormRecognizerCredential::subscription_key("test"))
            .build()
            .expect("should build");
        assert_eq!(
            explicit.endpoint().as_str(),
            "https://explicit.cognitiveservices.azure.com/"
        );

        match original {
            Some(val) => std::env::set_var(ENDPOINT_ENV_VAR, val),
            None => std::env::remove_var(ENDPOINT_ENV_VAR),
        }
    }

    #[test]
    fn builder_invalid_endpoint_url() {
        let result = FormRecognizerClient::builder()
            .endpoint("not a valid url")
            .credential(FormRecognizerCredential::subscription_key("test"))
            .build();

        assert!(matches!(
            result.unwrap_err(),
            FormRecognizerError::InvalidEndpoint { .. }
        ));
    }

    #[test]
    fn service_path_strips_leading_slash() {
        let client = test_client();
        assert_eq!(
            client.service_path("/prebuilt/receipt/analyze"),
            "/formrecognizer/v2.1/prebuilt/receipt/analyze"
        );
        let url = client
            .url(&client.service_path("layout/analyze"))
            .expect("should join");
        assert_eq!(
            url.as_str(),
            "https://test.cognitiveservices.azure.com/formrecognizer/v2.1/layout/analyze"
        );
    }

    #[test]
    fn default_retry_policy() {
        let client = test_client();
        assert_eq!(client.retry_policy().max_retries, 3);
        assert_eq!(
            client.retry_policy().initial_backoff,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn retry_backoff_stays_within_jitter_bounds() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
        };
        for attempt in 0..3 {
            let base = Duration::from_millis(100) * 2_u32.pow(attempt);
            let backoff = policy.backoff(attempt);
            assert!(backoff >= base.mul_f64(0.75), "attempt {attempt}: {backoff:?}");
            assert!(backoff <= base.mul_f64(1.25), "attempt {attempt}: {backoff:?}");
        }
    }

    #[test]
    fn identifies_retriable_http_errors() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_retriable_status(status), "{status} should retry");
        }
        for status in [200, 201, 202, 400, 401, 403, 404, 415] {
            assert!(!is_retriable_status(status), "{status} should not retry");
        }
    }

    // --- Wiremock integration tests ---

    async fn setup_mock_client(server: &MockServer) -> FormRecognizerClient {
        FormRecognizerClient::builder()
            .endpoint(server.uri())
            .credential(FormRecognizerCredential::subscription_key("test-key"))
            .retry_policy(RetryPolicy {
                max_retries: 3,
                initial_backoff: Duration::from_millis(10),
            })
            .build()
            .expect("should build client")
    }

    #[tokio::test]
    async fn get_request_sends_subscription_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/test/endpoint"))
            .and(header(SUBSCRIPTION_KEY_HEADER, "test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let response = client.get("/test/endpoint").await.expect("should succeed");

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/formrecognizer/v2.1/layout/analyze"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let response = client
            .post(
                &client.service_path("layout/analyze"),
                &serde_json::json!({"source": "https://example.com/a.pdf"}),
            )
            .await
            .expect("should succeed");
        assert_eq!(response.status(), 202);
    }

    #[tokio::test]
    async fn post_bytes_sends_content_type_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header("content-type", "image/png"))
            .and(body_bytes(vec![0x89, b'P', b'N', b'G']))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let response = client
            .post_bytes(
                "/upload",
                bytes::Bytes::from_static(&[0x89, b'P', b'N', b'G']),
                "image/png",
            )
            .await
            .expect("should succeed");
        assert_eq!(response.status(), 202);
    }

    #[tokio::test]
    async fn get_request_401_is_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/test/endpoint"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        match client.get("/test/endpoint").await.unwrap_err() {
            FormRecognizerError::Http { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("Expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_body_with_error_object_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/test/endpoint"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": "InvalidImage",
                    "message": "The input data is not a valid image or password protected."
                }
            })))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        match client
            .post("/test/endpoint", &serde_json::json!({}))
            .await
            .unwrap_err()
        {
            FormRecognizerError::Api { code, message } => {
                assert_eq!(code, "InvalidImage");
                assert!(message.contains("not a valid image"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_retries_on_503_then_succeeds() {
        let server = MockServer::start().await;
        let request_count = Arc::new(AtomicU32::new(0));
        let counter = request_count.clone();

        Mock::given(method("GET"))
            .and(path("/retry-test"))
            .respond_with(move |_req: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(503).set_body_string("Service Unavailable")
                } else {
                    ResponseTemplate::new(200).set_body_string("OK")
                }
            })
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let result = client.get("/retry-test").await;

        assert!(result.is_ok(), "Expected success after retries, got {result:?}");
        assert_eq!(request_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn post_bytes_retries_on_429() {
        let server = MockServer::start().await;
        let request_count = Arc::new(AtomicU32::new(0));
        let counter = request_count.clone();

        Mock::given(method("POST"))
            .and(path("/rate-limited"))
            .and(body_bytes(b"%PDF-1.7".to_vec()))
            .respond_with(move |_req: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) < 1 {
                    ResponseTemplate::new(429).set_body_string("Rate limit exceeded")
                } else {
                    ResponseTemplate::new(202)
                }
            })
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let result = client
            .post_bytes(
                "/rate-limited",
                bytes::Bytes::from_static(b"%PDF-1.7"),
                "application/pdf",
            )
            .await;

        assert!(result.is_ok(), "Expected success after retry, got {result:?}");
        assert_eq!(request_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let err = client.get("/bad").await.expect_err("should fail");
        assert!(matches!(err, FormRecognizerError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .expect(4)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let err = client.get("/down").await.expect_err("should fail");
        assert!(matches!(err, FormRecognizerError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn request_times_out_with_configured_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("OK")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = FormRecognizerClient::builder()
            .endpoint(server.uri())
            .credential(FormRecognizerCredential::subscription_key("test"))
            .read_timeout(Duration::from_millis(500))
            .build()
            .expect("should build");

        let err = client.get("/slow").await.expect_err("should time out");
        assert!(
            matches!(err, FormRecognizerError::Request(_)),
            "Expected Request error from timeout, got {err:?}"
        );
    }

    // --- Error sanitization ---

    #[test]
    fn sanitization_redacts_bearer_tokens() {
        let msg = "Invalid token: Bearer eyJ0eXAiOiJKV1QiLCJhbGciOi and more";
        let result = FormRecognizerClient::sanitize_error_message(msg);
        assert!(!result.contains("eyJ0eXAi"), "got: {result}");
        assert!(result.contains("Bearer [REDACTED] and more"), "got: {result}");
    }

    #[test]
    fn sanitization_redacts_subscription_keys() {
        let msg = "Header Ocp-Apim-Subscription-Key: 0123456789abcdef rejected, \
                   url ?subscription-key=fedcba9876543210&x=1";
        let result = FormRecognizerClient::sanitize_error_message(msg);
        assert!(!result.contains("0123456789abcdef"), "got: {result}");
        assert!(!result.contains("fedcba9876543210"), "got: {result}");
        assert_eq!(result.matches("[REDACTED]").count(), 2);
    }

    #[test]
    fn sanitization_preserves_legitimate_errors() {
        let msg = "Model 'abc' not found. Please check the model ID.";
        assert_eq!(FormRecognizerClient::sanitize_error_message(msg), msg);
    }

    #[test]
    fn sanitization_before_truncation() {
        let padding = "x".repeat(990);
        let msg = format!("{padding} Bearer averylongtokenthatcrossesthelimit");
        let result = FormRecognizerClient::truncate_message(&msg);
        assert!(!result.contains("averylongtoken"), "got: {result}");
        assert!(result.ends_with("... (truncated)"));
    }
}
