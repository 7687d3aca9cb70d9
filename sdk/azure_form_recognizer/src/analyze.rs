//! Document analysis against the Form Recognizer v2.1 REST API.
//!
//! Analysis is asynchronous on the service side: a submit call returns
//! `202 Accepted` with an `Operation-Location` header, and the result is
//! fetched from that URL once the operation reaches a terminal status.
//!
//! Three families of endpoints are covered:
//!
//! - [`analyze_layout`]: text, selection marks, and tables.
//! - [`analyze_prebuilt`]: receipts, invoices, business cards, and ID documents.
//! - [`analyze_custom`]: a custom model trained on the caller's own forms.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_form_recognizer_core::client::FormRecognizerClient;
//! use azure_form_recognizer_core::auth::FormRecognizerCredential;
//! use azure_form_recognizer_core::polling::LongRunningOperationPoller;
//! use azure_form_recognizer::analyze::{self, AnalyzeRequest, PrebuiltModel};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FormRecognizerClient::builder()
//!     .endpoint("https://your-resource.cognitiveservices.azure.com")
//!     .credential(FormRecognizerCredential::subscription_key("your-key"))
//!     .build()?;
//!
//! let request = AnalyzeRequest::builder()
//!     .url_source("https://example.com/receipt.jpg")
//!     .include_text_details(true)
//!     .build()?;
//!
//! let operation = analyze::analyze_prebuilt(&client, PrebuiltModel::Receipt, &request).await?;
//! let result = analyze::poll_until_complete(
//!     &client,
//!     &operation.operation_location,
//!     &LongRunningOperationPoller::new(),
//!     &CancellationToken::new(),
//! )
//! .await?
//! .into_result()?;
//!
//! for line in result.lines() {
//!     println!("{}", line.text);
//! }
//! # Ok(())
//! # }
//! ```

use crate::content::{resolve_content_format, ContentFormat};
use crate::results::{AnalyzeOperationResult, AnalyzeResult};
use azure_form_recognizer_core::client::FormRecognizerClient;
use azure_form_recognizer_core::error::{FormRecognizerError, FormRecognizerResult};
use azure_form_recognizer_core::polling::{LongRunningOperationPoller, OperationOutcome};
use bytes::Bytes;
use serde::Serialize;
use std::io::{Read, Seek};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Models and options
// ---------------------------------------------------------------------------

/// A prebuilt model offered by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrebuiltModel {
    /// Sales receipts.
    Receipt,
    /// Invoices.
    Invoice,
    /// Business cards.
    BusinessCard,
    /// Passports and US driver licenses.
    IdDocument,
}

impl PrebuiltModel {
    /// The path segment naming this model.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Invoice => "invoice",
            Self::BusinessCard => "businessCard",
            Self::IdDocument => "idDocument",
        }
    }
}

impl std::fmt::Display for PrebuiltModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order in which layout analysis emits text lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingOrder {
    /// Left to right, top to bottom.
    Basic,
    /// Human reading order, following columns.
    Natural,
}

impl ReadingOrder {
    fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Natural => "natural",
        }
    }
}

/// The endpoint an [`AnalyzeRequest`] is sent to.
#[derive(Debug, Clone, Copy)]
enum AnalyzeTarget<'a> {
    Layout,
    Prebuilt(PrebuiltModel),
    Custom(&'a str),
}

impl AnalyzeTarget<'_> {
    fn resource(&self) -> String {
        match self {
            Self::Layout => "layout/analyze".to_string(),
            Self::Prebuilt(model) => format!("prebuilt/{model}/analyze"),
            Self::Custom(model_id) => format!("custom/models/{model_id}/analyze"),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum DocumentSource {
    Url(String),
    Bytes {
        data: Bytes,
        format: ContentFormat,
        content_type: &'static str,
    },
}

/// JSON body for a document referenced by URL.
#[derive(Debug, Serialize)]
struct SourceBody<'a> {
    source: &'a str,
}

/// A document and the options to analyze it with.
///
/// The same request can be sent to any analyze endpoint. Options an endpoint
/// does not accept are left out of its query string: `language` and
/// `reading_order` apply to layout only, `include_text_details` to prebuilt
/// and custom models, `locale` to prebuilt models.
///
/// ```rust
/// use azure_form_recognizer::analyze::AnalyzeRequest;
/// use azure_form_recognizer::content::ContentFormat;
///
/// let request = AnalyzeRequest::builder()
///     .bytes_source(b"%PDF-1.7 ...".to_vec())
///     .pages("1-3")
///     .build()
///     .expect("valid request");
/// assert_eq!(request.content_format(), Some(ContentFormat::Pdf));
/// ```
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    source: DocumentSource,
    include_text_details: bool,
    locale: Option<String>,
    pages: Option<String>,
    language: Option<String>,
    reading_order: Option<ReadingOrder>,
}

impl AnalyzeRequest {
    /// Creates a new builder for an analyze request.
    pub fn builder() -> AnalyzeRequestBuilder {
        AnalyzeRequestBuilder::default()
    }

    /// Format of an uploaded document; `None` for a URL source.
    pub fn content_format(&self) -> Option<ContentFormat> {
        match &self.source {
            DocumentSource::Url(_) => None,
            DocumentSource::Bytes { format, .. } => Some(*format),
        }
    }

    /// Builds the query string for `target`, without the leading `?`.
    fn query_string(&self, target: &AnalyzeTarget<'_>) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());

        match target {
            AnalyzeTarget::Layout => {
                if let Some(ref language) = self.language {
                    query.append_pair("language", language);
                }
                if let Some(order) = self.reading_order {
                    query.append_pair("readingOrder", order.as_str());
                }
            }
            AnalyzeTarget::Prebuilt(_) | AnalyzeTarget::Custom(_) => {
                if self.include_text_details {
                    query.append_pair("includeTextDetails", "true");
                }
                if let (AnalyzeTarget::Prebuilt(_), Some(locale)) = (target, &self.locale) {
                    query.append_pair("locale", locale);
                }
            }
        }

        if let Some(ref pages) = self.pages {
            query.append_pair("pages", pages);
        }

        query.finish()
    }
}

/// Builder for [`AnalyzeRequest`].
#[derive(Debug, Default)]
pub struct AnalyzeRequestBuilder {
    url_source: Option<String>,
    bytes_source: Option<Bytes>,
    content_format: Option<ContentFormat>,
    include_text_details: bool,
    locale: Option<String>,
    pages: Option<String>,
    language: Option<String>,
    reading_order: Option<ReadingOrder>,
}

impl AnalyzeRequestBuilder {
    /// Analyze the document at a publicly reachable URL.
    ///
    /// Mutually exclusive with [`bytes_source`](Self::bytes_source).
    pub fn url_source(mut self, url: impl Into<String>) -> Self {
        self.url_source = Some(url.into());
        self
    }

    /// Upload the document content directly.
    ///
    /// The format is taken from [`content_format`](Self::content_format) when
    /// set, otherwise sniffed from the leading bytes at build time.
    pub fn bytes_source(mut self, data: impl Into<Bytes>) -> Self {
        self.bytes_source = Some(data.into());
        self
    }

    /// Upload the remainder of a seekable stream.
    ///
    /// Call [`content_format`](Self::content_format) first to skip sniffing;
    /// a stream that cannot seek then works as well. Reading starts at the
    /// stream's current position.
    ///
    /// # Errors
    ///
    /// - [`FormRecognizerError::InvalidOperation`] if no format hint is set
    ///   and the stream cannot seek.
    /// - [`FormRecognizerError::Io`] if reading the stream fails.
    pub fn stream_source<R: Read + Seek>(mut self, stream: &mut R) -> FormRecognizerResult<Self> {
        let format = resolve_content_format(stream, self.content_format)?;

        let mut data = Vec::new();
        stream.read_to_end(&mut data)?;

        self.content_format = Some(format);
        self.bytes_source = Some(Bytes::from(data));
        Ok(self)
    }

    /// Declare the format of the uploaded document instead of sniffing it.
    pub fn content_format(mut self, format: ContentFormat) -> Self {
        self.content_format = Some(format);
        self
    }

    /// Include lines, words, and selection marks in the result of prebuilt
    /// and custom models.
    pub fn include_text_details(mut self, include: bool) -> Self {
        self.include_text_details = include;
        self
    }

    /// Locale of a document sent to a prebuilt model (e.g., "en-US").
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Page numbers or ranges to analyze (e.g., "1-3,5").
    pub fn pages(mut self, pages: impl Into<String>) -> Self {
        self.pages = Some(pages.into());
        self
    }

    /// BCP-47 language code of the text for layout analysis.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Line ordering for layout analysis.
    pub fn reading_order(mut self, order: ReadingOrder) -> Self {
        self.reading_order = Some(order);
        self
    }

    /// Builds the request, validating the document source.
    ///
    /// # Errors
    ///
    /// Returns [`FormRecognizerError::Builder`] if:
    /// - Neither `url_source` nor a bytes source is set
    /// - Both are set
    /// - The uploaded content is empty or its format cannot be determined
    pub fn build(self) -> FormRecognizerResult<AnalyzeRequest> {
        let url_source = self.url_source.filter(|s| !s.is_empty());

        let source = match (url_source, self.bytes_source) {
            (None, None) => {
                return Err(FormRecognizerError::Builder(
                    "source is required: set url_source or bytes_source".into(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(FormRecognizerError::Builder(
                    "only one source allowed: set url_source or bytes_source, not both".into(),
                ));
            }
            (Some(url), None) => DocumentSource::Url(url),
            (None, Some(data)) => {
                if data.is_empty() {
                    return Err(FormRecognizerError::Builder(
                        "bytes_source is empty".into(),
                    ));
                }

                let format = match self.content_format {
                    Some(format) if format.is_known() => format,
                    _ => ContentFormat::sniff(&data),
                };
                let content_type = format.mime_type().ok_or_else(|| {
                    FormRecognizerError::Builder(
                        "content format could not be determined from the document; \
                         set content_format explicitly"
                            .into(),
                    )
                })?;

                DocumentSource::Bytes {
                    data,
                    format,
                    content_type,
                }
            }
        };

        Ok(AnalyzeRequest {
            source,
            include_text_details: self.include_text_details,
            locale: self.locale,
            pages: self.pages,
            language: self.language,
            reading_order: self.reading_order,
        })
    }
}

// ---------------------------------------------------------------------------
// Operation handle
// ---------------------------------------------------------------------------

/// A submitted analysis.
///
/// Contains the `Operation-Location` URL to poll for results.
#[derive(Debug, Clone)]
pub struct AnalyzeOperation {
    /// The URL to poll for the analysis result.
    pub operation_location: String,
}

impl AnalyzeOperation {
    /// The result id, i.e. the last path segment of the operation URL.
    pub fn result_id(&self) -> Option<&str> {
        result_id(&self.operation_location)
    }
}

fn result_id(operation_location: &str) -> Option<&str> {
    operation_location
        .split(['?', '#'])
        .next()
        .and_then(|path| path.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
}

// ---------------------------------------------------------------------------
// API functions
// ---------------------------------------------------------------------------

async fn submit(
    client: &FormRecognizerClient,
    target: AnalyzeTarget<'_>,
    request: &AnalyzeRequest,
) -> FormRecognizerResult<AnalyzeOperation> {
    let mut path = client.service_path(&target.resource());
    let query = request.query_string(&target);
    if !query.is_empty() {
        path.push('?');
        path.push_str(&query);
    }

    let response = match &request.source {
        DocumentSource::Url(url) => {
            tracing::debug!("submitting document by URL");
            client.post(&path, &SourceBody { source: url }).await?
        }
        DocumentSource::Bytes {
            data, content_type, ..
        } => {
            tracing::debug!(content_type, len = data.len(), "uploading document");
            client.post_bytes(&path, data.clone(), content_type).await?
        }
    };

    let operation_location = response
        .headers()
        .get("Operation-Location")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| FormRecognizerError::Api {
            code: "MissingHeader".into(),
            message: "Operation-Location header missing from response".into(),
        })?;

    tracing::debug!(operation_location = %operation_location, "analysis submitted");

    Ok(AnalyzeOperation { operation_location })
}

/// Submit a document for layout analysis.
///
/// # Tracing
///
/// Emits a span named `form_recognizer::analyze::analyze_layout`.
#[tracing::instrument(name = "form_recognizer::analyze::analyze_layout", skip_all)]
pub async fn analyze_layout(
    client: &FormRecognizerClient,
    request: &AnalyzeRequest,
) -> FormRecognizerResult<AnalyzeOperation> {
    submit(client, AnalyzeTarget::Layout, request).await
}

/// Submit a document to a prebuilt model.
///
/// # Tracing
///
/// Emits a span named `form_recognizer::analyze::analyze_prebuilt` with field `model`.
#[tracing::instrument(
    name = "form_recognizer::analyze::analyze_prebuilt",
    skip(client, request),
    fields(model = %model)
)]
pub async fn analyze_prebuilt(
    client: &FormRecognizerClient,
    model: PrebuiltModel,
    request: &AnalyzeRequest,
) -> FormRecognizerResult<AnalyzeOperation> {
    submit(client, AnalyzeTarget::Prebuilt(model), request).await
}

/// Submit a document to a custom model.
///
/// # Errors
///
/// Returns [`FormRecognizerError::Builder`] if `model_id` is empty or
/// contains a path separator.
///
/// # Tracing
///
/// Emits a span named `form_recognizer::analyze::analyze_custom` with field `model_id`.
#[tracing::instrument(
    name = "form_recognizer::analyze::analyze_custom",
    skip(client, request),
    fields(model_id = %model_id)
)]
pub async fn analyze_custom(
    client: &FormRecognizerClient,
    model_id: &str,
    request: &AnalyzeRequest,
) -> FormRecognizerResult<AnalyzeOperation> {
    if model_id.is_empty() || model_id.contains(['/', '?', '#']) {
        return Err(FormRecognizerError::Builder(format!(
            "invalid model_id {model_id:?}"
        )));
    }
    submit(client, AnalyzeTarget::Custom(model_id), request).await
}

/// Fetch the current status document of an analysis.
///
/// # Tracing
///
/// Emits a span named `form_recognizer::analyze::get_result`.
#[tracing::instrument(
    name = "form_recognizer::analyze::get_result",
    skip(client),
    fields(operation_location = %operation_location)
)]
pub async fn get_result(
    client: &FormRecognizerClient,
    operation_location: &str,
) -> FormRecognizerResult<AnalyzeOperationResult> {
    tracing::debug!("fetching analyze result");

    // Operation-Location is absolute; the client takes paths relative to its endpoint.
    let parsed = url::Url::parse(operation_location).map_err(|e| {
        FormRecognizerError::invalid_endpoint_with_source(
            "failed to parse Operation-Location URL",
            e,
        )
    })?;

    let relative_path = match parsed.query() {
        Some(q) => format!("{}?{q}", parsed.path()),
        None => parsed.path().to_string(),
    };

    let response = client.get(&relative_path).await?;
    let result = response.json::<AnalyzeOperationResult>().await?;

    tracing::debug!(status = %result.status, "analyze result fetched");
    Ok(result)
}

/// Poll an analysis until it succeeds or fails.
///
/// Each status check is one [`get_result`] call, raced against
/// `cancellation` so a cancelled token also aborts an in-flight request.
///
/// # Errors
///
/// - [`FormRecognizerError::Cancelled`] if `cancellation` fires.
/// - [`FormRecognizerError::Api`] with code `PollTimeout` if the poller's
///   attempt limit runs out.
/// - Any transport or deserialization error from a status check.
///
/// A failed analysis is not an error: it is returned as
/// [`OperationOutcome::Failed`].
///
/// # Tracing
///
/// Emits a span named `form_recognizer::analyze::poll_until_complete`.
#[tracing::instrument(
    name = "form_recognizer::analyze::poll_until_complete",
    skip(client, poller, cancellation),
    fields(operation_location = %operation_location)
)]
pub async fn poll_until_complete(
    client: &FormRecognizerClient,
    operation_location: &str,
    poller: &LongRunningOperationPoller,
    cancellation: &CancellationToken,
) -> FormRecognizerResult<OperationOutcome<AnalyzeResult>> {
    let operation_id = result_id(operation_location).unwrap_or(operation_location);

    let outcome = poller
        .poll(operation_id, cancellation, move |token: CancellationToken| async move {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(FormRecognizerError::Cancelled),
                result = get_result(client, operation_location) => {
                    result.and_then(AnalyzeOperationResult::into_poll_result)
                }
            }
        })
        .await?;

    tracing::debug!(status = %outcome.status(), "analysis reached terminal status");
    Ok(outcome)
}
