//! # Azure Form Recognizer
//!
//! Document analysis for the Azure Form Recognizer Rust SDK.
//!
//! - [`analyze`] - submit documents to the layout, prebuilt, and custom model
//!   endpoints and wait for the result
//! - [`results`] - typed analyze results and element reference resolution
//! - [`content`] - magic-number sniffing of uploaded documents
//! - [`geometry`] - angle and rotation of bounding boxes
//!
//! Transport, credentials, and the long-running-operation poller live in
//! [`azure_form_recognizer_core`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_form_recognizer::analyze::{self, AnalyzeRequest};
//! use azure_form_recognizer_core::client::FormRecognizerClient;
//! use azure_form_recognizer_core::polling::LongRunningOperationPoller;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Endpoint and key from AZURE_FORM_RECOGNIZER_ENDPOINT / AZURE_FORM_RECOGNIZER_KEY.
//! let client = FormRecognizerClient::builder().build()?;
//!
//! let mut file = std::fs::File::open("invoice.pdf")?;
//! let request = AnalyzeRequest::builder().stream_source(&mut file)?.build()?;
//!
//! let operation = analyze::analyze_layout(&client, &request).await?;
//! let layout = analyze::poll_until_complete(
//!     &client,
//!     &operation.operation_location,
//!     &LongRunningOperationPoller::new(),
//!     &CancellationToken::new(),
//! )
//! .await?
//! .into_result()?;
//!
//! for page in &layout.page_results {
//!     println!("page {}: {} tables", page.page, page.tables.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod analyze;
pub mod content;
pub mod geometry;
pub mod results;

pub use content::ContentFormat;
pub use geometry::BoundingBox;
