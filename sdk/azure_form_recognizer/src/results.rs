//! Typed models of the Form Recognizer v2.1 analyze results.
//!
//! A result document carries the OCR output per page in `readResults`, the
//! extracted tables and key-value pairs in `pageResults`, and prebuilt or
//! custom model fields in `documentResults`. Tables, key-value pairs, and
//! fields point back into the OCR output with element references such as
//! `#/readResults/0/lines/2/words/1`; see [`resolve_element_reference`].

use crate::geometry::BoundingBox;
use azure_form_recognizer_core::error::{FormRecognizerError, FormRecognizerResult};
use azure_form_recognizer_core::polling::{OperationError, OperationStatus, PollResult};
use serde::Deserialize;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Operation envelope
// ---------------------------------------------------------------------------

/// The document returned by the `Operation-Location` URL of an analysis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOperationResult {
    /// Current status of the operation.
    pub status: OperationStatus,

    /// When the operation was submitted (ISO 8601).
    pub created_date_time: Option<String>,

    /// When the status last changed (ISO 8601).
    pub last_updated_date_time: Option<String>,

    /// The analysis output, present once the operation succeeds.
    pub analyze_result: Option<AnalyzeResult>,

    /// Error detail, present for some failed operations.
    pub error: Option<OperationError>,
}

impl AnalyzeOperationResult {
    /// Translate the status document into the answer of a single poll.
    ///
    /// A failed operation takes its error detail from the top-level `error`,
    /// else from the first entry of `analyzeResult.errors`, else a generic
    /// `OperationFailed` error.
    ///
    /// # Errors
    ///
    /// Returns [`FormRecognizerError::Api`] with code `MissingResult` when the
    /// status is `succeeded` but no `analyzeResult` is present.
    pub fn into_poll_result(self) -> FormRecognizerResult<PollResult<AnalyzeResult>> {
        match self.status {
            OperationStatus::NotStarted | OperationStatus::Running => Ok(PollResult::Pending),
            OperationStatus::Succeeded => self
                .analyze_result
                .map(PollResult::succeeded)
                .ok_or_else(|| FormRecognizerError::Api {
                    code: "MissingResult".into(),
                    message: "operation succeeded without an analyzeResult".into(),
                }),
            OperationStatus::Failed => {
                let error = self
                    .error
                    .or_else(|| {
                        self.analyze_result
                            .and_then(|result| result.errors.into_iter().next())
                    })
                    .unwrap_or_else(|| OperationError {
                        code: "OperationFailed".into(),
                        message: "the analyze operation failed without error detail".into(),
                    });
                Ok(PollResult::failed(error))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis output
// ---------------------------------------------------------------------------

/// The full output of a successful analysis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    /// Version of the analysis schema.
    pub version: String,

    /// OCR output, one entry per analyzed page.
    #[serde(default)]
    pub read_results: Vec<ReadResult>,

    /// Tables and key-value pairs, one entry per page.
    #[serde(default)]
    pub page_results: Vec<PageResult>,

    /// Fields extracted by a prebuilt or labeled custom model.
    #[serde(default)]
    pub document_results: Vec<DocumentResult>,

    /// Errors encountered during the analysis.
    #[serde(default)]
    pub errors: Vec<OperationError>,
}

impl AnalyzeResult {
    /// Resolve an element reference against this result's `readResults`.
    ///
    /// See [`resolve_element_reference`].
    pub fn resolve_element(&self, reference: &str) -> FormRecognizerResult<Option<FormElement<'_>>> {
        resolve_element_reference(reference, &self.read_results)
    }

    /// Resolve every reference in `references`, dropping those that point
    /// outside the result.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed reference.
    pub fn resolve_elements<'a>(
        &'a self,
        references: &[String],
    ) -> FormRecognizerResult<Vec<FormElement<'a>>> {
        let mut elements = Vec::with_capacity(references.len());
        for reference in references {
            if let Some(element) = self.resolve_element(reference)? {
                elements.push(element);
            }
        }
        Ok(elements)
    }

    /// All text lines across every page, in page order.
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.read_results.iter().flat_map(|page| page.lines.iter())
    }
}

/// Unit of the coordinates on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LengthUnit {
    /// Images.
    Pixel,
    /// PDF documents.
    Inch,
}

/// OCR output for one page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    /// 1-based page number.
    pub page: u32,

    /// General orientation of the text, in degrees clockwise within (-180, 180].
    pub angle: f32,

    /// Page width.
    pub width: f32,

    /// Page height.
    pub height: f32,

    /// Unit of `width`, `height`, and every bounding box on the page.
    pub unit: LengthUnit,

    /// Detected language, when known.
    pub language: Option<String>,

    /// Text lines, present when text details were requested.
    #[serde(default)]
    pub lines: Vec<TextLine>,

    /// Checkboxes and radio buttons.
    #[serde(default)]
    pub selection_marks: Vec<SelectionMark>,
}

/// A line of text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLine {
    pub text: String,
    pub bounding_box: BoundingBox,
    pub language: Option<String>,
    #[serde(default)]
    pub words: Vec<TextWord>,
    pub appearance: Option<Appearance>,
}

impl TextLine {
    /// Rotation of the line from horizontal, in radians.
    pub fn angle(&self) -> f32 {
        self.bounding_box.angle()
    }
}

/// A word within a [`TextLine`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextWord {
    pub text: String,
    pub bounding_box: BoundingBox,
    pub confidence: Option<f32>,
}

/// Whether a selection mark is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMarkState {
    Selected,
    Unselected,
}

/// A checkbox or radio button.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionMark {
    pub bounding_box: BoundingBox,
    pub confidence: f32,
    pub state: SelectionMarkState,
}

/// Visual style of a text line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Appearance {
    pub style: Style,
}

/// Kind of writing in a text line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextStyleName {
    /// Printed or unclassified text.
    Other,
    Handwriting,
}

/// A classified text style and the confidence of the classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Style {
    pub name: TextStyleName,
    pub confidence: f32,
}

/// Tables and key-value pairs extracted from one page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    /// 1-based page number.
    pub page: u32,

    /// Cluster the page was assigned to by an unlabeled custom model.
    pub cluster_id: Option<u32>,

    #[serde(default)]
    pub key_value_pairs: Vec<KeyValuePair>,

    #[serde(default)]
    pub tables: Vec<DataTable>,
}

/// A key and its associated value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeyValuePair {
    /// Label assigned by a custom model.
    pub label: Option<String>,
    pub key: KeyValueElement,
    pub value: KeyValueElement,
    pub confidence: f32,
}

/// One side of a [`KeyValuePair`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValueElement {
    /// Semantic data type of the element, when reported.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: String,
    pub bounding_box: Option<BoundingBox>,
    /// References to the words or selection marks that make up the element.
    #[serde(default)]
    pub elements: Vec<String>,
}

/// A table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTable {
    pub rows: u32,
    pub columns: u32,
    pub cells: Vec<DataTableCell>,
    pub bounding_box: Option<BoundingBox>,
}

impl DataTable {
    /// The cell whose top-left corner sits at `row`, `column`.
    pub fn cell(&self, row: u32, column: u32) -> Option<&DataTableCell> {
        self.cells
            .iter()
            .find(|cell| cell.row_index == row && cell.column_index == column)
    }
}

fn one() -> u32 {
    1
}

/// A cell of a [`DataTable`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTableCell {
    pub row_index: u32,
    pub column_index: u32,
    #[serde(default = "one")]
    pub row_span: u32,
    #[serde(default = "one")]
    pub column_span: u32,
    pub text: String,
    pub bounding_box: BoundingBox,
    pub confidence: f32,
    #[serde(default)]
    pub elements: Vec<String>,
    #[serde(default)]
    pub is_header: bool,
    #[serde(default)]
    pub is_footer: bool,
}

/// Fields extracted for one document by a prebuilt or labeled custom model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResult {
    /// Document type, e.g. `prebuilt:receipt` or `custom:<modelId>`.
    pub doc_type: String,

    /// Model that produced the result, for composed custom models.
    pub model_id: Option<String>,

    /// First and last page (1-based) of the document.
    pub page_range: [u32; 2],

    pub doc_type_confidence: Option<f32>,

    /// Extracted fields by name. A field the model knows but did not find is `None`.
    #[serde(default)]
    pub fields: HashMap<String, Option<FieldValue>>,
}

impl DocumentResult {
    /// A field by name, if it was found.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).and_then(Option::as_ref)
    }
}

/// Semantic type of a [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValueType {
    String,
    Date,
    Time,
    PhoneNumber,
    Number,
    Integer,
    Array,
    Object,
    SelectionMark,
    CountryRegion,
}

/// A recognized field. Exactly one `value_*` member matches `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    #[serde(rename = "type")]
    pub kind: FieldValueType,
    pub value_string: Option<String>,
    /// ISO 8601 date.
    pub value_date: Option<String>,
    /// ISO 8601 time.
    pub value_time: Option<String>,
    /// E.164 phone number.
    pub value_phone_number: Option<String>,
    pub value_number: Option<f64>,
    pub value_integer: Option<i64>,
    pub value_array: Option<Vec<FieldValue>>,
    pub value_object: Option<HashMap<String, FieldValue>>,
    pub value_selection_mark: Option<SelectionMarkState>,
    /// ISO 3166-1 alpha-3 country code.
    pub value_country_region: Option<String>,
    /// Text content as it appears in the document.
    pub text: Option<String>,
    pub bounding_box: Option<BoundingBox>,
    pub confidence: Option<f32>,
    #[serde(default)]
    pub elements: Vec<String>,
    /// 1-based page number.
    pub page: Option<u32>,
}

// ---------------------------------------------------------------------------
// Element references
// ---------------------------------------------------------------------------

/// An OCR element an element reference points to.
#[derive(Debug, Clone, Copy)]
pub enum FormElement<'a> {
    Line(&'a TextLine),
    Word(&'a TextWord),
    SelectionMark(&'a SelectionMark),
}

impl<'a> FormElement<'a> {
    /// Text of a line or word; `None` for a selection mark.
    pub fn text(&self) -> Option<&'a str> {
        match *self {
            Self::Line(line) => Some(&line.text),
            Self::Word(word) => Some(&word.text),
            Self::SelectionMark(_) => None,
        }
    }

    pub fn bounding_box(&self) -> &'a BoundingBox {
        match *self {
            Self::Line(line) => &line.bounding_box,
            Self::Word(word) => &word.bounding_box,
            Self::SelectionMark(mark) => &mark.bounding_box,
        }
    }
}

#[derive(Debug, PartialEq)]
enum ElementPath {
    Line { page: usize, line: usize },
    Word { page: usize, line: usize, word: usize },
    SelectionMark { page: usize, mark: usize },
}

const REFERENCE_PREFIX: &str = "#/readResults/";

fn invalid(reference: &str) -> FormRecognizerError {
    FormRecognizerError::InvalidReference(format!(
        "{reference:?} does not match #/readResults/<page>/lines/<line>[/words/<word>] \
         or #/readResults/<page>/selectionMarks/<mark>"
    ))
}

fn parse_reference(reference: &str) -> FormRecognizerResult<ElementPath> {
    let rest = reference
        .strip_prefix(REFERENCE_PREFIX)
        .ok_or_else(|| invalid(reference))?;
    let segments: Vec<&str> = rest.split('/').collect();

    let index = |segment: &str| -> FormRecognizerResult<usize> {
        segment.parse::<usize>().map_err(|_| invalid(reference))
    };

    match segments.as_slice() {
        [page, "lines", line] => Ok(ElementPath::Line {
            page: index(page)?,
            line: index(line)?,
        }),
        [page, "lines", line, "words", word] => Ok(ElementPath::Word {
            page: index(page)?,
            line: index(line)?,
            word: index(word)?,
        }),
        [page, "selectionMarks", mark] => Ok(ElementPath::SelectionMark {
            page: index(page)?,
            mark: index(mark)?,
        }),
        _ => Err(invalid(reference)),
    }
}

/// Look up the line, word, or selection mark an element reference names.
///
/// Indices in the reference are 0-based positions in `read_results`, not
/// page numbers.
///
/// Returns `Ok(None)` when the reference is well formed but points past the
/// end of a page, line, or word list.
///
/// # Errors
///
/// Returns [`FormRecognizerError::InvalidReference`] when the reference is
/// malformed.
pub fn resolve_element_reference<'a>(
    reference: &str,
    read_results: &'a [ReadResult],
) -> FormRecognizerResult<Option<FormElement<'a>>> {
    let element = match parse_reference(reference)? {
        ElementPath::Line { page, line } => read_results
            .get(page)
            .and_then(|p| p.lines.get(line))
            .map(FormElement::Line),
        ElementPath::Word { page, line, word } => read_results
            .get(page)
            .and_then(|p| p.lines.get(line))
            .and_then(|l| l.words.get(word))
            .map(FormElement::Word),
        ElementPath::SelectionMark { page, mark } => read_results
            .get(page)
            .and_then(|p| p.selection_marks.get(mark))
            .map(FormElement::SelectionMark),
    };

    if element.is_none() {
        tracing::trace!(reference, "element reference points outside the result");
    }
    Ok(element)
}
