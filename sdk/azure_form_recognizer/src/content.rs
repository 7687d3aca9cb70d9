//! Document content sniffing.
//!
//! Form Recognizer needs a `Content-Type` for uploaded documents. When the
//! caller does not say what a stream holds, the format is read from the
//! magic number at the start of the data.
//!
//! ```rust
//! use azure_form_recognizer::content::{detect_content_format, ContentFormat};
//! use std::io::Cursor;
//!
//! let mut stream = Cursor::new(b"%PDF-1.7\n...".to_vec());
//! let format = detect_content_format(&mut stream).expect("cursor is seekable");
//! assert_eq!(format, ContentFormat::Pdf);
//! assert_eq!(stream.position(), 0);
//! ```

use azure_form_recognizer_core::error::{FormRecognizerError, FormRecognizerResult};
use std::io::{Read, Seek, SeekFrom};

/// A document format accepted by the analyze endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
    /// Portable Document Format.
    Pdf,
    /// Portable Network Graphics.
    Png,
    /// JPEG image.
    Jpeg,
    /// TIFF image, little- or big-endian.
    Tiff,
    /// The format could not be determined.
    Unknown,
}

impl ContentFormat {
    /// MIME type to send as `Content-Type`, or `None` for [`ContentFormat::Unknown`].
    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            Self::Pdf => Some("application/pdf"),
            Self::Png => Some("image/png"),
            Self::Jpeg => Some("image/jpeg"),
            Self::Tiff => Some("image/tiff"),
            Self::Unknown => None,
        }
    }

    /// Returns `true` unless the format is [`ContentFormat::Unknown`].
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    /// Classify an in-memory buffer by its leading bytes.
    pub fn sniff(data: &[u8]) -> Self {
        let len = data.len().min(MAX_SIGNATURE_LEN);
        match_signatures(&data[..len])
    }
}

impl std::fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type().unwrap_or("unknown"))
    }
}

struct Signature {
    format: ContentFormat,
    magic: &'static [u8],
}

const SIGNATURES: [Signature; 5] = [
    Signature {
        format: ContentFormat::Pdf,
        magic: b"%PDF-",
    },
    Signature {
        format: ContentFormat::Png,
        magic: &[0x89, b'P', b'N', b'G'],
    },
    Signature {
        format: ContentFormat::Jpeg,
        magic: &[0xFF, 0xD8],
    },
    Signature {
        format: ContentFormat::Tiff,
        magic: b"II",
    },
    Signature {
        format: ContentFormat::Tiff,
        magic: b"MM",
    },
];

const MAX_SIGNATURE_LEN: usize = {
    let mut max = 0;
    let mut i = 0;
    while i < SIGNATURES.len() {
        if SIGNATURES[i].magic.len() > max {
            max = SIGNATURES[i].magic.len();
        }
        i += 1;
    }
    max
};

/// Walk the header one byte at a time, checking every signature still in the
/// running. A signature drops out on its first mismatch; the first one whose
/// whole prefix matches wins.
fn match_signatures(header: &[u8]) -> ContentFormat {
    let mut alive = [true; SIGNATURES.len()];

    for (pos, &byte) in header.iter().enumerate() {
        for (candidate, signature) in alive.iter_mut().zip(SIGNATURES.iter()) {
            if !*candidate {
                continue;
            }
            // A live signature is always longer than `pos`: full matches return.
            if signature.magic[pos] != byte {
                *candidate = false;
            } else if pos + 1 == signature.magic.len() {
                return signature.format;
            }
        }

        if !alive.contains(&true) {
            break;
        }
    }

    ContentFormat::Unknown
}

fn not_seekable(err: std::io::Error) -> FormRecognizerError {
    FormRecognizerError::InvalidOperation(format!(
        "content type cannot be determined from a non-seekable stream ({err}); \
         provide the content format explicitly"
    ))
}

/// Determine the format of a seekable stream from its first bytes.
///
/// Reads from the start of the stream and restores the position it had on
/// entry before returning, whatever the outcome.
///
/// # Errors
///
/// - [`FormRecognizerError::InvalidOperation`] if the stream cannot seek.
/// - [`FormRecognizerError::Io`] if reading the header fails.
///
/// An unrecognised header is not an error: it yields [`ContentFormat::Unknown`].
pub fn detect_content_format<R: Read + Seek>(stream: &mut R) -> FormRecognizerResult<ContentFormat> {
    let original = stream.stream_position().map_err(not_seekable)?;
    stream.seek(SeekFrom::Start(0)).map_err(not_seekable)?;

    let mut header = Vec::with_capacity(MAX_SIGNATURE_LEN);
    let read = stream
        .by_ref()
        .take(MAX_SIGNATURE_LEN as u64)
        .read_to_end(&mut header);
    let restored = stream.seek(SeekFrom::Start(original));

    read?;
    restored.map_err(not_seekable)?;

    let format = match_signatures(&header);
    tracing::trace!(%format, header_len = header.len(), "sniffed content format");
    Ok(format)
}

/// Use `hint` when it names a known format, otherwise sniff the stream.
///
/// The stream is not touched when a usable hint is given, so non-seekable
/// streams are fine in that case.
pub fn resolve_content_format<R: Read + Seek>(
    stream: &mut R,
    hint: Option<ContentFormat>,
) -> FormRecognizerResult<ContentFormat> {
    match hint {
        Some(format) if format.is_known() => Ok(format),
        _ => detect_content_format(stream),
    }
}
