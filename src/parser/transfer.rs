//! Content-Transfer-Encoding removal (RFC 2045 §6).

use base64::Engine;

use crate::error::DecodeError;

/// Transfer encodings the decoder distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    /// `7bit`, `8bit`, `binary`, unknown labels, or no header at all.
    Identity,
}

impl TransferEncoding {
    /// Map a `Content-Transfer-Encoding` label, ignoring ASCII case.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some(l) if l.eq_ignore_ascii_case("base64") => TransferEncoding::Base64,
            Some(l) if l.eq_ignore_ascii_case("quoted-printable") => {
                TransferEncoding::QuotedPrintable
            }
            _ => TransferEncoding::Identity,
        }
    }

    /// Remove this encoding from `raw`, producing a fresh buffer.
    pub fn decode(self, raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
        match self {
            TransferEncoding::Base64 => decode_base64(raw),
            TransferEncoding::QuotedPrintable => decode_quoted_printable(raw),
            TransferEncoding::Identity => Ok(raw.to_vec()),
        }
    }
}

/// Decode `raw` according to a `Content-Transfer-Encoding` label.
pub fn decode_transfer(label: Option<&str>, raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    TransferEncoding::from_label(label).decode(raw)
}

/// Strict base64. Line breaks are ignored; anything else off-alphabet is an error.
fn decode_base64(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|&b| b != b'\r' && b != b'\n')
        .collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}

/// Quoted-printable in robust mode: malformed escapes pass through as text.
///
/// Lines come back CRLF-joined with trailing whitespace removed.
fn decode_quoted_printable(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    Ok(quoted_printable::decode(
        raw,
        quoted_printable::ParseMode::Robust,
    )?)
}
