//! Part classification: which supported text format a body part is.

use tracing::debug;

use crate::error::{MailError, Result};
use crate::model::mail::BodyFormat;

/// Prefixes matched against the raw `Content-Type` value, in order.
const FORMAT_PREFIXES: [(&str, BodyFormat); 3] = [
    ("text/plain", BodyFormat::PlainText),
    ("text/markdown", BodyFormat::Markdown),
    ("text/html", BodyFormat::Html),
];

/// Classify a part by its raw `Content-Type` header value.
///
/// Matching is a case-sensitive prefix test, so parameters such as
/// `charset` are ignored. Anything else is [`MailError::UnsupportedContentType`].
pub fn classify_part(content_type: &str) -> Result<BodyFormat> {
    let value = content_type.trim();
    FORMAT_PREFIXES
        .iter()
        .find(|(prefix, _)| value.starts_with(prefix))
        .map(|&(_, format)| format)
        .ok_or_else(|| {
            debug!(content_type = value, "Rejecting unsupported body part");
            MailError::UnsupportedContentType(value.to_string())
        })
}
