//! Decoded message and body part types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Text formats a body part can be displayed as.
///
/// This set is closed: a part in any other format fails the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyFormat {
    PlainText,
    Html,
    Markdown,
}

impl BodyFormat {
    /// Token used in `format=` query parameters.
    pub fn query_token(self) -> &'static str {
        match self {
            BodyFormat::PlainText => "text",
            BodyFormat::Html => "html",
            BodyFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for BodyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_token())
    }
}

/// A `format=` token that names none of the supported formats.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown body format: {0:?}")]
pub struct UnknownFormat(pub String);

impl FromStr for BodyFormat {
    type Err = UnknownFormat;

    /// Accepts `html`, `md` and `text`, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("html") {
            Ok(BodyFormat::Html)
        } else if s.eq_ignore_ascii_case("md") {
            Ok(BodyFormat::Markdown)
        } else if s.eq_ignore_ascii_case("text") {
            Ok(BodyFormat::PlainText)
        } else {
            Err(UnknownFormat(s.to_string()))
        }
    }
}

/// Top-level structural shape of the original message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    SinglePart,
    MultipartAlternative,
    MultipartMixed,
}

/// One leaf of the body tree, with its transfer encoding already removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedBodyPart {
    pub format: BodyFormat,
    /// Decoded text. Not sanitized: HTML here is untrusted sender content.
    pub text: String,
}

/// A parsed message: decoded envelope headers plus flattened body parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuredMessage {
    /// Decoded `From` header, not structurally validated.
    pub from: String,
    /// Bare addresses from `To`, in header order.
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    /// Raw `Date` header (see [`StructuredMessage::parsed_date`]).
    pub date: String,
    pub layout: Layout,
    /// Depth-first, left-to-right leaves of the MIME tree.
    pub body_parts: Vec<DecodedBodyPart>,
    /// Index into `body_parts` chosen for default display.
    ///
    /// `None` until a selection is recorded, and after selecting over an
    /// empty `body_parts`.
    pub preferred_index: Option<usize>,
}

impl StructuredMessage {
    /// The `Date` header as a UTC timestamp, when it can be understood.
    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        crate::parser::header::parse_date(&self.date)
    }

    /// The body part picked by the last selection, if any.
    pub fn preferred_body(&self) -> Option<&DecodedBodyPart> {
        self.preferred_index.and_then(|i| self.body_parts.get(i))
    }
}
