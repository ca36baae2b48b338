//! Choosing which decoded body part to display by default.

use crate::model::mail::{BodyFormat, DecodedBodyPart, StructuredMessage};

/// A viewer's format request, usually from a `format=` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatRequest {
    pub format: Option<BodyFormat>,
    /// When set, the first part in `format` wins outright.
    pub is_preference: bool,
}

impl FormatRequest {
    /// No request: pick purely by format priority.
    pub fn none() -> Self {
        Self::default()
    }

    /// An explicit preference for `format`.
    pub fn prefer(format: BodyFormat) -> Self {
        Self {
            format: Some(format),
            is_preference: true,
        }
    }

    /// Interpret a `format=` value: `html`, `md` or `text`, any ASCII case.
    ///
    /// Absent, empty or unknown values are no request at all.
    pub fn from_query(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.trim().parse::<BodyFormat>().ok())
            .map(Self::prefer)
            .unwrap_or_default()
    }
}

/// Display priority; lower is better.
fn rank(format: BodyFormat) -> u8 {
    match format {
        BodyFormat::Html => 0,
        BodyFormat::Markdown => 1,
        BodyFormat::PlainText => 2,
    }
}

/// Index of the part to show by default, or `None` if there are no parts.
///
/// An honoured preference returns the first part in that format. Otherwise
/// the best-ranked format wins (`Html` > `Markdown` > `PlainText`), with
/// the earliest part winning ties.
pub fn select_body(
    parts: &[DecodedBodyPart],
    requested: Option<BodyFormat>,
    requested_is_preference: bool,
) -> Option<usize> {
    if requested_is_preference {
        if let Some(format) = requested {
            if let Some(i) = parts.iter().position(|p| p.format == format) {
                return Some(i);
            }
        }
    }

    parts
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, u8)>, (i, part)| {
            let r = rank(part.format);
            match best {
                Some((_, best_rank)) if best_rank <= r => best,
                _ => Some((i, r)),
            }
        })
        .map(|(i, _)| i)
}

impl StructuredMessage {
    /// Record the default body part for `request` and return the message.
    pub fn with_preferred_body(mut self, request: FormatRequest) -> Self {
        self.preferred_index = select_body(&self.body_parts, request.format, request.is_preference);
        self
    }
}
