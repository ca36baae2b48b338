//! Multipart body walking (RFC 2046 §5.1): boundary splitting, recursion
//! into nested containers, and flattening of leaf parts.

use memchr::memchr;
use tracing::{debug, trace};

use crate::error::{MailError, Result};
use crate::model::mail::DecodedBodyPart;
use crate::parser::classify::classify_part;
use crate::parser::content_type::ContentType;
use crate::parser::header::{split_message, HeaderBlock};
use crate::parser::transfer::decode_transfer;

/// Default cap on nested multipart containers.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Walks a multipart body and flattens its leaves into decoded parts.
#[derive(Debug, Clone, Copy)]
pub struct MultipartWalker {
    max_depth: usize,
}

impl Default for MultipartWalker {
    fn default() -> Self {
        Self::new(MAX_NESTING_DEPTH)
    }
}

impl MultipartWalker {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Decode every leaf under `body`, in depth-first left-to-right order.
    ///
    /// A body with no opening delimiter yields no parts. The first
    /// unsupported or undecodable leaf aborts the whole walk.
    pub fn walk(&self, body: &[u8], boundary: &str) -> Result<Vec<DecodedBodyPart>> {
        let mut out = Vec::new();
        self.walk_into(body, boundary, 1, &mut out)?;
        Ok(out)
    }

    fn walk_into(
        &self,
        body: &[u8],
        boundary: &str,
        depth: usize,
        out: &mut Vec<DecodedBodyPart>,
    ) -> Result<()> {
        if depth > self.max_depth {
            return Err(MailError::TooDeeplyNested {
                limit: self.max_depth,
            });
        }

        let parts = split_parts(body, boundary);
        if parts.is_empty() {
            debug!(boundary, "No parts found for boundary");
        }

        for part in parts {
            let (raw_headers, content) = split_message(part);
            let headers = HeaderBlock::parse(raw_headers).ok_or(MailError::MalformedMessage)?;

            let raw_type = headers.get("content-type").unwrap_or_default();
            let content_type = ContentType::parse(raw_type)
                .ok_or_else(|| MailError::CannotDetermineContentType(raw_type.to_string()))?;

            if content_type.is_multipart() {
                match content_type.boundary() {
                    Some(nested) => {
                        trace!(depth, boundary = nested, "Descending into nested multipart");
                        self.walk_into(content, nested, depth + 1, out)?;
                    }
                    None => debug!(
                        content_type = raw_type,
                        "Nested multipart without boundary, skipping"
                    ),
                }
                continue;
            }

            let format = classify_part(raw_type)?;
            let decoded = decode_transfer(headers.get("content-transfer-encoding"), content)?;
            out.push(DecodedBodyPart {
                format,
                text: String::from_utf8_lossy(&decoded).into_owned(),
            });
        }

        Ok(())
    }
}

/// Split a multipart body into the raw bytes of each part.
///
/// Preamble and epilogue are discarded. The line break before each
/// delimiter belongs to the delimiter, not the part. A final part with no
/// closing delimiter runs to the end of the body.
fn split_parts<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut current: Option<usize> = None;
    let mut line_start = 0;

    while line_start < body.len() {
        let line_end = memchr(b'\n', &body[line_start..])
            .map(|p| line_start + p + 1)
            .unwrap_or(body.len());
        let line = trim_line(&body[line_start..line_end]);

        if let Some(rest) = line.strip_prefix(delimiter.as_bytes()) {
            let closing = rest == b"--";
            if rest.is_empty() || closing {
                if let Some(start) = current.take() {
                    parts.push(&body[start..content_end(body, start, line_start)]);
                }
                if closing {
                    return parts;
                }
                current = Some(line_end);
            }
        }

        line_start = line_end;
    }

    if let Some(start) = current {
        let tail = &body[start..];
        if tail.iter().any(|b| !b.is_ascii_whitespace()) {
            parts.push(tail);
        }
    }

    parts
}

/// Strip the line break and any transport padding from a line.
fn trim_line(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n' | b' ' | b'\t') {
        end -= 1;
    }
    &line[..end]
}

/// End of a part's content given the start of the delimiter line after it.
fn content_end(body: &[u8], start: usize, delimiter_start: usize) -> usize {
    let mut end = delimiter_start;
    if end >= start + 2 && &body[end - 2..end] == b"\r\n" {
        end -= 2;
    } else if end > start && body[end - 1] == b'\n' {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mail::BodyFormat;

    #[test]
    fn test_split_parts_basic() {
        let body = b"preamble\r\n--sep\r\nA\r\n--sep\r\n\r\nB\r\n--sep--\r\nepilogue\r\n";
        let parts = split_parts(body, "sep");
        assert_eq!(parts, vec![&b"A"[..], &b"\r\nB"[..]]);
    }

    #[test]
    fn test_split_parts_ignores_lookalike_lines() {
        let body = b"--sep\nline --sep inside\n--separator\n--sep--\n";
        let parts = split_parts(body, "sep");
        assert_eq!(parts, vec![&b"line --sep inside\n--separator"[..]]);
    }

    #[test]
    fn test_split_parts_transport_padding() {
        let body = b"--sep  \r\nA\r\n--sep-- \t\r\n";
        assert_eq!(split_parts(body, "sep"), vec![&b"A"[..]]);
    }

    #[test]
    fn test_split_parts_no_delimiter() {
        assert!(split_parts(b"just some text\r\n", "sep").is_empty());
        assert!(split_parts(b"", "sep").is_empty());
    }

    #[test]
    fn test_split_parts_unterminated() {
        let body = b"--sep\r\nA\r\n--sep\r\nB trailing";
        assert_eq!(split_parts(body, "sep"), vec![&b"A"[..], &b"B trailing"[..]]);
        let body = b"--sep\r\nA\r\n--sep\r\n";
        assert_eq!(split_parts(body, "sep"), vec![&b"A"[..]]);
    }

    #[test]
    fn test_split_parts_empty_part() {
        let body = b"--sep\r\n--sep\r\nX\r\n--sep--";
        assert_eq!(split_parts(body, "sep"), vec![&b""[..], &b"X"[..]]);
    }

    #[test]
    fn test_walk_decodes_leaves() {
        let body = b"--b\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
caf=C3=A9\r\n\
--b\r\n\
Content-Type: text/html\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
PHA+aGk8L3A+\r\n\
--b--\r\n";
        let parts = MultipartWalker::default().walk(body, "b").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].format, BodyFormat::PlainText);
        assert_eq!(parts[0].text, "café");
        assert_eq!(parts[1].format, BodyFormat::Html);
        assert_eq!(parts[1].text, "<p>hi</p>");
    }

    #[test]
    fn test_walk_missing_part_content_type() {
        let body = b"--b\r\n\r\nno headers here\r\n--b--\r\n";
        let err = MultipartWalker::default().walk(body, "b").unwrap_err();
        assert!(matches!(err, MailError::CannotDetermineContentType(_)));
    }

    #[test]
    fn test_walk_nested_without_boundary_is_skipped() {
        let body = b"--b\r\nContent-Type: multipart/mixed\r\n\r\nwhatever\r\n--b\r\nContent-Type: text/plain\r\n\r\nkept\r\n--b--\r\n";
        let parts = MultipartWalker::default().walk(body, "b").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].text, "kept");
    }

    fn nested_body(levels: usize) -> Vec<u8> {
        let mut body = b"Content-Type: text/plain\r\n\r\nleaf".to_vec();
        for level in (0..levels).rev() {
            let boundary = format!("lvl{level}");
            let mut wrapped = Vec::new();
            if level > 0 {
                wrapped.extend_from_slice(
                    format!("Content-Type: multipart/mixed; boundary={boundary}\r\n\r\n")
                        .as_bytes(),
                );
            }
            wrapped.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            wrapped.extend_from_slice(&body);
            wrapped.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
            body = wrapped;
        }
        body
    }

    #[test]
    fn test_walk_depth_limit() {
        let walker = MultipartWalker::new(3);

        let ok = nested_body(3);
        let parts = walker.walk(&ok, "lvl0").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].text, "leaf");

        let too_deep = nested_body(4);
        let err = walker.walk(&too_deep, "lvl0").unwrap_err();
        assert!(matches!(err, MailError::TooDeeplyNested { limit: 3 }));
    }
}
